//! The `Command` capability interface.
//!
//! A host command is anything with a name, a description, a list of declared
//! parameters and an async `invoke`. Commands are registered as a forest of
//! `CommandNode`s; groups only contribute a path segment to their children's
//! qualified names and are never invocable themselves.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;

use super::context::InvocationContext;
use super::errors::ToolError;

/// Keyword arguments passed to a command.
pub type Arguments = serde_json::Map<String, serde_json::Value>;

// ─── Parameter Declarations ─────────────────────────────────────────────────

/// Declared type of a command option.
///
/// The first six variants map onto JSON-schema types. `Other` carries the
/// host's own type name (e.g. `"user"`, `"attachment"`) and cannot be exposed
/// to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Object,
    Other(String),
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => f.write_str("string"),
            ParamType::Integer => f.write_str("integer"),
            ParamType::Number => f.write_str("number"),
            ParamType::Boolean => f.write_str("boolean"),
            ParamType::Null => f.write_str("null"),
            ParamType::Object => f.write_str("object"),
            ParamType::Other(name) => f.write_str(name),
        }
    }
}

/// A user-facing command option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    /// Raw values of the enumerated choices, if the option is restricted.
    pub choices: Vec<serde_json::Value>,
}

impl OptionSpec {
    /// An optional parameter with no description or choices.
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            required: false,
            choices: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }
}

/// One entry of a command's declared parameter list, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredParam {
    /// The implicit receiver (`self`). Never exposed.
    Receiver,
    /// A host-supplied value such as the invocation context. Never exposed.
    Context { name: String },
    /// A user-facing option.
    Option(OptionSpec),
}

impl From<OptionSpec> for DeclaredParam {
    fn from(spec: OptionSpec) -> Self {
        DeclaredParam::Option(spec)
    }
}

// ─── Command ────────────────────────────────────────────────────────────────

/// A host command that may be exposed as a tool.
#[async_trait]
pub trait Command: Send + Sync {
    /// The command's own name, without any group path.
    fn name(&self) -> &str;

    /// Human-readable description; becomes the tool description.
    fn description(&self) -> &str;

    /// Declared parameters in declaration order.
    fn parameters(&self) -> Vec<DeclaredParam>;

    /// Run the command. Output goes through `ctx.respond`.
    async fn invoke(&self, ctx: &InvocationContext, args: Arguments) -> Result<(), ToolError>;
}

/// A node in the host's command tree.
#[derive(Clone)]
pub enum CommandNode {
    Leaf(Arc<dyn Command>),
    Group {
        name: String,
        children: Vec<CommandNode>,
    },
}

impl CommandNode {
    pub fn leaf(command: impl Command + 'static) -> Self {
        CommandNode::Leaf(Arc::new(command))
    }

    pub fn group(name: impl Into<String>, children: Vec<CommandNode>) -> Self {
        CommandNode::Group {
            name: name.into(),
            children,
        }
    }

    /// Visit every leaf with its space-separated qualified name.
    pub fn walk_leaves<F>(&self, f: &mut F)
    where
        F: FnMut(String, &Arc<dyn Command>),
    {
        self.walk_with_prefix("", f);
    }

    fn walk_with_prefix<F>(&self, prefix: &str, f: &mut F)
    where
        F: FnMut(String, &Arc<dyn Command>),
    {
        match self {
            CommandNode::Leaf(command) => f(join_path(prefix, command.name()), command),
            CommandNode::Group { name, children } => {
                let path = join_path(prefix, name);
                for child in children {
                    child.walk_with_prefix(&path, f);
                }
            }
        }
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandNode::Leaf(command) => f.debug_tuple("Leaf").field(&command.name()).finish(),
            CommandNode::Group { name, children } => f
                .debug_struct("Group")
                .field("name", name)
                .field("children", children)
                .finish(),
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix} {name}")
    }
}

/// Source of the host's registered commands.
pub trait CommandRegistry: Send + Sync {
    fn commands(&self) -> Vec<CommandNode>;
}

impl CommandRegistry for Vec<CommandNode> {
    fn commands(&self) -> Vec<CommandNode> {
        self.clone()
    }
}

// ─── FnCommand ──────────────────────────────────────────────────────────────

type Handler =
    Arc<dyn Fn(InvocationContext, Arguments) -> BoxFuture<'static, Result<(), ToolError>> + Send + Sync>;

/// A `Command` built from a closure, for hosts that register commands with an
/// explicit descriptor at definition time.
///
/// ```ignore
/// let add = FnCommand::new("add", "Add two integers.", |ctx, args| {
///     Box::pin(async move {
///         let a: i64 = required_arg(&args, "a")?;
///         let b: i64 = required_arg(&args, "b")?;
///         ctx.respond_text((a + b).to_string());
///         Ok(())
///     })
/// })
/// .param(OptionSpec::new("a", ParamType::Integer).required())
/// .param(OptionSpec::new("b", ParamType::Integer).required());
/// ```
#[derive(Clone)]
pub struct FnCommand {
    name: String,
    description: String,
    params: Vec<DeclaredParam>,
    handler: Handler,
}

impl FnCommand {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(InvocationContext, Arguments) -> BoxFuture<'static, Result<(), ToolError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Append a declared parameter.
    pub fn param(mut self, param: impl Into<DeclaredParam>) -> Self {
        self.params.push(param.into());
        self
    }
}

#[async_trait]
impl Command for FnCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<DeclaredParam> {
        self.params.clone()
    }

    async fn invoke(&self, ctx: &InvocationContext, args: Arguments) -> Result<(), ToolError> {
        (self.handler)(ctx.clone(), args).await
    }
}

/// Fetch and deserialize a required argument.
pub fn required_arg<T: DeserializeOwned>(args: &Arguments, name: &str) -> Result<T, ToolError> {
    let value = args
        .get(name)
        .ok_or_else(|| ToolError::failed(format!("missing required argument '{name}'")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| ToolError::failed(format!("argument '{name}': {e}")))
}

// ─── Tests ──────────────────────────────────────────────────────────────────
