//! Tool catalog — host commands flattened into tool descriptors.
//!
//! Provides:
//! - Flattening of command groups into leaf commands
//! - Conversion of declared parameters into a JSON-schema object
//! - Lookup of the command behind a tool name
//! - Validation of tool-call arguments against the descriptor
//! - Serialization of descriptors into the request `tools` field
//!
//! A catalog is immutable once built. Reloading commands builds a new catalog
//! and swaps it in through `SharedCatalog`; entries are never merged.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::json;

use super::command::{Arguments, Command, CommandNode, DeclaredParam, ParamType};
use super::errors::{CatalogError, ToolError};
use crate::inference::types::{FunctionDefinition, ToolDefinition};

/// Replaces the space between group levels in a tool name. Function names
/// sent to the completion service may not contain spaces.
pub const TOOL_NAME_SEPARATOR: &str = "__";

// ─── Descriptors ────────────────────────────────────────────────────────────

/// A command described for the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON-schema object: `{"type": "object", "required": [...], "properties": {...}}`.
    pub parameters: serde_json::Value,
}

impl ToolDescriptor {
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::function(FunctionDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        })
    }
}

/// A catalog entry: the invocable command and its descriptor.
#[derive(Clone)]
pub struct CatalogEntry {
    /// Space-separated path, e.g. `"music queue clear"`.
    pub qualified_name: String,
    pub command: Arc<dyn Command>,
    pub descriptor: ToolDescriptor,
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("qualified_name", &self.qualified_name)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Tool name for a qualified command name.
///
/// E.g., `"music queue clear"` → `"music__queue__clear"`.
pub fn tool_name(qualified_name: &str) -> String {
    qualified_name.replace(' ', TOOL_NAME_SEPARATOR)
}

/// Map a declared parameter type onto a JSON-schema type name.
fn schema_type(param_type: &ParamType) -> Option<&'static str> {
    match param_type {
        ParamType::String => Some("string"),
        ParamType::Integer => Some("integer"),
        ParamType::Number => Some("number"),
        ParamType::Boolean => Some("boolean"),
        ParamType::Null => Some("null"),
        ParamType::Object => Some("object"),
        ParamType::Other(_) => None,
    }
}

/// Build the descriptor for one leaf command.
///
/// Receiver and context parameters are skipped. Any option whose type cannot
/// be mapped fails the whole command.
pub fn describe_command(
    qualified_name: &str,
    command: &dyn Command,
) -> Result<ToolDescriptor, CatalogError> {
    let mut required: Vec<String> = Vec::new();
    let mut properties = serde_json::Map::new();

    for param in command.parameters() {
        let spec = match param {
            DeclaredParam::Option(spec) if !spec.name.is_empty() && spec.name != "self" => spec,
            other => {
                tracing::debug!(command = qualified_name, parameter = ?other, "skipping parameter");
                continue;
            }
        };

        let ty = schema_type(&spec.param_type).ok_or_else(|| {
            CatalogError::UnsupportedParameterType {
                command: qualified_name.to_string(),
                parameter: spec.name.clone(),
                declared: spec.param_type.to_string(),
            }
        })?;

        let mut prop = json!({
            "type": ty,
            "description": spec.description,
        });
        if !spec.choices.is_empty() {
            prop["enum"] = serde_json::Value::Array(spec.choices.clone());
        }

        if spec.required {
            required.push(spec.name.clone());
        }
        properties.insert(spec.name, prop);
    }

    Ok(ToolDescriptor {
        name: tool_name(qualified_name),
        description: command.description().to_string(),
        parameters: json!({
            "type": "object",
            "required": required,
            "properties": properties,
        }),
    })
}

// ─── ToolCatalog ────────────────────────────────────────────────────────────

/// Tool name → (command, descriptor).
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl ToolCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from the host's command forest.
    ///
    /// Groups are walked recursively and only leaves become tools. A command
    /// whose descriptor cannot be built is logged and excluded; the rest of
    /// the catalog is unaffected.
    pub fn build(commands: &[CommandNode]) -> Self {
        let mut entries = BTreeMap::new();

        for node in commands {
            node.walk_leaves(&mut |qualified_name, command| {
                let descriptor = match describe_command(&qualified_name, command.as_ref()) {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!(error = %e, "excluding command from tool catalog");
                        return;
                    }
                };

                if entries.contains_key(&descriptor.name) {
                    let e = CatalogError::DuplicateToolName {
                        name: descriptor.name.clone(),
                    };
                    tracing::warn!(error = %e, command = %qualified_name, "excluding command from tool catalog");
                    return;
                }

                entries.insert(
                    descriptor.name.clone(),
                    CatalogEntry {
                        qualified_name,
                        command: Arc::clone(command),
                        descriptor,
                    },
                );
            });
        }

        let catalog = Self { entries };
        tracing::info!(tools = ?catalog.names(), "built tool catalog");
        catalog
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|k| k.as_str()).collect()
    }

    /// Descriptors in request format, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries
            .values()
            .map(|e| e.descriptor.to_definition())
            .collect()
    }

    /// Parse a tool call's raw argument string and check it against the
    /// tool's schema.
    ///
    /// An empty string is treated as `{}`. Only the presence of required
    /// fields is checked; value types are left to the command.
    pub fn parse_arguments(&self, tool: &str, raw: &str) -> Result<Arguments, ToolError> {
        let entry = self.get(tool).ok_or_else(|| ToolError::UnknownTool {
            name: tool.to_string(),
        })?;

        let args = if raw.trim().is_empty() {
            Arguments::new()
        } else {
            match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(serde_json::Value::Object(map)) => map,
                Ok(other) => {
                    return Err(ToolError::InvalidArguments {
                        tool: tool.to_string(),
                        reason: format!("expected a JSON object, got {other}"),
                    })
                }
                Err(e) => {
                    return Err(ToolError::InvalidArguments {
                        tool: tool.to_string(),
                        reason: format!("malformed JSON: {e}"),
                    })
                }
            }
        };

        if let Some(required) = entry.descriptor.parameters["required"].as_array() {
            for field in required.iter().filter_map(|f| f.as_str()) {
                if !args.contains_key(field) {
                    return Err(ToolError::InvalidArguments {
                        tool: tool.to_string(),
                        reason: format!("missing required field: '{field}'"),
                    });
                }
            }
        }

        Ok(args)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── SharedCatalog ──────────────────────────────────────────────────────────

/// The current catalog, replaceable as a whole.
///
/// Readers take an `Arc` snapshot and never hold the lock across an await.
#[derive(Debug, Default)]
pub struct SharedCatalog {
    current: RwLock<Arc<ToolCatalog>>,
}

impl SharedCatalog {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn current(&self) -> Arc<ToolCatalog> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a new catalog. Returns the number of tools it holds.
    pub fn replace(&self, catalog: ToolCatalog) -> usize {
        let len = catalog.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(catalog);
        len
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
