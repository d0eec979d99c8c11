//! Tools — host commands exposed to the completion service.
//!
//! - `command`: the `Command` capability interface, parameter declarations and
//!   `CommandNode` groups
//! - `catalog`: flattens command trees into a `ToolCatalog` of JSON-schema
//!   descriptors keyed by tool name
//! - `context`: the synthetic `InvocationContext` a command runs inside, which
//!   captures its responses instead of sending them
//! - `errors`: catalog-build and invocation error types

pub mod catalog;
pub mod command;
pub mod context;
pub mod errors;

// Re-exports for convenience
pub use catalog::{CatalogEntry, SharedCatalog, ToolCatalog, ToolDescriptor, TOOL_NAME_SEPARATOR};
pub use command::{
    required_arg, Arguments, Command, CommandNode, CommandRegistry, DeclaredParam, FnCommand,
    OptionSpec, ParamType,
};
pub use context::{InvocationContext, Response};
pub use errors::{CatalogError, ToolError};
