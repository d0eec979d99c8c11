//! Tool error types.

use thiserror::Error;

/// Errors raised while turning a command into a tool descriptor.
///
/// These never abort a catalog build: the offending command is logged and
/// left out.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A parameter's declared type has no JSON-schema equivalent.
    #[error("command '{command}': parameter '{parameter}' has unsupported type '{declared}'")]
    UnsupportedParameterType {
        command: String,
        parameter: String,
        declared: String,
    },

    /// Two commands flatten to the same tool name.
    #[error("tool name '{name}' is already registered")]
    DuplicateToolName { name: String },
}

/// Errors raised while invoking a tool.
///
/// The display text of a `ToolError` becomes the tool result the model sees,
/// so messages are written for that reader.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model asked for a tool that is not in the catalog.
    #[error("unknown tool: '{name}'")]
    UnknownTool { name: String },

    /// Arguments were not a JSON object or did not fit the command.
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The command itself failed.
    #[error("{reason}")]
    Failed { reason: String },
}

impl ToolError {
    /// Shorthand for a command-level failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        ToolError::Failed {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::Failed {
            reason: format!("serialization error: {e}"),
        }
    }
}
