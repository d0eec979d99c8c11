//! Agent Core error types.
//!
//! None of these escape `Orchestrator::handle`; they are logged and turned
//! into a suppressed outcome.

use thiserror::Error;

/// Errors that can occur during agent core operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The host transport failed to deliver a message.
    #[error("delivery to '{channel}' failed: {reason}")]
    Delivery { channel: String, reason: String },

    /// A tool result was appended without the assistant turn that requested it.
    #[error("tool result '{tool_call_id}' in '{channel}' has no requesting assistant turn")]
    OrphanToolResult {
        channel: String,
        tool_call_id: String,
    },
}
