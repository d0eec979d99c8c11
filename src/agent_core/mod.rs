//! Agent Core — conversation handling for the chat bot.
//!
//! Submodules:
//! - `orchestrator`: Per-message state machine from receipt to delivery
//! - `addressing`: Decides whether a message requires a reply
//! - `response_engine`: Completion calls, anti-echo retry, classification
//! - `tool_invoker`: Runs model-requested commands and closes the tool loop
//! - `conversation`: Per-channel history with per-key locking
//! - `prompt`: System preamble and outbound message assembly
//! - `delivery`: Splits replies to the platform message limit
//! - `corrections`: The "awaiting corrections" window
//! - `host`: Identity and transport interfaces the host implements
//! - `types`: Shared types across the agent core
//! - `errors`: Agent-level error types

pub mod addressing;
pub mod conversation;
pub mod corrections;
pub mod delivery;
pub mod errors;
pub mod host;
pub mod orchestrator;
pub mod prompt;
pub mod response_engine;
pub mod tool_invoker;
pub mod types;

// Re-exports for convenience
pub use addressing::AddressingPolicy;
pub use conversation::ConversationStore;
pub use errors::AgentError;
pub use host::{IdentityResolver, StaticIdentity, Transport};
pub use orchestrator::Orchestrator;
pub use prompt::NO_RESPONSE;
pub use response_engine::{EngineSettings, ResponseEngine};
pub use tool_invoker::ToolInvoker;
pub use types::{
    Audience, Author, ConversationEntry, ConversationKey, DispatchOutcome, InboundMessage,
    ResponseClassification, SuppressReason, ToolInvocation,
};
