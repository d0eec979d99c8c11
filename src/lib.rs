//! Conversational tool-dispatch engine for chat bots.
//!
//! A host (a chat platform adapter) feeds inbound messages to an
//! [`Orchestrator`]. The orchestrator records them per channel, decides
//! whether the bot should answer, asks an OpenAI-compatible completion
//! service for a reply, and runs host commands when the model calls them
//! as tools.

pub mod agent_core;
pub mod inference;
pub mod logging;
pub mod tools;

#[cfg(test)]
mod testing;

pub use agent_core::{
    Author, DispatchOutcome, IdentityResolver, InboundMessage, Orchestrator, StaticIdentity,
    Transport,
};
pub use inference::{ChatConfig, CompletionService, InferenceClient};
pub use tools::{Command, CommandNode, CommandRegistry, FnCommand};
