//! Inference — client for the remote chat-completion service.
//!
//! This module handles all communication with the completion endpoint:
//! - Request/response wire types (OpenAI Chat Completions with tool calling)
//! - Configuration loading from `config/chat.yaml`
//! - The `CompletionService` seam the engine calls through
//! - A `reqwest`-backed implementation of that seam
//!
//! The engine never talks HTTP directly. Swapping the endpoint (OpenAI, a
//! local proxy, a scripted test double) is a matter of handing it a
//! different `CompletionService`.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-exports for convenience
pub use client::{CompletionService, InferenceClient};
pub use config::ChatConfig;
pub use errors::InferenceError;
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Role, ToolCallResponse,
    ToolDefinition,
};
