//! Host collaborator interfaces.
//!
//! The engine does not know which chat platform it runs on. The host hands it
//! an identity resolver and a transport; the command registry lives in
//! `crate::tools`.

use async_trait::async_trait;

use super::errors::AgentError;
use super::types::{Audience, ConversationKey};

/// Resolves the bot's per-audience identity strings.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// The name the bot currently goes by for this audience.
    async fn display_name(&self, audience: &Audience) -> String;

    /// Persona description prepended to the model prompt. May be empty.
    async fn system_description(&self, audience: &Audience) -> String;
}

/// Sends text into a channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one chunk. Chunks never exceed the platform limit.
    async fn deliver(&self, channel: &ConversationKey, text: &str) -> Result<(), AgentError>;
}

/// An identity resolver that returns the same strings for every audience.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    pub display_name: String,
    pub description: String,
}

impl StaticIdentity {
    pub fn new(display_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            description: description.into(),
        }
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn display_name(&self, _audience: &Audience) -> String {
        self.display_name.clone()
    }

    async fn system_description(&self, _audience: &Audience) -> String {
        self.description.clone()
    }
}
