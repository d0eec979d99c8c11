//! AddressingPolicy — does an inbound message require a reply?
//!
//! A reply is mandatory for direct conversations, explicit mentions of the
//! bot, and messages containing the bot's display name. Everything else is
//! optional and only answered while a corrections window is open.

use std::sync::Arc;

use super::host::IdentityResolver;
use super::types::InboundMessage;

pub struct AddressingPolicy {
    /// The bot's own user id, as it appears in mention lists.
    bot_id: String,
    identity: Arc<dyn IdentityResolver>,
}

impl AddressingPolicy {
    pub fn new(bot_id: impl Into<String>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            bot_id: bot_id.into(),
            identity,
        }
    }

    /// Whether the bot *must* answer `message`.
    ///
    /// `false` means the bot *may* answer; the orchestrator decides.
    pub async fn must_respond(&self, message: &InboundMessage) -> bool {
        if message.is_direct {
            return true;
        }

        if message.mentions.iter().any(|id| *id == self.bot_id) {
            return true;
        }

        let name = self
            .identity
            .display_name(&message.audience())
            .await
            .to_lowercase();

        // An empty name would match every message.
        !name.is_empty() && message.text.to_lowercase().contains(&name)
    }
}
