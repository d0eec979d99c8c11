//! Outbound message assembly.
//!
//! The model sees the channel history, optionally preceded by exactly one
//! system entry combining the tool-usage instruction, the "not addressed"
//! instruction and the persona description for the audience.

use crate::inference::types::ChatMessage;

use super::conversation::ConversationStore;
use super::host::IdentityResolver;
use super::types::{ConversationEntry, InboundMessage};

/// Reply the model gives when it decides a message is not meant for it.
pub const NO_RESPONSE: &str = "__NO_RESPONSE__";

/// Nudges the model toward using tools without interrogating the user.
pub const TOOL_SYSTEM_MESSAGE: &str = "If multiple functions could be returned, pick one instead \
of asking which function to use.\n\
If you get a file from a function, do *NOT* try to embed it with markdown syntax.\n";

/// Lets the model opt out of answering messages that were not addressed to it.
pub fn no_response_system_message() -> String {
    format!("If you do not believe a message is intended for you, respond with: {NO_RESPONSE}\n")
}

/// Compose the single system preamble, if one is needed.
///
/// A preamble is sent when the bot may stay silent, or when there is a
/// persona description to convey.
pub fn compose_preamble(must_respond: bool, description: &str) -> Option<ConversationEntry> {
    if must_respond && description.is_empty() {
        return None;
    }

    let mut text = String::from(TOOL_SYSTEM_MESSAGE);
    if !must_respond {
        text.push_str(&no_response_system_message());
    }
    text.push_str(description);

    Some(ConversationEntry::SystemPreamble { text })
}

/// History plus optional preamble, converted to wire messages.
pub fn to_chat_messages(
    preamble: Option<ConversationEntry>,
    history: &[ConversationEntry],
) -> Vec<ChatMessage> {
    preamble
        .iter()
        .chain(history.iter())
        .map(ConversationEntry::to_chat_message)
        .collect()
}

/// Build the message list for a completion call about `trigger`.
///
/// Stored history is copied, never modified.
pub async fn outbound_messages(
    store: &ConversationStore,
    identity: &dyn IdentityResolver,
    trigger: &InboundMessage,
    must_respond: bool,
) -> Vec<ChatMessage> {
    let description = identity.system_description(&trigger.audience()).await;
    let history = store.snapshot(&trigger.channel).await;
    to_chat_messages(compose_preamble(must_respond, &description), &history)
}
