//! Shared types for the agent core.
//!
//! Inbound messages, conversation history entries, response classifications
//! and dispatch outcomes used across the store, engine and orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::inference::types::{ChatMessage, ToolCallResponse};

// ─── Identities ─────────────────────────────────────────────────────────────

/// Stable identity of a chat channel or thread. Partitions history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ConversationKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Author of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    /// Display name, forwarded to the model as the message `name`.
    pub name: String,
    /// Whether the author is a bot account (this bot or another one).
    pub is_bot: bool,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_bot: false,
        }
    }

    pub fn bot(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            is_bot: true,
            ..Self::new(id, name)
        }
    }
}

/// Who a reply is for. Identity strings are resolved per audience.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Audience {
    pub guild: Option<String>,
    pub channel: ConversationKey,
}

/// A chat message received by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub id: String,
    pub channel: ConversationKey,
    /// Server the channel belongs to; `None` for direct conversations.
    pub guild: Option<String>,
    pub author: Author,
    pub text: String,
    /// Private one-to-one conversation with the bot.
    pub is_direct: bool,
    /// User ids explicitly mentioned in the message.
    pub mentions: Vec<String>,
}

impl InboundMessage {
    pub fn new(
        id: impl Into<String>,
        channel: impl Into<ConversationKey>,
        author: Author,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            channel: channel.into(),
            guild: None,
            author,
            text: text.into(),
            is_direct: false,
            mentions: Vec::new(),
        }
    }

    pub fn direct(mut self) -> Self {
        self.is_direct = true;
        self
    }

    pub fn in_guild(mut self, guild: impl Into<String>) -> Self {
        self.guild = Some(guild.into());
        self
    }

    pub fn mentioning(mut self, user_id: impl Into<String>) -> Self {
        self.mentions.push(user_id.into());
        self
    }

    pub fn audience(&self) -> Audience {
        Audience {
            guild: self.guild.clone(),
            channel: self.channel.clone(),
        }
    }
}

// ─── Conversation History ───────────────────────────────────────────────────

/// One entry of a conversation's history. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationEntry {
    UserTurn {
        author: String,
        text: String,
    },
    AssistantTurn {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCallResponse>>,
    },
    ToolResult {
        tool_call_id: String,
        text: String,
    },
    SystemPreamble {
        text: String,
    },
}

impl ConversationEntry {
    pub fn user(author: impl Into<String>, text: impl Into<String>) -> Self {
        ConversationEntry::UserTurn {
            author: author.into(),
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        ConversationEntry::AssistantTurn {
            text: text.into(),
            tool_calls: None,
        }
    }

    /// Whether this assistant turn requested the given tool call.
    pub fn requests_tool_call(&self, tool_call_id: &str) -> bool {
        match self {
            ConversationEntry::AssistantTurn {
                tool_calls: Some(calls),
                ..
            } => calls.iter().any(|c| c.id == tool_call_id),
            _ => false,
        }
    }

    /// Convert to the wire message sent to the completion service.
    pub fn to_chat_message(&self) -> ChatMessage {
        match self {
            ConversationEntry::UserTurn { author, text } => ChatMessage::user(author, text),
            ConversationEntry::AssistantTurn { text, tool_calls } => {
                ChatMessage::assistant(text, tool_calls.clone())
            }
            ConversationEntry::ToolResult { tool_call_id, text } => {
                ChatMessage::tool(tool_call_id, text)
            }
            ConversationEntry::SystemPreamble { text } => ChatMessage::system(text),
        }
    }
}

// ─── Classification & Outcome ───────────────────────────────────────────────

/// Result of a completed tool dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub tool_call_id: String,
    /// Whether the command ran without error.
    pub succeeded: bool,
    /// Chat messages delivered while flushing captured responses.
    pub delivered_chunks: usize,
}

/// How the engine classified the completion service's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseClassification {
    /// A natural-language reply to deliver.
    Text(String),
    /// The model called a tool; the invoker already handled delivery.
    ToolRequested(ToolInvocation),
    /// The model declined to answer with the sentinel string.
    NoResponse,
    /// No usable answer after retries, or a service error.
    Degenerate,
}

/// Why a message produced no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// The bot wrote the message itself.
    OwnMessage,
    /// Another bot wrote the message.
    BotAuthor,
    /// Not addressed and no corrections window open.
    NotAddressed,
    /// The model answered with the sentinel.
    Declined,
    /// No usable answer was obtained.
    Degenerate,
    /// The reply could not be delivered.
    DeliveryFailed,
}

/// Terminal state of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The message was answered. After a tool dispatch `chunks` may be zero:
    /// the command produced no text and the model's follow-up only went into
    /// history.
    Delivered {
        chunks: usize,
        /// Set when the reply came out of a tool dispatch.
        tool: Option<String>,
    },
    Suppressed(SuppressReason),
}

// ─── Tests ──────────────────────────────────────────────────────────────────
