//! ConversationStore — per-channel conversation history.
//!
//! Responsibilities:
//! - Keep one ordered, append-only entry sequence per conversation key
//! - Serialize mutation per key, never globally
//! - Hand out copies so callers can prepend transient entries
//!
//! History lives for the life of the process only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as TokioMutex;

use super::errors::AgentError;
use super::types::{ConversationEntry, ConversationKey};

type History = Arc<TokioMutex<Vec<ConversationEntry>>>;

// ─── ConversationStore ──────────────────────────────────────────────────────

/// Conversation key → ordered history, each guarded by its own lock.
///
/// The outer map lock is only held to look up or create a slot, never across
/// an await, so channels do not block each other.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Mutex<HashMap<ConversationKey, History>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The history slot for `key`, created empty on first access.
    fn slot(&self, key: &ConversationKey) -> History {
        let mut map = self
            .conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(key.clone()).or_default())
    }

    /// The history slot for `key`, if anything was ever appended to it.
    fn existing(&self, key: &ConversationKey) -> Option<History> {
        self.conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(Arc::clone)
    }

    /// Append one entry under the key's lock.
    ///
    /// A `ToolResult` must follow the assistant turn that requested it;
    /// anything else is rejected and the history left unchanged.
    pub async fn append(
        &self,
        key: &ConversationKey,
        entry: ConversationEntry,
    ) -> Result<(), AgentError> {
        let slot = self.slot(key);
        let mut history = slot.lock().await;

        if let ConversationEntry::ToolResult { tool_call_id, .. } = &entry {
            if !history.iter().any(|e| e.requests_tool_call(tool_call_id)) {
                return Err(AgentError::OrphanToolResult {
                    channel: key.to_string(),
                    tool_call_id: tool_call_id.clone(),
                });
            }
        }

        history.push(entry);
        Ok(())
    }

    /// A copy of the key's history, in insertion order.
    pub async fn snapshot(&self, key: &ConversationKey) -> Vec<ConversationEntry> {
        match self.existing(key) {
            Some(slot) => slot.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Number of entries recorded for `key`.
    pub async fn len(&self, key: &ConversationKey) -> usize {
        match self.existing(key) {
            Some(slot) => slot.lock().await.len(),
            None => 0,
        }
    }

    /// Number of conversations with at least one append attempt.
    pub fn conversation_count(&self) -> usize {
        self.conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
