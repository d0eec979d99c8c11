//! Synthetic invocation context for commands called as tools.
//!
//! A command normally answers the user directly. When the model invokes it,
//! its responses are captured here instead, serialized into the tool result,
//! and only delivered after the model has produced its final answer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::agent_core::types::{Author, ConversationKey};

// ─── Response ───────────────────────────────────────────────────────────────

/// One response a command emitted through its context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub content: Option<String>,
    /// Names of attached files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub ephemeral: bool,
}

impl Response {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.files.push(file_name.into());
        self
    }
}

// ─── InvocationContext ──────────────────────────────────────────────────────

/// The context a command runs inside when invoked as a tool.
///
/// Cheap to clone; clones share the captured response list.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    channel: ConversationKey,
    guild: Option<String>,
    author: Author,
    responses: Arc<Mutex<Vec<Response>>>,
}

impl InvocationContext {
    pub fn new(channel: ConversationKey, guild: Option<String>, author: Author) -> Self {
        Self {
            channel,
            guild,
            author,
            responses: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Channel the triggering message arrived in.
    pub fn channel(&self) -> &ConversationKey {
        &self.channel
    }

    pub fn guild(&self) -> Option<&str> {
        self.guild.as_deref()
    }

    /// Author of the triggering message.
    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Capture a response.
    pub fn respond(&self, response: Response) {
        self.lock().push(response);
    }

    pub fn respond_text(&self, content: impl Into<String>) {
        self.respond(Response::text(content));
    }

    /// Snapshot of the responses captured so far.
    pub fn responses(&self) -> Vec<Response> {
        self.lock().clone()
    }

    pub fn response_count(&self) -> usize {
        self.lock().len()
    }

    /// JSON array of the captured responses, as sent back to the model.
    pub fn serialize_responses(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&*self.lock())
    }

    /// Replace the text of the only captured response.
    ///
    /// Returns `false` and changes nothing unless exactly one response was
    /// captured.
    pub fn overwrite_single_content(&self, content: impl Into<String>) -> bool {
        let mut responses = self.lock();
        match responses.as_mut_slice() {
            [only] => {
                only.content = Some(content.into());
                true
            }
            _ => false,
        }
    }

    /// Drain the captured responses for delivery.
    pub fn take_responses(&self) -> Vec<Response> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Response>> {
        // A panic while pushing cannot leave the Vec half-written.
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> InvocationContext {
        InvocationContext::new(
            ConversationKey::from("general"),
            None,
            Author::new("u1", "alice"),
        )
    }

    #[test]
    fn test_clones_share_responses() {
        let ctx = ctx();
        let clone = ctx.clone();
        clone.respond_text("hello");
        assert_eq!(ctx.response_count(), 1);
        assert_eq!(ctx.responses()[0].content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_serialize_responses() {
        let ctx = ctx();
        ctx.respond(Response::text("report ready").with_file("report.pdf"));
        let json: serde_json::Value =
            serde_json::from_str(&ctx.serialize_responses().unwrap()).unwrap();
        assert_eq!(json[0]["content"], "report ready");
        assert_eq!(json[0]["files"][0], "report.pdf");
        assert_eq!(json[0]["ephemeral"], false);
    }

    #[test]
    fn test_serialize_empty_is_empty_array() {
        assert_eq!(ctx().serialize_responses().unwrap(), "[]");
    }

    #[test]
    fn test_overwrite_only_when_single() {
        let ctx = ctx();
        assert!(!ctx.overwrite_single_content("x"));

        ctx.respond_text("raw");
        assert!(ctx.overwrite_single_content("polished"));
        assert_eq!(ctx.responses()[0].content.as_deref(), Some("polished"));

        ctx.respond_text("second");
        assert!(!ctx.overwrite_single_content("y"));
        assert_eq!(ctx.responses()[1].content.as_deref(), Some("second"));
    }

    #[test]
    fn test_take_responses_drains() {
        let ctx = ctx();
        ctx.respond_text("a");
        ctx.respond_text("b");
        let taken = ctx.take_responses();
        assert_eq!(taken.len(), 2);
        assert_eq!(ctx.response_count(), 0);
    }
}
