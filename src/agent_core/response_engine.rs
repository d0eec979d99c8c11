//! ResponseEngine — obtains and classifies the model's reply.
//!
//! Retry policy: the first request asks for one candidate. If every candidate
//! merely echoes the triggering message, the request is repeated asking for
//! one more candidate each time, up to the configured ceiling. A tool call in
//! the top candidate short-circuits everything and is handed to the
//! `ToolInvoker`.

use std::sync::Arc;

use crate::inference::client::CompletionService;
use crate::inference::config::ChatConfig;
use crate::inference::errors::InferenceError;
use crate::inference::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ToolCallResponse, ToolDefinition,
};
use crate::tools::SharedCatalog;

use super::conversation::ConversationStore;
use super::host::IdentityResolver;
use super::prompt::{outbound_messages, NO_RESPONSE};
use super::tool_invoker::ToolInvoker;
use super::types::{ConversationEntry, InboundMessage, ResponseClassification};

// ─── Settings ───────────────────────────────────────────────────────────────

/// Request parameters shared by every completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub model: String,
    pub temperature: f32,
    /// Attempts before a reply is degenerate; attempt `k` asks for `k` candidates.
    pub retry_ceiling: u32,
    /// Platform message limit in characters.
    pub max_reply_len: usize,
}

impl From<&ChatConfig> for EngineSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            retry_ceiling: config.retry_bad_responses.max(1),
            max_reply_len: config.max_reply_len,
        }
    }
}

impl EngineSettings {
    /// A one-candidate request on behalf of `trigger`'s author.
    pub fn request(&self, trigger: &InboundMessage, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        ChatCompletionRequest::new(
            self.model.clone(),
            self.temperature,
            messages,
            trigger.author.name.clone(),
        )
    }
}

/// What one round of attempts produced.
#[derive(Debug)]
enum Attempt {
    Reply(String),
    ToolCalls(Vec<ToolCallResponse>),
    Exhausted,
}

/// First candidate with text that does not start with the trigger text.
pub fn accept_candidate(response: &ChatCompletionResponse, trigger_text: &str) -> Option<String> {
    response
        .choices
        .iter()
        .filter_map(|c| c.message.content.as_deref())
        .find(|text| !text.is_empty() && !text.starts_with(trigger_text))
        .map(str::to_string)
}

// ─── ResponseEngine ─────────────────────────────────────────────────────────

pub struct ResponseEngine {
    settings: EngineSettings,
    service: Arc<dyn CompletionService>,
    store: Arc<ConversationStore>,
    catalog: Arc<SharedCatalog>,
    identity: Arc<dyn IdentityResolver>,
    invoker: ToolInvoker,
}

impl ResponseEngine {
    pub fn new(
        settings: EngineSettings,
        service: Arc<dyn CompletionService>,
        store: Arc<ConversationStore>,
        catalog: Arc<SharedCatalog>,
        identity: Arc<dyn IdentityResolver>,
        invoker: ToolInvoker,
    ) -> Self {
        Self {
            settings,
            service,
            store,
            catalog,
            identity,
            invoker,
        }
    }

    /// Ask the model about `trigger` and classify the answer.
    ///
    /// Never fails: service errors become `Degenerate`. A `Text` answer is
    /// recorded in history before it is returned.
    pub async fn respond(
        &self,
        trigger: &InboundMessage,
        must_respond: bool,
    ) -> ResponseClassification {
        let tools = self.catalog.current().definitions();
        let messages =
            outbound_messages(&self.store, self.identity.as_ref(), trigger, must_respond).await;

        let accepted = match self.first_usable_reply(trigger, messages, tools).await {
            Ok(Attempt::Reply(text)) => text,
            Ok(Attempt::ToolCalls(calls)) => {
                return match self.invoker.invoke(trigger, &calls).await {
                    Some(invocation) => ResponseClassification::ToolRequested(invocation),
                    None => ResponseClassification::Degenerate,
                };
            }
            Ok(Attempt::Exhausted) => {
                tracing::error!(
                    attempts = self.settings.retry_ceiling,
                    "all candidates from the completion service started with the prompt"
                );
                return ResponseClassification::Degenerate;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    transport = e.is_transport(),
                    body = e.error_body().unwrap_or_default(),
                    "completion service request failed"
                );
                return ResponseClassification::Degenerate;
            }
        };

        if accepted == NO_RESPONSE {
            tracing::debug!(author = %trigger.author.name, "model declined to respond");
            return ResponseClassification::NoResponse;
        }

        if let Err(e) = self
            .store
            .append(&trigger.channel, ConversationEntry::assistant(accepted.as_str()))
            .await
        {
            tracing::error!(error = %e, "failed to record assistant turn");
        }

        ResponseClassification::Text(accepted)
    }

    /// Bounded retry loop: attempt `n` requests `n` candidates.
    async fn first_usable_reply(
        &self,
        trigger: &InboundMessage,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
    ) -> Result<Attempt, InferenceError> {
        for n in 1..=self.settings.retry_ceiling {
            let request = self
                .settings
                .request(trigger, messages.clone())
                .with_tools(tools.clone())
                .with_candidates(n);

            let response = self.service.complete(request).await?;
            tracing::debug!(
                n,
                choices = response.choices.len(),
                conversations = self.store.conversation_count(),
                "got response from completion service"
            );

            // The top candidate's tool call is authoritative.
            if let Some(calls) = response.top_tool_calls() {
                return Ok(Attempt::ToolCalls(calls.to_vec()));
            }

            if let Some(text) = accept_candidate(&response, &trigger.text) {
                return Ok(Attempt::Reply(text));
            }

            tracing::warn!(n, "every candidate echoed the prompt, retrying");
        }

        Ok(Attempt::Exhausted)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
