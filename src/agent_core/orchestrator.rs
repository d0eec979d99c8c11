//! Orchestrator — per-message dispatch state machine.
//!
//! For each inbound message:
//! 1. **Filter** — the bot's own messages are dropped unrecorded
//! 2. **Record** — the user turn is appended to the channel history
//! 3. **Gate** — other bots are never answered; unaddressed messages are only
//!    answered while the corrections window is open
//! 4. **Respond** — the `ResponseEngine` classifies the model's answer
//! 5. **Deliver** — text is chunked to the platform limit and sent
//!
//! Every path ends in a `DispatchOutcome`. No error escapes `handle`.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::inference::client::CompletionService;
use crate::inference::config::ChatConfig;
use crate::tools::{CommandRegistry, SharedCatalog, ToolCatalog};

use super::addressing::AddressingPolicy;
use super::conversation::ConversationStore;
use super::corrections::CorrectionsWindow;
use super::delivery::deliver_chunked;
use super::host::{IdentityResolver, Transport};
use super::response_engine::{EngineSettings, ResponseEngine};
use super::tool_invoker::ToolInvoker;
use super::types::{
    ConversationEntry, DispatchOutcome, InboundMessage, ResponseClassification, SuppressReason,
};

pub struct Orchestrator {
    bot_id: String,
    max_reply_len: usize,
    store: Arc<ConversationStore>,
    catalog: Arc<SharedCatalog>,
    addressing: AddressingPolicy,
    engine: ResponseEngine,
    transport: Arc<dyn Transport>,
    corrections: CorrectionsWindow,
}

impl Orchestrator {
    /// Wire the engine to its host collaborators and build the initial
    /// tool catalog from `registry`.
    pub fn new(
        config: &ChatConfig,
        bot_id: impl Into<String>,
        service: Arc<dyn CompletionService>,
        identity: Arc<dyn IdentityResolver>,
        transport: Arc<dyn Transport>,
        registry: &dyn CommandRegistry,
    ) -> Self {
        let bot_id = bot_id.into();
        let settings = EngineSettings::from(config);
        let store = Arc::new(ConversationStore::new());
        let catalog = Arc::new(SharedCatalog::new(ToolCatalog::build(&registry.commands())));

        let invoker = ToolInvoker::new(
            settings.clone(),
            Arc::clone(&service),
            Arc::clone(&store),
            Arc::clone(&catalog),
            Arc::clone(&identity),
            Arc::clone(&transport),
        );
        let engine = ResponseEngine::new(
            settings,
            service,
            Arc::clone(&store),
            Arc::clone(&catalog),
            Arc::clone(&identity),
            invoker,
        );

        tracing::info!(
            model = %config.model,
            tools = catalog.current().len(),
            corrections_window_secs = config.corrections_window_secs,
            "orchestrator ready"
        );

        Self {
            addressing: AddressingPolicy::new(bot_id.clone(), identity),
            bot_id,
            max_reply_len: config.max_reply_len,
            store,
            catalog,
            engine,
            transport,
            corrections: CorrectionsWindow::new(Duration::from_secs(config.corrections_window_secs)),
        }
    }

    /// Process one inbound message to completion.
    pub async fn handle(&self, message: InboundMessage) -> DispatchOutcome {
        let span = tracing::info_span!(
            "handle",
            channel = %message.channel,
            message_id = %message.id,
            author = %message.author.name,
        );
        let outcome = self.dispatch(&message).instrument(span).await;
        tracing::debug!(channel = %message.channel, ?outcome, "message handled");
        outcome
    }

    async fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        if message.author.id == self.bot_id {
            return DispatchOutcome::Suppressed(SuppressReason::OwnMessage);
        }

        if let Err(e) = self
            .store
            .append(
                &message.channel,
                ConversationEntry::user(message.author.name.as_str(), message.text.as_str()),
            )
            .await
        {
            tracing::error!(error = %e, "failed to record user turn");
        }

        if message.author.is_bot {
            return DispatchOutcome::Suppressed(SuppressReason::BotAuthor);
        }

        let must_respond = self.addressing.must_respond(message).await;
        if !must_respond && !self.corrections.is_open() {
            return DispatchOutcome::Suppressed(SuppressReason::NotAddressed);
        }

        match self.engine.respond(message, must_respond).await {
            ResponseClassification::Text(text) => {
                match deliver_chunked(
                    self.transport.as_ref(),
                    &message.channel,
                    &text,
                    self.max_reply_len,
                )
                .await
                {
                    Ok(chunks) => {
                        if must_respond {
                            self.corrections.open();
                        }
                        DispatchOutcome::Delivered { chunks, tool: None }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deliver reply");
                        DispatchOutcome::Suppressed(SuppressReason::DeliveryFailed)
                    }
                }
            }
            ResponseClassification::ToolRequested(invocation) => DispatchOutcome::Delivered {
                chunks: invocation.delivered_chunks,
                tool: Some(invocation.tool_name),
            },
            ResponseClassification::NoResponse => {
                DispatchOutcome::Suppressed(SuppressReason::Declined)
            }
            ResponseClassification::Degenerate => {
                tracing::warn!(must_respond, "no usable reply from the completion service");
                DispatchOutcome::Suppressed(SuppressReason::Degenerate)
            }
        }
    }

    /// Rebuild the tool catalog from `registry` and swap it in.
    ///
    /// Messages already in flight keep the catalog they started with.
    /// Returns the number of tools now available.
    pub fn rebuild_tools(&self, registry: &dyn CommandRegistry) -> usize {
        let count = self
            .catalog
            .replace(ToolCatalog::build(&registry.commands()));
        tracing::info!(tools = count, "tool catalog rebuilt");
        count
    }

    /// Names of the tools currently offered to the model.
    pub fn tool_names(&self) -> Vec<String> {
        self.catalog
            .current()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Whether unaddressed messages are currently being answered.
    pub fn awaiting_corrections(&self) -> bool {
        self.corrections.is_open()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
