//! Test doubles shared across module tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::agent_core::conversation::ConversationStore;
use crate::agent_core::errors::AgentError;
use crate::agent_core::host::{StaticIdentity, Transport};
use crate::agent_core::response_engine::{EngineSettings, ResponseEngine};
use crate::agent_core::tool_invoker::ToolInvoker;
use crate::agent_core::types::{Author, ConversationEntry, ConversationKey, InboundMessage};
use crate::inference::client::CompletionService;
use crate::inference::config::ChatConfig;
use crate::inference::errors::InferenceError;
use crate::inference::types::{
    ChatCompletionRequest, ChatCompletionResponse, FunctionCallResponse, ToolCallResponse,
};
use crate::tools::{
    required_arg, CommandNode, FnCommand, OptionSpec, ParamType, SharedCatalog, ToolCatalog,
    ToolError,
};

// ─── Completion service ─────────────────────────────────────────────────────

type Scripted = Result<ChatCompletionResponse, InferenceError>;

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedService {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedService {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn complete(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, InferenceError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(InferenceError::HttpError {
                status: 500,
                body: "script exhausted".into(),
            }))
    }
}

/// A response with one text candidate per entry.
pub fn completion(contents: &[&str]) -> ChatCompletionResponse {
    let choices: Vec<_> = contents
        .iter()
        .map(|c| json!({"message": {"role": "assistant", "content": c}, "finish_reason": "stop"}))
        .collect();
    serde_json::from_value(json!({ "choices": choices })).unwrap()
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCallResponse {
    ToolCallResponse {
        id: id.into(),
        r#type: "function".into(),
        function: FunctionCallResponse {
            name: name.into(),
            arguments: arguments.into(),
        },
    }
}

/// A response whose single candidate requests every listed call.
pub fn multi_tool_call_completion(calls: &[(&str, &str, &str)]) -> ChatCompletionResponse {
    let calls: Vec<_> = calls
        .iter()
        .map(|(id, name, args)| tool_call(id, name, args))
        .collect();
    serde_json::from_value(json!({
        "choices": [{
            "message": {"role": "assistant", "content": null, "tool_calls": calls},
            "finish_reason": "tool_calls"
        }]
    }))
    .unwrap()
}

pub fn tool_call_completion(id: &str, name: &str, arguments: &str) -> ChatCompletionResponse {
    multi_tool_call_completion(&[(id, name, arguments)])
}

// ─── Transport ──────────────────────────────────────────────────────────────

/// Records delivered chunks; optionally fails every delivery.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ConversationKey, String)>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn sent(&self) -> Vec<(ConversationKey, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, channel: &ConversationKey, text: &str) -> Result<(), AgentError> {
        if self.fail {
            return Err(AgentError::Delivery {
                channel: channel.to_string(),
                reason: "transport closed".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        Ok(())
    }
}

// ─── Commands ───────────────────────────────────────────────────────────────

/// `add(a, b)` responds with the sum.
pub fn add_command() -> FnCommand {
    FnCommand::new("add", "Add two integers", |ctx, args| {
        Box::pin(async move {
            let a: i64 = required_arg(&args, "a")?;
            let b: i64 = required_arg(&args, "b")?;
            ctx.respond_text((a + b).to_string());
            Ok(())
        })
    })
    .param(OptionSpec::new("a", ParamType::Integer).required())
    .param(OptionSpec::new("b", ParamType::Integer).required())
}

pub fn failing_command() -> FnCommand {
    FnCommand::new("explode", "Always fails", |_ctx, _args| {
        Box::pin(async { Err(ToolError::failed("the reactor is offline")) })
    })
}

/// Takes a platform member, which has no schema type.
pub fn unsupported_command() -> FnCommand {
    FnCommand::new("kick", "Kick a member", |_ctx, _args| Box::pin(async { Ok(()) }))
        .param(OptionSpec::new("member", ParamType::Other("member".into())).required())
}

// ─── Messages ───────────────────────────────────────────────────────────────

pub fn alice() -> Author {
    Author::new("u1", "alice")
}

pub fn message_from(author: Author, text: &str) -> InboundMessage {
    InboundMessage::new("m1", "general", author, text)
}

// ─── Engine fixture ─────────────────────────────────────────────────────────

/// A response engine and tool invoker wired to shared doubles.
pub struct EngineFixture {
    pub service: Arc<ScriptedService>,
    pub store: Arc<ConversationStore>,
    pub transport: Arc<RecordingTransport>,
    pub engine: ResponseEngine,
    pub invoker: ToolInvoker,
}

impl EngineFixture {
    pub fn new(service: ScriptedService, commands: Vec<CommandNode>) -> Self {
        let settings = EngineSettings::from(&ChatConfig::default());
        let service = Arc::new(service);
        let store = Arc::new(ConversationStore::new());
        let catalog = Arc::new(SharedCatalog::new(ToolCatalog::build(&commands)));
        let identity = Arc::new(StaticIdentity::new("Alfred", ""));
        let transport = Arc::new(RecordingTransport::default());

        let invoker = || {
            ToolInvoker::new(
                settings.clone(),
                service.clone(),
                Arc::clone(&store),
                Arc::clone(&catalog),
                identity.clone(),
                transport.clone(),
            )
        };

        let engine = ResponseEngine::new(
            settings.clone(),
            service.clone(),
            Arc::clone(&store),
            Arc::clone(&catalog),
            identity.clone(),
            invoker(),
        );
        let invoker = invoker();

        Self {
            service,
            store,
            transport,
            engine,
            invoker,
        }
    }

    /// Record a user turn from alice in `general` and return the message.
    pub async fn record_user(&self, text: &str) -> InboundMessage {
        let message = message_from(alice(), text);
        self.store
            .append(&message.channel, ConversationEntry::user("alice", text))
            .await
            .unwrap();
        message
    }
}
