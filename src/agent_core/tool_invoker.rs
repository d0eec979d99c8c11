//! ToolInvoker — runs a model-requested command and closes the loop.
//!
//! Sequence for one tool call:
//! 1. Record the assistant turn that requested the call
//! 2. Run the command in a capturing `InvocationContext`
//! 3. Record the serialized responses (or the error) as the tool result
//! 4. Ask the model once more, without tools, for a final answer
//! 5. Deliver the captured responses, the single one rewritten to the final answer
//!
//! Tool failures never propagate. They are reported to the model as the tool
//! result text and the conversation carries on.

use std::sync::Arc;

use crate::inference::client::CompletionService;
use crate::inference::types::ToolCallResponse;
use crate::tools::{InvocationContext, SharedCatalog, ToolError};

use super::conversation::ConversationStore;
use super::delivery::deliver_chunked;
use super::host::{IdentityResolver, Transport};
use super::prompt::{outbound_messages, NO_RESPONSE};
use super::response_engine::EngineSettings;
use super::types::{ConversationEntry, InboundMessage, ToolInvocation};

pub struct ToolInvoker {
    settings: EngineSettings,
    service: Arc<dyn CompletionService>,
    store: Arc<ConversationStore>,
    catalog: Arc<SharedCatalog>,
    identity: Arc<dyn IdentityResolver>,
    transport: Arc<dyn Transport>,
}

impl ToolInvoker {
    pub fn new(
        settings: EngineSettings,
        service: Arc<dyn CompletionService>,
        store: Arc<ConversationStore>,
        catalog: Arc<SharedCatalog>,
        identity: Arc<dyn IdentityResolver>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            settings,
            service,
            store,
            catalog,
            identity,
            transport,
        }
    }

    /// Honor the first of `requested`; any further calls are dropped.
    ///
    /// Returns `None` only when `requested` is empty.
    pub async fn invoke(
        &self,
        trigger: &InboundMessage,
        requested: &[ToolCallResponse],
    ) -> Option<ToolInvocation> {
        let call = requested.first()?;
        if requested.len() > 1 {
            tracing::warn!(
                honored = %call.function.name,
                dropped = requested.len() - 1,
                "model requested several tool calls, only the first is run"
            );
        }

        let channel = &trigger.channel;
        self.record(
            trigger,
            ConversationEntry::AssistantTurn {
                text: trigger.text.clone(),
                tool_calls: Some(vec![call.clone()]),
            },
        )
        .await;

        let ctx = InvocationContext::new(
            channel.clone(),
            trigger.guild.clone(),
            trigger.author.clone(),
        );

        let (result_text, succeeded) = match self.run_command(call, &ctx).await {
            Ok(serialized) => (serialized, true),
            Err(e) => {
                tracing::warn!(tool = %call.function.name, error = %e, "tool call failed");
                (e.to_string(), false)
            }
        };

        self.record(
            trigger,
            ConversationEntry::ToolResult {
                tool_call_id: call.id.clone(),
                text: result_text,
            },
        )
        .await;

        self.finish(trigger, &ctx).await;

        let delivered_chunks = self.flush(trigger, &ctx).await;

        Some(ToolInvocation {
            tool_name: call.function.name.clone(),
            tool_call_id: call.id.clone(),
            succeeded,
            delivered_chunks,
        })
    }

    /// Look up, validate and run the command. Returns the captured responses
    /// as a JSON array.
    async fn run_command(
        &self,
        call: &ToolCallResponse,
        ctx: &InvocationContext,
    ) -> Result<String, ToolError> {
        let catalog = self.catalog.current();
        let name = call.function.name.as_str();
        let args = catalog.parse_arguments(name, &call.function.arguments)?;
        let entry = catalog
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool { name: name.to_string() })?;

        tracing::info!(
            tool = name,
            command = %entry.qualified_name,
            tool_call_id = %call.id,
            "calling tool"
        );
        entry.command.invoke(ctx, args).await?;

        Ok(ctx.serialize_responses()?)
    }

    /// One follow-up completion with the tool result in history.
    async fn finish(&self, trigger: &InboundMessage, ctx: &InvocationContext) {
        let messages =
            outbound_messages(&self.store, self.identity.as_ref(), trigger, false).await;
        let request = self.settings.request(trigger, messages);

        let response = match self.service.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "final completion after tool call failed");
                return;
            }
        };

        let Some(text) = response.top_content().filter(|t| !t.is_empty()) else {
            tracing::debug!("final completion after tool call had no text");
            return;
        };

        if text == NO_RESPONSE {
            tracing::debug!("model declined to comment on the tool result");
            return;
        }

        self.record(trigger, ConversationEntry::assistant(text)).await;

        if text != trigger.text && ctx.overwrite_single_content(text) {
            tracing::debug!("replaced captured tool response with final answer");
        }
    }

    /// Deliver every captured response with text. Returns chunks delivered.
    async fn flush(&self, trigger: &InboundMessage, ctx: &InvocationContext) -> usize {
        let mut delivered = 0;
        for response in ctx.take_responses() {
            let Some(content) = response.content.filter(|c| !c.is_empty()) else {
                continue;
            };
            match deliver_chunked(
                self.transport.as_ref(),
                &trigger.channel,
                &content,
                self.settings.max_reply_len,
            )
            .await
            {
                Ok(n) => delivered += n,
                Err(e) => {
                    tracing::error!(error = %e, "failed to deliver tool response");
                    break;
                }
            }
        }
        delivered
    }

    async fn record(&self, trigger: &InboundMessage, entry: ConversationEntry) {
        if let Err(e) = self.store.append(&trigger.channel, entry).await {
            tracing::error!(error = %e, "failed to record conversation entry");
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::errors::InferenceError;
    use crate::testing::{
        add_command, completion, failing_command, multi_tool_call_completion, tool_call, EngineFixture,
        ScriptedService,
    };
    use crate::tools::{CommandNode, FnCommand, Response};
    use serde_json::Value;

    fn add_fixture(script: ScriptedService) -> EngineFixture {
        EngineFixture::new(script, vec![CommandNode::leaf(add_command())])
    }

    fn tool_result_text(history: &[ConversationEntry]) -> String {
        history
            .iter()
            .find_map(|e| match e {
                ConversationEntry::ToolResult { text, .. } => Some(text.clone()),
                _ => None,
            })
            .expect("tool result recorded")
    }

    #[tokio::test]
    async fn test_add_round_trip() {
        let fx = add_fixture(ScriptedService::new([Ok(completion(&["2 plus 3 is 5, sir."]))]));
        let trigger = fx.record_user("add 2 and 3").await;

        let invocation = fx
            .invoker
            .invoke(&trigger, &[tool_call("call_1", "add", r#"{"a":2,"b":3}"#)])
            .await
            .unwrap();

        assert_eq!(invocation.tool_name, "add");
        assert_eq!(invocation.tool_call_id, "call_1");
        assert!(invocation.succeeded);
        assert_eq!(invocation.delivered_chunks, 1);

        let history = fx.store.snapshot(&trigger.channel).await;
        assert_eq!(history.len(), 4);
        assert!(history[1].requests_tool_call("call_1"));
        let result: Value = serde_json::from_str(&tool_result_text(&history)).unwrap();
        assert_eq!(result[0]["content"], "5");
        assert_eq!(history[3], ConversationEntry::assistant("2 plus 3 is 5, sir."));

        // the single captured response is rewritten to the final answer
        assert_eq!(fx.transport.texts(), vec!["2 plus 3 is 5, sir."]);

        let requests = fx.service.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_none(), "follow-up offers no tools");
        assert_eq!(requests[0].n, 1);
        assert!(requests[0]
            .messages
            .iter()
            .any(|m| m.tool_call_id.as_deref() == Some("call_1")));
    }

    #[tokio::test]
    async fn test_echoed_final_answer_keeps_raw_response() {
        let fx = add_fixture(ScriptedService::new([Ok(completion(&["add 2 and 3"]))]));
        let trigger = fx.record_user("add 2 and 3").await;

        fx.invoker
            .invoke(&trigger, &[tool_call("c1", "add", r#"{"a":2,"b":3}"#)])
            .await
            .unwrap();

        assert_eq!(fx.transport.texts(), vec!["5"]);
    }

    #[tokio::test]
    async fn test_declined_follow_up_is_neither_recorded_nor_delivered() {
        let fx = add_fixture(ScriptedService::new([Ok(completion(&[NO_RESPONSE]))]));
        let trigger = fx.record_user("add 2 and 3").await;

        let invocation = fx
            .invoker
            .invoke(&trigger, &[tool_call("c1", "add", r#"{"a":2,"b":3}"#)])
            .await
            .unwrap();

        assert_eq!(invocation.delivered_chunks, 1);
        assert_eq!(fx.transport.texts(), vec!["5"]);
        let history = fx.store.snapshot(&trigger.channel).await;
        assert_eq!(history.len(), 3);
        assert!(matches!(history.last(), Some(ConversationEntry::ToolResult { .. })));
    }

    #[tokio::test]
    async fn test_failing_tool_reports_error_to_model() {
        let fx = EngineFixture::new(
            ScriptedService::new([Ok(completion(&["Sorry sir, that failed."]))]),
            vec![CommandNode::leaf(failing_command())],
        );
        let trigger = fx.record_user("do the thing").await;

        let invocation = fx
            .invoker
            .invoke(&trigger, &[tool_call("c1", "explode", "{}")])
            .await
            .unwrap();

        assert!(!invocation.succeeded);
        let history = fx.store.snapshot(&trigger.channel).await;
        assert_eq!(tool_result_text(&history), "the reactor is offline");
        // nothing was captured, so nothing is delivered
        assert!(fx.transport.texts().is_empty());
        assert_eq!(fx.service.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments() {
        let fx = add_fixture(ScriptedService::new([
            Ok(completion(&["?"])),
            Ok(completion(&["?"])),
        ]));
        let trigger = fx.record_user("hmm").await;

        let unknown = fx
            .invoker
            .invoke(&trigger, &[tool_call("c1", "nope", "{}")])
            .await
            .unwrap();
        assert!(!unknown.succeeded);

        let bad = fx
            .invoker
            .invoke(&trigger, &[tool_call("c2", "add", "{oops")])
            .await
            .unwrap();
        assert!(!bad.succeeded);

        let history = fx.store.snapshot(&trigger.channel).await;
        let results: Vec<&str> = history
            .iter()
            .filter_map(|e| match e {
                ConversationEntry::ToolResult { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(results[0], "unknown tool: 'nope'");
        assert!(results[1].starts_with("invalid arguments for 'add'"));
    }

    #[tokio::test]
    async fn test_only_first_tool_call_runs() {
        let fx = add_fixture(ScriptedService::new([Ok(completion(&["done"]))]));
        let trigger = fx.record_user("add twice").await;
        let calls = multi_tool_call_completion(&[
            ("c1", "add", r#"{"a":1,"b":1}"#),
            ("c2", "add", r#"{"a":5,"b":5}"#),
        ]);

        let invocation = fx
            .invoker
            .invoke(&trigger, calls.top_tool_calls().unwrap())
            .await
            .unwrap();

        assert_eq!(invocation.tool_call_id, "c1");
        let history = fx.store.snapshot(&trigger.channel).await;
        let tool_results = history
            .iter()
            .filter(|e| matches!(e, ConversationEntry::ToolResult { .. }))
            .count();
        assert_eq!(tool_results, 1);
        assert!(!history.iter().any(|e| e.requests_tool_call("c2")));
    }

    #[tokio::test]
    async fn test_several_responses_delivered_unchanged() {
        let chatty = FnCommand::new("chatty", "Says two things", |ctx, _args| {
            Box::pin(async move {
                ctx.respond_text("first");
                ctx.respond(Response::default());
                ctx.respond_text("second");
                Ok(())
            })
        });
        let fx = EngineFixture::new(
            ScriptedService::new([Ok(completion(&["summary"]))]),
            vec![CommandNode::leaf(chatty)],
        );
        let trigger = fx.record_user("talk").await;

        let invocation = fx
            .invoker
            .invoke(&trigger, &[tool_call("c1", "chatty", "")])
            .await
            .unwrap();

        assert_eq!(fx.transport.texts(), vec!["first", "second"]);
        assert_eq!(invocation.delivered_chunks, 2);
    }

    #[tokio::test]
    async fn test_final_completion_failure_still_delivers() {
        let fx = add_fixture(ScriptedService::new([Err(InferenceError::Timeout {
            duration_secs: 60,
        })]));
        let trigger = fx.record_user("add 1 and 1").await;

        let invocation = fx
            .invoker
            .invoke(&trigger, &[tool_call("c1", "add", r#"{"a":1,"b":1}"#)])
            .await
            .unwrap();

        assert!(invocation.succeeded);
        assert_eq!(fx.transport.texts(), vec!["2"]);
        assert_eq!(fx.store.len(&trigger.channel).await, 3);
    }

    #[tokio::test]
    async fn test_no_calls_is_none() {
        let fx = add_fixture(ScriptedService::new([]));
        let trigger = fx.record_user("x").await;
        assert!(fx.invoker.invoke(&trigger, &[]).await.is_none());
    }
}
