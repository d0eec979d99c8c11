//! Interactive console host for the chat engine.
//!
//! Every stdin line is a direct message from the local user in the `console`
//! channel. `/reload` rebuilds the tool catalog, `/quit` exits.

use std::sync::{Arc, Mutex, PoisonError};

use alfred_chat::agent_core::{AgentError, ConversationKey};
use alfred_chat::logging::{init_tracing, LogOptions};
use alfred_chat::tools::{required_arg, OptionSpec, ParamType, ToolError};
use alfred_chat::{
    Author, CommandNode, CommandRegistry, FnCommand, InboundMessage, InferenceClient,
    Orchestrator, StaticIdentity, Transport,
};
use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

const BOT_ID: &str = "alfred";
const CHANNEL: &str = "console";

struct StdoutTransport {
    bot_name: String,
}

#[async_trait]
impl Transport for StdoutTransport {
    async fn deliver(&self, _channel: &ConversationKey, text: &str) -> Result<(), AgentError> {
        println!("{}: {text}", self.bot_name);
        Ok(())
    }
}

/// Demo commands: arithmetic, echo, and an in-memory notes group.
struct DemoCommands {
    notes: Arc<Mutex<Vec<String>>>,
}

impl CommandRegistry for DemoCommands {
    fn commands(&self) -> Vec<CommandNode> {
        let add = FnCommand::new("add", "Add two integers", |ctx, args| {
            Box::pin(async move {
                let a: i64 = required_arg(&args, "a")?;
                let b: i64 = required_arg(&args, "b")?;
                let sum = a
                    .checked_add(b)
                    .ok_or_else(|| ToolError::failed("integer overflow"))?;
                ctx.respond_text(sum.to_string());
                Ok(())
            })
        })
        .param(OptionSpec::new("a", ParamType::Integer).required())
        .param(OptionSpec::new("b", ParamType::Integer).required());

        let echo = FnCommand::new("echo", "Repeat a message back", |ctx, args| {
            Box::pin(async move {
                let text: String = required_arg(&args, "text")?;
                ctx.respond_text(text);
                Ok(())
            })
        })
        .param(OptionSpec::new("text", ParamType::String).required());

        let notes = Arc::clone(&self.notes);
        let take_note = FnCommand::new("add", "Remember a note", move |ctx, args| {
            let notes = Arc::clone(&notes);
            Box::pin(async move {
                let note: String = required_arg(&args, "note")?;
                notes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(note);
                ctx.respond_text("Noted.");
                Ok(())
            })
        })
        .param(
            OptionSpec::new("note", ParamType::String)
                .required()
                .describe("The note to remember"),
        );

        let notes = Arc::clone(&self.notes);
        let list_notes = FnCommand::new("list", "List remembered notes", move |ctx, _args| {
            let notes = Arc::clone(&notes);
            Box::pin(async move {
                let notes = notes.lock().unwrap_or_else(PoisonError::into_inner).clone();
                if notes.is_empty() {
                    ctx.respond_text("No notes yet.");
                } else {
                    ctx.respond_text(notes.join("\n"));
                }
                Ok(())
            })
        });

        vec![
            CommandNode::leaf(add),
            CommandNode::leaf(echo),
            CommandNode::group(
                "notes",
                vec![CommandNode::leaf(take_note), CommandNode::leaf(list_notes)],
            ),
        ]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_options = LogOptions {
        dir: std::env::var_os("ALFRED_CHAT_LOG_DIR").map(Into::into),
        json: std::env::var("ALFRED_CHAT_LOG_JSON").is_ok_and(|v| v == "1"),
    };
    init_tracing(&log_options).context("failed to initialise logging")?;

    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let config = alfred_chat::inference::config::load_or_default(&cwd)?;
    let client = InferenceClient::from_config(&config)?;

    let bot_name = std::env::var("BOT_NAME").unwrap_or_else(|_| "Alfred".to_string());
    let identity = StaticIdentity::new(
        bot_name.as_str(),
        format!("You are {bot_name}, a courteous butler. Keep answers brief."),
    );
    let registry = DemoCommands {
        notes: Arc::new(Mutex::new(Vec::new())),
    };

    let orchestrator = Orchestrator::new(
        &config,
        BOT_ID,
        Arc::new(client),
        Arc::new(identity),
        Arc::new(StdoutTransport {
            bot_name: bot_name.clone(),
        }),
        &registry,
    );

    let user_name = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
    let author = Author::new("console-user", user_name);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/reload" => {
                let count = orchestrator.rebuild_tools(&registry);
                println!("({count} tools loaded)");
                continue;
            }
            _ => {}
        }

        let message =
            InboundMessage::new(uuid::Uuid::new_v4().to_string(), CHANNEL, author.clone(), line)
                .direct();
        let outcome = orchestrator.handle(message).await;
        tracing::debug!(?outcome, "console message handled");
    }

    Ok(())
}
