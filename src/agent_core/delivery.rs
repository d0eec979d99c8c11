//! Chunked delivery of replies that exceed the platform message limit.

use super::errors::AgentError;
use super::host::Transport;
use super::types::ConversationKey;

/// Split `text` into ordered pieces of at most `limit` characters.
///
/// Splits on character boundaries, not bytes; concatenating the pieces gives
/// back `text`. Empty input yields no pieces.
pub fn split_reply(text: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == limit {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

/// Deliver `text` as consecutive chunks. Stops at the first failure.
///
/// Returns the number of chunks delivered.
pub async fn deliver_chunked(
    transport: &dyn Transport,
    channel: &ConversationKey,
    text: &str,
    limit: usize,
) -> Result<usize, AgentError> {
    let chunks = split_reply(text, limit);
    for chunk in &chunks {
        transport.deliver(channel, chunk).await?;
    }
    Ok(chunks.len())
}
