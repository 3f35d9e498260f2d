//! Relays long answers as a sequence of size-limited chat messages.

use anyhow::{Context, Result};
use teloxide::types::ChatId;
use tracing::{debug, error};

use crate::bot::transport::ChatTransport;

/// Split `text` into consecutive slices of at most `limit` characters
///
/// Slices break on character boundaries, never inside a UTF-8 sequence.
/// An empty input yields no slices.
pub fn split_message(text: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut slices = Vec::with_capacity(text.len() / limit + 1);
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == limit {
            slices.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        slices.push(&text[start..]);
    }
    slices
}

/// Send every slice of `answer` in order
///
/// Whitespace-only slices are skipped, Telegram rejects blank messages.
/// Stops at the first failed send; later slices are not attempted.
/// Returns the number of messages sent.
pub async fn relay_answer(
    transport: &dyn ChatTransport,
    chat_id: ChatId,
    answer: &str,
    limit: usize,
) -> Result<usize> {
    let slices: Vec<&str> = split_message(answer, limit)
        .into_iter()
        .filter(|slice| !slice.trim().is_empty())
        .collect();
    let total = slices.len();

    for (index, slice) in slices.into_iter().enumerate() {
        if let Err(e) = transport.send_text(chat_id, slice).await {
            error!(
                chat_id = %chat_id,
                slice = index + 1,
                total,
                error = %e,
                "Failed to relay answer slice, dropping the rest"
            );
            return Err(e).with_context(|| format!("relay aborted at slice {} of {total}", index + 1));
        }
    }

    debug!(chat_id = %chat_id, messages = total, "Answer relayed");
    Ok(total)
}
