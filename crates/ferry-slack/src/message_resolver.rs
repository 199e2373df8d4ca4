//! Recovers the full message behind a reaction event.
//!
//! Reaction events carry only a channel and timestamp. The history and
//! replies APIs are not interchangeable: a root message is only visible to
//! `conversations.history`, a threaded reply only to
//! `conversations.replies`. The permalink for the target encodes thread
//! membership in its query string, so one permalink fetch decides which
//! lookup recovers the message.

use anyhow::{Context, Result};
use ferry_events::ResolvedMessage;
use serde_json::Value;

use crate::slack_api_client::SlackApiClient;

/// Extracts the `thread_ts` query parameter from a message permalink.
/// Permalink timestamps are plain `seconds.micros` strings and never
/// percent-encoded.
pub fn permalink_thread_ts(permalink: &str) -> Option<String> {
    let (_, query) = permalink.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "thread_ts" && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn resolved_message_from_raw(raw: Value) -> ResolvedMessage {
    serde_json::from_value(raw).unwrap_or_default()
}

/// Locates the message a reaction targets. Routes through the history
/// lookup when the target is a thread root (no `thread_ts` in the
/// permalink, or one equal to the target timestamp) and through the
/// replies lookup otherwise. Returns `None` when the lookup window is
/// empty, which happens when the message was deleted or is not visible
/// to the bot.
pub async fn resolve_source_message(
    client: &SlackApiClient,
    channel: &str,
    message_ts: &str,
) -> Result<Option<ResolvedMessage>> {
    let permalink = client
        .fetch_permalink(channel, message_ts)
        .await
        .context("failed to fetch permalink for reaction target")?;

    let raw = match permalink_thread_ts(&permalink) {
        Some(thread_ts) if thread_ts != message_ts => client
            .fetch_reply_message(channel, message_ts)
            .await
            .context("failed to fetch threaded reply for reaction target")?,
        _ => client
            .fetch_history_message(channel, message_ts)
            .await
            .context("failed to fetch root message for reaction target")?,
    };

    Ok(raw.map(resolved_message_from_raw))
}
