//! Inbound delivery classification.
//!
//! Slack deliveries arrive as loosely-typed JSON envelopes. Classification
//! maps them onto the small set of shapes the pipeline acts on; everything
//! else becomes an acknowledged no-op with a reason code for diagnostics.
//! Absent fields default to empty values rather than failing; the
//! platform contract requires a success acknowledgment on every path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Why a delivery was acknowledged without processing.
pub enum IgnoreReason {
    MalformedEnvelope,
    UnsupportedCallback,
    MissingEvent,
    UnsupportedEvent,
    NonMessageItem,
    MissingItemTarget,
}

impl IgnoreReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedEnvelope => "malformed_envelope",
            Self::UnsupportedCallback => "unsupported_callback",
            Self::MissingEvent => "missing_event",
            Self::UnsupportedEvent => "unsupported_event",
            Self::NonMessageItem => "non_message_item",
            Self::MissingItemTarget => "missing_item_target",
        }
    }
}

/// Platform-side attachment reference carried by mention events and
/// resolved messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

/// Notification that the bot was referenced by name in a message.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionEvent {
    pub text: String,
    pub channel: String,
    pub ts: String,
    pub blocks: Vec<Value>,
    pub files: Vec<FileRef>,
}

/// Notification that an emoji reaction was added to an existing message.
/// Carries only the target coordinates; recovering the message itself is
/// the resolver's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub reaction: String,
    pub channel: String,
    pub message_ts: String,
}

/// A message recovered from the platform history for a reaction target.
/// `thread_ts` is present when the message is a threaded reply.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ResolvedMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub blocks: Vec<Value>,
    #[serde(default)]
    pub files: Vec<FileRef>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// Classification outcome for one inbound delivery.
pub enum EventDisposition {
    Challenge(String),
    Mention(MentionEvent),
    Reaction(ReactionEvent),
    Ignore { reason: IgnoreReason },
}

#[derive(Debug, Default, Deserialize)]
struct DeliveryEnvelope {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    event: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    blocks: Vec<Value>,
    #[serde(default)]
    files: Vec<FileRef>,
    #[serde(default)]
    reaction: Option<String>,
    #[serde(default)]
    item: Option<ReactionItemPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct ReactionItemPayload {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

fn ignore(reason: IgnoreReason) -> EventDisposition {
    EventDisposition::Ignore { reason }
}

/// Classifies a parsed delivery body.
pub fn classify_delivery(body: &Value) -> EventDisposition {
    let Ok(envelope) = serde_json::from_value::<DeliveryEnvelope>(body.clone()) else {
        return ignore(IgnoreReason::MalformedEnvelope);
    };
    match envelope.kind.as_str() {
        "url_verification" => EventDisposition::Challenge(envelope.challenge.unwrap_or_default()),
        "event_callback" => classify_callback_event(envelope.event),
        _ => ignore(IgnoreReason::UnsupportedCallback),
    }
}

fn classify_callback_event(event: Option<Value>) -> EventDisposition {
    let Some(raw_event) = event else {
        return ignore(IgnoreReason::MissingEvent);
    };
    let Ok(payload) = serde_json::from_value::<EventPayload>(raw_event) else {
        return ignore(IgnoreReason::MissingEvent);
    };
    match payload.kind.as_str() {
        "app_mention" => EventDisposition::Mention(MentionEvent {
            text: payload.text.unwrap_or_default(),
            channel: payload.channel.unwrap_or_default(),
            ts: payload.ts.unwrap_or_default(),
            blocks: payload.blocks,
            files: payload.files,
        }),
        "reaction_added" => classify_reaction(payload),
        _ => ignore(IgnoreReason::UnsupportedEvent),
    }
}

fn classify_reaction(payload: EventPayload) -> EventDisposition {
    let Some(item) = payload.item else {
        return ignore(IgnoreReason::MissingItemTarget);
    };
    if item.kind != "message" {
        return ignore(IgnoreReason::NonMessageItem);
    }
    let channel = item.channel.unwrap_or_default();
    let message_ts = item.ts.unwrap_or_default();
    if channel.is_empty() || message_ts.is_empty() {
        return ignore(IgnoreReason::MissingItemTarget);
    }
    EventDisposition::Reaction(ReactionEvent {
        reaction: payload.reaction.unwrap_or_default(),
        channel,
        message_ts,
    })
}

/// Checks a reaction name against the configured allow-list. An empty
/// list admits every reaction.
pub fn reaction_allowed(allow_list: &[String], reaction: &str) -> bool {
    allow_list.is_empty() || allow_list.iter().any(|allowed| allowed == reaction)
}

/// Parses the comma-separated reaction allow-list setting. Entries are
/// trimmed and empty entries dropped.
pub fn parse_reaction_allow_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
