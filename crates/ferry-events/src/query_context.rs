//! Auxiliary context handed to the backend alongside the query.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEventKind {
    Mention,
    Reaction,
}

impl SourceEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mention => "mention",
            Self::Reaction => "reaction",
        }
    }
}

/// Where the query came from. The backend receives this as an opaque input
/// mapping; the pipeline never interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    pub channel: String,
    pub message_ts: String,
    pub kind: SourceEventKind,
    pub reaction: Option<String>,
}

impl QueryContext {
    /// Folds the context into backend input keys. The `reaction` key is
    /// present only for reaction-sourced queries.
    pub fn to_inputs(&self) -> Map<String, Value> {
        let mut inputs = Map::new();
        inputs.insert("channel".to_string(), Value::String(self.channel.clone()));
        inputs.insert(
            "message_ts".to_string(),
            Value::String(self.message_ts.clone()),
        );
        inputs.insert(
            "event_type".to_string(),
            Value::String(self.kind.as_str().to_string()),
        );
        if let Some(reaction) = &self.reaction {
            inputs.insert("reaction".to_string(), Value::String(reaction.clone()));
        }
        inputs
    }
}
