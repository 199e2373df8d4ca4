//! Query extraction from mention events and resolved reaction targets.

use serde_json::Value;

use crate::event_classifier::{FileRef, MentionEvent, ResolvedMessage};

const MENTION_MARKER_PREFIX: &str = "<@";
const MENTION_DELIMITER: &str = "> ";

/// Plain-text query plus the rich-text anchor the answer will be spliced
/// into.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedQuery {
    pub query: String,
    pub anchor_block: Option<Value>,
    pub files: Vec<FileRef>,
}

/// Derives the query from a mention event. Returns `None` when the text
/// does not start with a mention marker: the bot was referenced somewhere
/// in the body rather than directly addressed, and those messages are not
/// queries. The marker is stripped through the first `"> "`; a marker
/// without that delimiter passes the text through unchanged.
pub fn extract_mention_query(event: &MentionEvent, include_files: bool) -> Option<ExtractedQuery> {
    if !event.text.starts_with(MENTION_MARKER_PREFIX) {
        return None;
    }
    let query = match event.text.split_once(MENTION_DELIMITER) {
        Some((_, rest)) => rest.to_string(),
        None => event.text.clone(),
    };
    Some(ExtractedQuery {
        query,
        anchor_block: event.blocks.first().cloned(),
        files: if include_files {
            event.files.clone()
        } else {
            Vec::new()
        },
    })
}

/// Derives the query from a message recovered for a reaction. The full
/// message text is the query; its first block anchors the reply.
pub fn extract_reaction_query(message: &ResolvedMessage, include_files: bool) -> ExtractedQuery {
    ExtractedQuery {
        query: message.text.clone(),
        anchor_block: message.blocks.first().cloned(),
        files: if include_files {
            message.files.clone()
        } else {
            Vec::new()
        },
    }
}
