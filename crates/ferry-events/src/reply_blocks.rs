//! Answer splicing into the anchor block and outbound reply composition.
//!
//! The anchor is whatever the source message offered as its first rich-text
//! block. Only two shapes are recognized; every splice checks the shape
//! before mutating so an unexpected block degrades to the plain-text
//! fallback instead of failing the reply.

use serde_json::{json, Value};

/// How the answer was carried into the reply blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceOutcome {
    /// The anchor block had a direct `text` object; its `text.text` now
    /// holds the answer.
    DirectText,
    /// The anchor block had the nested inline-element container; a new
    /// text element carrying the answer was appended after the existing
    /// elements.
    AppendedInline,
    /// No anchor, or an unrecognized shape. Blocks are left untouched and
    /// the plain `text` field carries the answer alone.
    NoAnchor,
}

/// Outbound post payload. `thread_ts` is present only when thread-reply
/// mode is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundReply {
    pub channel: String,
    pub text: String,
    pub blocks: Vec<Value>,
    pub thread_ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedReply {
    pub reply: OutboundReply,
    pub splice: SpliceOutcome,
}

fn has_direct_text_slot(block: &Value) -> bool {
    block
        .get("text")
        .map(Value::is_object)
        .unwrap_or(false)
}

fn inline_container(block: &mut Value) -> Option<&mut Vec<Value>> {
    block
        .get_mut("elements")?
        .get_mut(0)?
        .get_mut("elements")?
        .as_array_mut()
}

/// Splices `answer` into the first block. The shape is recognized before
/// any mutation; unrecognized shapes report `NoAnchor` and leave the
/// blocks exactly as given.
pub fn splice_answer(blocks: &mut [Value], answer: &str) -> SpliceOutcome {
    let Some(block) = blocks.first_mut() else {
        return SpliceOutcome::NoAnchor;
    };
    if has_direct_text_slot(block) {
        block["text"]["text"] = Value::String(answer.to_string());
        return SpliceOutcome::DirectText;
    }
    if let Some(elements) = inline_container(block) {
        elements.push(json!({"type": "text", "text": answer}));
        return SpliceOutcome::AppendedInline;
    }
    SpliceOutcome::NoAnchor
}

/// Builds the outbound post payload. The plain `text` field always carries
/// the answer so clients without rich-text support render it regardless of
/// the splice outcome.
pub fn compose_reply(
    channel: &str,
    answer: &str,
    anchor_block: Option<Value>,
    thread_ts: Option<String>,
) -> ComposedReply {
    let mut blocks = anchor_block.map(|block| vec![block]).unwrap_or_default();
    let splice = splice_answer(&mut blocks, answer);
    if splice == SpliceOutcome::NoAnchor {
        blocks.clear();
    }
    ComposedReply {
        reply: OutboundReply {
            channel: channel.to_string(),
            text: answer.to_string(),
            blocks,
            thread_ts,
        },
        splice,
    }
}
