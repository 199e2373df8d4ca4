//! Event-normalization core for the Ferry webhook adapter.
//!
//! Everything in this crate is pure data transformation: retried-delivery
//! filtering, inbound envelope classification, query extraction, and the
//! rich-text splice that carries an answer back into the source message
//! shape. Network collaborators live in the sibling crates.

pub mod event_classifier;
pub mod query_context;
pub mod query_extractor;
pub mod reply_blocks;
pub mod retry_filter;

pub use event_classifier::{
    classify_delivery, parse_reaction_allow_list, reaction_allowed, EventDisposition, FileRef,
    IgnoreReason, MentionEvent, ReactionEvent, ResolvedMessage,
};
pub use query_context::{QueryContext, SourceEventKind};
pub use query_extractor::{extract_mention_query, extract_reaction_query, ExtractedQuery};
pub use reply_blocks::{compose_reply, splice_answer, ComposedReply, OutboundReply, SpliceOutcome};
pub use retry_filter::{retry_disposition, RetryDisposition};
