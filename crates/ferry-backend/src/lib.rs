//! Chat-completion backend collaborator for the Ferry webhook adapter.
//!
//! The pipeline talks to the backend through the [`ChatBackend`] trait:
//! one blocking chat invocation plus a byte upload that re-hosts message
//! attachments on the backend side. [`HttpChatBackend`] is the production
//! implementation; tests substitute in-process doubles.

mod http_backend;

pub use http_backend::HttpChatBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Errors surfaced by backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("missing backend application id")]
    MissingAppId,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

/// One blocking chat-completion request. `inputs` carries the opaque
/// auxiliary context the pipeline folds in alongside the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatInvocation {
    pub query: String,
    pub inputs: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAnswer {
    pub answer: String,
}

/// Backend-side handle for a re-hosted attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
}

#[async_trait]
/// Trait contract for the conversational backend.
pub trait ChatBackend: Send + Sync {
    async fn invoke(&self, invocation: ChatInvocation) -> Result<ChatAnswer, BackendError>;

    async fn upload_file(
        &self,
        filename: &str,
        mimetype: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, BackendError>;
}
