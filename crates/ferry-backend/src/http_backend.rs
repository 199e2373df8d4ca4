//! HTTP implementation of the chat-completion backend.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{BackendError, ChatAnswer, ChatBackend, ChatInvocation, UploadedFile};

const RESPONSE_MODE_BLOCKING: &str = "blocking";

pub struct HttpChatBackend {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    app_id: String,
}

impl HttpChatBackend {
    pub fn new(
        api_base: String,
        api_key: String,
        app_id: String,
        request_timeout_ms: u64,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            app_id: app_id.trim().to_string(),
        })
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn invoke(&self, invocation: ChatInvocation) -> Result<ChatAnswer, BackendError> {
        // The application id is deliberately not validated at startup; a
        // missing value surfaces here, on the first real invocation.
        if self.app_id.is_empty() {
            return Err(BackendError::MissingAppId);
        }
        let payload = json!({
            "app_id": self.app_id,
            "query": invocation.query,
            "inputs": invocation.inputs,
            "response_mode": RESPONSE_MODE_BLOCKING,
        });
        let response = self
            .http
            .post(format!("{}/chat-messages", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        let answer = body
            .get("answer")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BackendError::InvalidResponse("chat response missing answer field".to_string())
            })?
            .to_string();
        Ok(ChatAnswer { answer })
    }

    async fn upload_file(
        &self,
        filename: &str,
        mimetype: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, BackendError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mimetype)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(format!("{}/files/upload", self.api_base))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BackendError::InvalidResponse("upload response missing id field".to_string())
            })?
            .to_string();
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(filename)
            .to_string();
        Ok(UploadedFile { id, name })
    }
}
