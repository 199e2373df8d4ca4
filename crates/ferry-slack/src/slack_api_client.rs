//! Slack Web API operations consumed by the webhook pipeline.

use anyhow::{anyhow, bail, Context, Result};
use ferry_events::OutboundReply;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::slack_helpers::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};

#[derive(Debug, Clone, Deserialize)]
struct SlackPermalinkResponse {
    ok: bool,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackMessagesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackFileInfoResponse {
    ok: bool,
    #[serde(default)]
    file: Option<SlackFileInfo>,
    #[serde(default)]
    error: Option<String>,
}

/// Platform-side metadata for one attachment.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackFileInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub url_private: Option<String>,
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl SlackApiClient {
    pub fn new(
        api_base: String,
        bot_token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("ferry-webhook"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    /// Fetches the permalink for a message. The permalink's query string
    /// encodes thread membership, which the resolver needs to pick the
    /// right lookup API.
    pub async fn fetch_permalink(&self, channel: &str, message_ts: &str) -> Result<String> {
        let response: SlackPermalinkResponse = self
            .call_json("conversations.getPermalink", || {
                self.http
                    .get(format!("{}/conversations.getPermalink", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&[("channel", channel), ("message_ts", message_ts)])
            })
            .await?;
        if !response.ok {
            bail!(
                "slack conversations.getPermalink failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        response
            .permalink
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack conversations.getPermalink did not return permalink"))
    }

    /// Single-message history lookup anchored at `message_ts` (inclusive).
    /// Returns the raw message, or `None` when the window is empty.
    pub async fn fetch_history_message(
        &self,
        channel: &str,
        message_ts: &str,
    ) -> Result<Option<Value>> {
        let response: SlackMessagesResponse = self
            .call_json("conversations.history", || {
                self.http
                    .get(format!("{}/conversations.history", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&[
                        ("channel", channel),
                        ("latest", message_ts),
                        ("limit", "1"),
                        ("inclusive", "true"),
                    ])
            })
            .await?;
        if !response.ok {
            bail!(
                "slack conversations.history failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(response.messages.into_iter().next())
    }

    /// Single-message thread lookup anchored at `message_ts` (inclusive).
    pub async fn fetch_reply_message(
        &self,
        channel: &str,
        message_ts: &str,
    ) -> Result<Option<Value>> {
        let response: SlackMessagesResponse = self
            .call_json("conversations.replies", || {
                self.http
                    .get(format!("{}/conversations.replies", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&[
                        ("channel", channel),
                        ("ts", message_ts),
                        ("latest", message_ts),
                        ("limit", "1"),
                        ("inclusive", "true"),
                    ])
            })
            .await?;
        if !response.ok {
            bail!(
                "slack conversations.replies failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(response.messages.into_iter().next())
    }

    pub async fn fetch_file_info(&self, file_id: &str) -> Result<SlackFileInfo> {
        let response: SlackFileInfoResponse = self
            .call_json("files.info", || {
                self.http
                    .get(format!("{}/files.info", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&[("file", file_id)])
            })
            .await?;
        if !response.ok {
            bail!(
                "slack files.info failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        response
            .file
            .ok_or_else(|| anyhow!("slack files.info response missing file"))
    }

    /// Downloads attachment bytes from a private URL using the bot
    /// credential.
    pub async fn download_file(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .request_with_retry("file download", || {
                self.http.get(url).bearer_auth(&self.bot_token)
            })
            .await?;
        Ok(response
            .bytes()
            .await
            .context("failed to read slack file download body")?
            .to_vec())
    }

    /// Posts the composed reply. Returns the raw post result so the
    /// webhook response can pass it through verbatim.
    pub async fn post_message(&self, reply: &OutboundReply) -> Result<Value> {
        let mut payload = json!({
            "channel": reply.channel,
            "text": reply.text,
            "blocks": reply.blocks,
        });
        if let Some(thread_ts) = &reply.thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.clone());
        }

        let result: Value = self
            .call_json("chat.postMessage", || {
                self.http
                    .post(format!("{}/chat.postMessage", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;
        if !result.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            bail!(
                "slack chat.postMessage failed: {}",
                result
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
            );
        }
        Ok(result)
    }

    async fn call_json<T, F>(&self, operation: &str, builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let response = self.request_with_retry(operation, builder).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode slack {operation} response"))
    }

    async fn request_with_retry<F>(
        &self,
        operation: &str,
        mut builder: F,
    ) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let request = builder().header(
                "x-ferry-retry-attempt",
                attempt.saturating_sub(1).to_string(),
            );
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let retry_after = parse_retry_after(response.headers());
                    if attempt < self.retry_max_attempts && is_retryable_status(status.as_u16()) {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    bail!(
                        "slack api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("slack api {operation} request failed"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ferry_events::OutboundReply;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::SlackApiClient;

    fn test_client(base_url: &str) -> SlackApiClient {
        SlackApiClient::new(base_url.to_string(), "xoxb-test".to_string(), 3_000, 1, 5)
            .expect("slack client")
    }

    #[tokio::test]
    async fn functional_post_message_sends_payload_and_returns_result() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .header("authorization", "Bearer xoxb-test")
                .json_body_includes(
                    r#"{"channel": "C1", "text": "the answer", "thread_ts": "100.1"}"#,
                );
            then.status(200)
                .json_body(json!({"ok": true, "ts": "101.2", "channel": "C1"}));
        });

        let client = test_client(&server.base_url());
        let result = client
            .post_message(&OutboundReply {
                channel: "C1".to_string(),
                text: "the answer".to_string(),
                blocks: Vec::new(),
                thread_ts: Some("100.1".to_string()),
            })
            .await
            .expect("post message");
        assert_eq!(post.calls(), 1);
        assert_eq!(result["ok"], true);
        assert_eq!(result["ts"], "101.2");
    }

    #[tokio::test]
    async fn regression_post_message_surfaces_api_error_field() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat.postMessage");
            then.status(200)
                .json_body(json!({"ok": false, "error": "channel_not_found"}));
        });

        let client = test_client(&server.base_url());
        let error = client
            .post_message(&OutboundReply {
                channel: "C404".to_string(),
                text: "answer".to_string(),
                blocks: Vec::new(),
                thread_ts: None,
            })
            .await
            .expect_err("post should fail");
        assert!(error.to_string().contains("channel_not_found"));
    }

    #[tokio::test]
    async fn integration_request_retries_rate_limited_calls() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .header("x-ferry-retry-attempt", "0");
            then.status(429).header("retry-after", "0").body("rate limit");
        });
        let second = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .header("x-ferry-retry-attempt", "1");
            then.status(200).json_body(json!({"ok": true, "ts": "1.2"}));
        });

        let client =
            SlackApiClient::new(server.base_url(), "xoxb-test".to_string(), 2_000, 3, 1)
                .expect("slack client");
        let result = client
            .post_message(&OutboundReply {
                channel: "C1".to_string(),
                text: "hello".to_string(),
                blocks: Vec::new(),
                thread_ts: None,
            })
            .await
            .expect("post eventually succeeds");
        assert_eq!(result["ts"], "1.2");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn functional_fetch_history_message_returns_first_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/conversations.history")
                .query_param("channel", "C1")
                .query_param("latest", "100.1")
                .query_param("limit", "1")
                .query_param("inclusive", "true");
            then.status(200).json_body(json!({
                "ok": true,
                "messages": [{"text": "original", "ts": "100.1"}]
            }));
        });

        let client = test_client(&server.base_url());
        let message = client
            .fetch_history_message("C1", "100.1")
            .await
            .expect("history lookup")
            .expect("message present");
        assert_eq!(message["text"], "original");
    }

    #[tokio::test]
    async fn regression_fetch_history_message_maps_empty_window_to_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/conversations.history");
            then.status(200).json_body(json!({"ok": true, "messages": []}));
        });

        let client = test_client(&server.base_url());
        let message = client
            .fetch_history_message("C1", "100.1")
            .await
            .expect("history lookup");
        assert!(message.is_none());
    }

    #[tokio::test]
    async fn regression_download_file_fails_on_non_success_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/files/private/F1");
            then.status(404).body("not found");
        });

        let client = test_client(&server.base_url());
        let error = client
            .download_file(&server.url("/files/private/F1"))
            .await
            .expect_err("download should fail");
        assert!(error.to_string().contains("404"));
    }

    #[tokio::test]
    async fn functional_fetch_file_info_returns_metadata() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/files.info").query_param("file", "F1");
            then.status(200).json_body(json!({
                "ok": true,
                "file": {
                    "id": "F1",
                    "name": "report.txt",
                    "mimetype": "text/plain",
                    "url_private": "https://files.example.test/F1"
                }
            }));
        });

        let client = test_client(&server.base_url());
        let info = client.fetch_file_info("F1").await.expect("file info");
        assert_eq!(info.id, "F1");
        assert_eq!(info.name.as_deref(), Some("report.txt"));
        assert_eq!(
            info.url_private.as_deref(),
            Some("https://files.example.test/F1")
        );
    }
}
