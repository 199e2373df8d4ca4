//! Webhook runtime: one sequential pipeline per delivery.
//!
//! classify → resolve → extract → bridge files → invoke backend → compose
//! → post. Every path answers HTTP 200; the platform treats anything else
//! as a delivery failure and re-sends the event.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use ferry_backend::{ChatBackend, ChatInvocation};
use ferry_events::{
    classify_delivery, compose_reply, extract_mention_query, extract_reaction_query,
    reaction_allowed, retry_disposition, EventDisposition, ExtractedQuery, MentionEvent,
    QueryContext, ReactionEvent, RetryDisposition, SourceEventKind, SpliceOutcome,
};
use ferry_slack::{resolve_source_message, SlackApiClient};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::file_bridge::bridge_attachments;

pub const SLACK_EVENTS_ENDPOINT: &str = "/slack/events";

const RETRY_NUM_HEADER: &str = "x-slack-retry-num";
const RETRY_REASON_HEADER: &str = "x-slack-retry-reason";

#[derive(Clone)]
/// Runtime configuration for the webhook pipeline.
pub struct WebhookRuntimeConfig {
    pub backend: Arc<dyn ChatBackend>,
    pub slack_api_base: String,
    pub slack_bot_token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub allow_retry: bool,
    pub enable_thread_reply: bool,
    pub enable_file_attachments: bool,
    pub target_reactions: Vec<String>,
}

pub struct WebhookRuntimeState {
    config: WebhookRuntimeConfig,
    slack_client: SlackApiClient,
}

impl WebhookRuntimeState {
    pub fn new(config: WebhookRuntimeConfig) -> Result<Self> {
        let slack_client = SlackApiClient::new(
            config.slack_api_base.clone(),
            config.slack_bot_token.clone(),
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;
        Ok(Self {
            config,
            slack_client,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DeliveryResponse {
    /// Plain acknowledgment; also the terminal state for every error path.
    Ack,
    /// URL-verification challenge echo.
    Challenge(String),
    /// The raw post result of a successfully relayed answer.
    Posted(Value),
}

impl IntoResponse for DeliveryResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ack => (StatusCode::OK, "ok").into_response(),
            Self::Challenge(token) => (
                StatusCode::OK,
                Json(serde_json::json!({"challenge": token})),
            )
                .into_response(),
            Self::Posted(result) => (StatusCode::OK, Json(result)).into_response(),
        }
    }
}

/// Runs the webhook server until ctrl-c.
pub async fn run_webhook_server(bind: &str, config: WebhookRuntimeConfig) -> Result<()> {
    let bind_addr = bind
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("invalid --bind '{bind}'"))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind webhook server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound webhook server address")?;
    tracing::info!(addr = %local_addr, endpoint = SLACK_EVENTS_ENDPOINT, "webhook server listening");

    let state = Arc::new(WebhookRuntimeState::new(config)?);
    let app = build_webhook_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("webhook server exited unexpectedly")
}

pub fn build_webhook_router(state: Arc<WebhookRuntimeState>) -> Router {
    Router::new()
        .route(SLACK_EVENTS_ENDPOINT, post(handle_slack_events))
        .with_state(state)
}

async fn handle_slack_events(
    State(state): State<Arc<WebhookRuntimeState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let retry_number = header_value(&headers, RETRY_NUM_HEADER);
    let retry_reason = header_value(&headers, RETRY_REASON_HEADER);
    process_delivery(
        &state,
        retry_number.as_deref(),
        retry_reason.as_deref(),
        &body,
    )
    .await
    .into_response()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn process_delivery(
    state: &WebhookRuntimeState,
    retry_number: Option<&str>,
    retry_reason: Option<&str>,
    raw_body: &str,
) -> DeliveryResponse {
    if retry_disposition(state.config.allow_retry, retry_number, retry_reason)
        == RetryDisposition::Skip
    {
        tracing::debug!("acknowledged retried delivery without processing");
        return DeliveryResponse::Ack;
    }

    let body = match serde_json::from_str::<Value>(raw_body) {
        Ok(body) => body,
        Err(error) => {
            tracing::warn!(%error, "acknowledged unparseable delivery body");
            return DeliveryResponse::Ack;
        }
    };

    match classify_delivery(&body) {
        EventDisposition::Challenge(token) => DeliveryResponse::Challenge(token),
        EventDisposition::Mention(event) => match handle_mention(state, event).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!("mention processing failed: {error:#}");
                DeliveryResponse::Ack
            }
        },
        EventDisposition::Reaction(event) => match handle_reaction(state, event).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!("reaction processing failed: {error:#}");
                DeliveryResponse::Ack
            }
        },
        EventDisposition::Ignore { reason } => {
            tracing::debug!(reason_code = reason.as_str(), "ignored delivery");
            DeliveryResponse::Ack
        }
    }
}

async fn handle_mention(
    state: &WebhookRuntimeState,
    event: MentionEvent,
) -> Result<DeliveryResponse> {
    let Some(extracted) = extract_mention_query(&event, state.config.enable_file_attachments)
    else {
        tracing::debug!(channel = %event.channel, "mention without direct address ignored");
        return Ok(DeliveryResponse::Ack);
    };
    let thread_ts = state
        .config
        .enable_thread_reply
        .then(|| event.ts.clone())
        .filter(|ts| !ts.is_empty());
    let context = QueryContext {
        channel: event.channel.clone(),
        message_ts: event.ts.clone(),
        kind: SourceEventKind::Mention,
        reaction: None,
    };
    answer_and_post(state, extracted, context, &event.channel, thread_ts).await
}

async fn handle_reaction(
    state: &WebhookRuntimeState,
    event: ReactionEvent,
) -> Result<DeliveryResponse> {
    if !reaction_allowed(&state.config.target_reactions, &event.reaction) {
        tracing::debug!(reaction = %event.reaction, "reaction outside allow-list ignored");
        return Ok(DeliveryResponse::Ack);
    }
    let Some(message) =
        resolve_source_message(&state.slack_client, &event.channel, &event.message_ts).await?
    else {
        tracing::info!(
            channel = %event.channel,
            message_ts = %event.message_ts,
            "reaction target message not found"
        );
        return Ok(DeliveryResponse::Ack);
    };
    let extracted = extract_reaction_query(&message, state.config.enable_file_attachments);
    // Replies join the resolved thread root rather than forking a thread
    // off a threaded reply.
    let thread_ts = state
        .config
        .enable_thread_reply
        .then(|| {
            message
                .thread_ts
                .clone()
                .unwrap_or_else(|| event.message_ts.clone())
        })
        .filter(|ts| !ts.is_empty());
    let context = QueryContext {
        channel: event.channel.clone(),
        message_ts: event.message_ts.clone(),
        kind: SourceEventKind::Reaction,
        reaction: Some(event.reaction.clone()),
    };
    answer_and_post(state, extracted, context, &event.channel, thread_ts).await
}

async fn answer_and_post(
    state: &WebhookRuntimeState,
    extracted: ExtractedQuery,
    context: QueryContext,
    channel: &str,
    thread_ts: Option<String>,
) -> Result<DeliveryResponse> {
    let uploaded =
        bridge_attachments(&state.slack_client, state.config.backend.as_ref(), &extracted.files)
            .await;

    let mut query = extracted.query;
    if !uploaded.is_empty() {
        let names = uploaded
            .iter()
            .map(|file| file.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        query.push_str("\n\nAttached files: ");
        query.push_str(&names);
    }

    let mut inputs = context.to_inputs();
    if !uploaded.is_empty() {
        inputs.insert(
            "files".to_string(),
            serde_json::to_value(&uploaded).context("failed to encode uploaded file handles")?,
        );
    }

    let had_anchor = extracted.anchor_block.is_some();
    let answer = state
        .config
        .backend
        .invoke(ChatInvocation { query, inputs })
        .await
        .context("backend chat invocation failed")?;

    let composed = compose_reply(channel, &answer.answer, extracted.anchor_block, thread_ts);
    if had_anchor && composed.splice == SpliceOutcome::NoAnchor {
        tracing::warn!(channel = %channel, "anchor block shape unrecognized, replying with plain text");
    }

    let result = state
        .slack_client
        .post_message(&composed.reply)
        .await
        .context("failed to post reply message")?;
    Ok(DeliveryResponse::Posted(result))
}
