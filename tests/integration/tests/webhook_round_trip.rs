//! End-to-end webhook round trips against mocked Slack and backend
//! services, using the real HTTP backend client.

use std::sync::Arc;
use std::time::Duration;

use ferry_backend::HttpChatBackend;
use ferry_webhook::webhook_runtime::{
    build_webhook_router, WebhookRuntimeConfig, WebhookRuntimeState, SLACK_EVENTS_ENDPOINT,
};
use httpmock::prelude::*;
use serde_json::{json, Value};

fn round_trip_config(slack_base: &str, backend_base: &str) -> WebhookRuntimeConfig {
    let backend = HttpChatBackend::new(
        backend_base.to_string(),
        "backend-key".to_string(),
        "app-1".to_string(),
        3_000,
    )
    .expect("backend client");
    WebhookRuntimeConfig {
        backend: Arc::new(backend),
        slack_api_base: slack_base.to_string(),
        slack_bot_token: "xoxb-test".to_string(),
        request_timeout_ms: 3_000,
        retry_max_attempts: 1,
        retry_base_delay_ms: 5,
        allow_retry: false,
        enable_thread_reply: false,
        enable_file_attachments: false,
        target_reactions: Vec::new(),
    }
}

async fn spawn_webhook(
    config: WebhookRuntimeConfig,
) -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    let state = Arc::new(WebhookRuntimeState::new(config).expect("runtime state"));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener addr");
    let app = build_webhook_router(state);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, handle)
}

#[tokio::test]
async fn integration_mention_round_trip_posts_backend_answer() {
    let slack = MockServer::start();
    let backend_server = MockServer::start();

    let chat = backend_server.mock(|when, then| {
        when.method(POST)
            .path("/chat-messages")
            .header("authorization", "Bearer backend-key")
            .json_body_includes(
                r#"{"app_id": "app-1", "query": "ship it?", "response_mode": "blocking"}"#,
            );
        then.status(200).json_body(json!({"answer": "yes, ship it"}));
    });
    let post = slack.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .json_body_includes(r#"{"channel": "C7", "text": "yes, ship it"}"#);
        then.status(200)
            .json_body(json!({"ok": true, "channel": "C7", "ts": "55.1"}));
    });

    let (addr, handle) =
        spawn_webhook(round_trip_config(&slack.base_url(), &backend_server.base_url())).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}{SLACK_EVENTS_ENDPOINT}"))
        .json(&json!({
            "type": "event_callback",
            "event": {
                "type": "app_mention",
                "text": "<@UBOT> ship it?",
                "channel": "C7",
                "ts": "55.0"
            }
        }))
        .send()
        .await
        .expect("webhook request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("response body");
    assert_eq!(body["ok"], true);
    assert_eq!(body["ts"], "55.1");
    assert_eq!(chat.calls(), 1);
    assert_eq!(post.calls(), 1);

    handle.abort();
}

#[tokio::test]
async fn integration_backend_outage_still_acknowledges_delivery() {
    let slack = MockServer::start();
    let backend_server = MockServer::start();

    backend_server.mock(|when, then| {
        when.method(POST).path("/chat-messages");
        then.status(502).body("bad gateway");
    });
    let post = slack.mock(|when, then| {
        when.method(POST).path("/chat.postMessage");
        then.status(200).json_body(json!({"ok": true}));
    });

    let (addr, handle) =
        spawn_webhook(round_trip_config(&slack.base_url(), &backend_server.base_url())).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}{SLACK_EVENTS_ENDPOINT}"))
        .json(&json!({
            "type": "event_callback",
            "event": {
                "type": "app_mention",
                "text": "<@UBOT> anyone there?",
                "channel": "C7",
                "ts": "56.0"
            }
        }))
        .send()
        .await
        .expect("webhook request");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("response body"), "ok");
    assert_eq!(post.calls(), 0);

    handle.abort();
}
