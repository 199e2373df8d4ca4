//! Ferry webhook binary: bridges Slack event deliveries to a
//! chat-completion backend and posts the answers back.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ferry_backend::HttpChatBackend;
use ferry_events::parse_reaction_allow_list;
use ferry_webhook::webhook_runtime::{run_webhook_server, WebhookRuntimeConfig};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "ferry-webhook",
    about = "Slack events webhook adapter that relays mentions and reactions to a chat-completion backend"
)]
struct Cli {
    #[arg(
        long,
        env = "FERRY_BIND",
        default_value = "127.0.0.1:8787",
        help = "Webhook listen address"
    )]
    bind: String,

    #[arg(
        long,
        env = "FERRY_SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    slack_api_base: String,

    #[arg(
        long,
        env = "FERRY_SLACK_BOT_TOKEN",
        help = "Slack bot token used for API calls and attachment downloads"
    )]
    slack_bot_token: String,

    #[arg(
        long,
        env = "FERRY_BACKEND_API_BASE",
        help = "Chat-completion backend base URL"
    )]
    backend_api_base: String,

    #[arg(
        long,
        env = "FERRY_BACKEND_API_KEY",
        help = "Chat-completion backend API key"
    )]
    backend_api_key: String,

    #[arg(
        long,
        env = "FERRY_BACKEND_APP_ID",
        default_value = "",
        help = "Backend application id included in chat invocations"
    )]
    backend_app_id: String,

    #[arg(
        long,
        env = "FERRY_ALLOW_RETRY",
        help = "Process retried deliveries instead of acknowledging them unprocessed"
    )]
    allow_retry: bool,

    #[arg(
        long,
        env = "FERRY_ENABLE_THREAD_REPLY",
        help = "Post answers as thread replies instead of new root messages"
    )]
    enable_thread_reply: bool,

    #[arg(
        long,
        env = "FERRY_ENABLE_FILE_ATTACHMENTS",
        help = "Re-host message attachments on the backend as query context"
    )]
    enable_file_attachments: bool,

    #[arg(
        long,
        env = "FERRY_TARGET_REACTIONS",
        default_value = "",
        help = "Comma-separated reaction allow-list; empty admits every reaction"
    )]
    target_reactions: String,

    #[arg(
        long,
        env = "FERRY_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        help = "Outbound HTTP request timeout in milliseconds"
    )]
    request_timeout_ms: u64,

    #[arg(
        long,
        env = "FERRY_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        help = "Maximum attempts for retryable Slack API failures"
    )]
    retry_max_attempts: usize,

    #[arg(
        long,
        env = "FERRY_RETRY_BASE_DELAY_MS",
        default_value_t = 200,
        help = "Base delay for Slack API retry backoff in milliseconds"
    )]
    retry_base_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let backend = HttpChatBackend::new(
        cli.backend_api_base.clone(),
        cli.backend_api_key.clone(),
        cli.backend_app_id.clone(),
        cli.request_timeout_ms,
    )
    .context("failed to create backend client")?;

    let config = WebhookRuntimeConfig {
        backend: Arc::new(backend),
        slack_api_base: cli.slack_api_base,
        slack_bot_token: cli.slack_bot_token,
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
        allow_retry: cli.allow_retry,
        enable_thread_reply: cli.enable_thread_reply,
        enable_file_attachments: cli.enable_file_attachments,
        target_reactions: parse_reaction_allow_list(&cli.target_reactions),
    };

    run_webhook_server(&cli.bind, config).await
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
