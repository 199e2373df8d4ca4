//! Ferry webhook service: bridges Slack event deliveries to a
//! chat-completion backend and relays the answers back into the
//! originating conversation.

mod file_bridge;
pub mod webhook_runtime;
