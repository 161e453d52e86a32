//! Downstream reply notification
//!
//! After a conversation commits, the reply is pushed to a downstream
//! consumer (the robot's speech process). Delivery is detached from the
//! request: it runs on its own task under a timeout and its outcome is only
//! logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use robo_types::Reply;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Receives committed replies
#[async_trait]
pub trait ReplyNotifier: Send + Sync {
    async fn notify(&self, reply: &Reply) -> Result<(), String>;
}

/// Notifier that drops every reply
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ReplyNotifier for NoopNotifier {
    async fn notify(&self, _reply: &Reply) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Serialize)]
struct NotifyPayload<'a> {
    message: &'a str,
    emotion: &'a str,
}

/// POSTs `{message, emotion}` JSON to a fixed URL
#[derive(Clone)]
pub struct HttpReplyNotifier {
    client: Client,
    url: String,
}

impl HttpReplyNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReplyNotifier for HttpReplyNotifier {
    async fn notify(&self, reply: &Reply) -> Result<(), String> {
        let response = self
            .client
            .post(&self.url)
            .json(&NotifyPayload {
                message: &reply.reply,
                emotion: &reply.mood,
            })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("downstream returned {}", response.status()));
        }
        Ok(())
    }
}

/// Deliver `reply` on a detached task bounded by `timeout`
pub fn spawn_notification(
    notifier: Arc<dyn ReplyNotifier>,
    reply: Reply,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, notifier.notify(&reply)).await {
            Ok(Ok(())) => debug!("Reply delivered downstream"),
            Ok(Err(e)) => warn!(error = %e, "Reply notification failed"),
            Err(_) => warn!(timeout_ms = timeout.as_millis() as u64, "Reply notification timed out"),
        }
    })
}
