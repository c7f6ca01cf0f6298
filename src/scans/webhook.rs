//! Webhook Dispatcher
//!
//! Delivers the finished-scan payload to the configured endpoint, at most
//! once and without retries. Nothing that goes wrong while building or
//! posting the payload escapes as a panic; every failure comes back as a
//! [`WebhookError`] for the tracker to log.

use crate::app::config::ServiceConfig;
use crate::client::types::Scan;
use crate::scans::categorizer::ResultCategorizer;
use crate::scans::types::ScanResultResponse;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WebhookError {
    #[error("Failed to create webhook client: {message}")]
    Client { message: String },

    #[error("Failed to marshal webhook payload: {message}")]
    Serialize { message: String },

    #[error("Failed to send webhook request to {url}: {message}")]
    Request { url: String, message: String },

    #[error("Webhook returned non-success status: {status}")]
    Status { status: u16 },

    #[error("A fault occurred while building the webhook payload: {message}")]
    Fault { message: String },
}

impl crate::core::error_handling::ContextualError for WebhookError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

pub type WebhookResult<T> = Result<T, WebhookError>;

/// Sends a JSON body to a URL and reports the response status
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: String) -> WebhookResult<u16>;
}

/// HTTP transport over `reqwest` with a bounded timeout
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> WebhookResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| WebhookError::Client {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ServiceConfig) -> WebhookResult<Self> {
        Self::new(config.webhook_timeout, &config.user_agent)
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: String) -> WebhookResult<u16> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| WebhookError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(response.status().as_u16())
    }
}

/// Result of a dispatch that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Sent {
        status: u16,
        payload: Box<ScanResultResponse>,
    },
    /// No destination configured
    Skipped,
}

/// Builds and posts finished-scan payloads
#[derive(Clone)]
pub struct WebhookDispatcher {
    url: Option<String>,
    transport: Arc<dyn WebhookTransport>,
    categorizer: ResultCategorizer,
}

impl WebhookDispatcher {
    pub fn new(
        url: Option<String>,
        transport: Arc<dyn WebhookTransport>,
        categorizer: ResultCategorizer,
    ) -> Self {
        Self {
            url,
            transport,
            categorizer,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Build the payload from the terminal scan and post it once
    pub async fn send(&self, scan: &Scan) -> WebhookResult<Delivery> {
        let Some(url) = self.url.as_deref() else {
            log::info!(
                "No webhook destination configured, skipping delivery for scan {}",
                scan.scan_id
            );
            return Ok(Delivery::Skipped);
        };

        let payload = AssertUnwindSafe(self.categorizer.project_scan(scan))
            .catch_unwind()
            .await
            .map_err(|panic| WebhookError::Fault {
                message: panic_message(panic.as_ref()),
            })?;
        log::debug!("Webhook payload for scan {}: {:?}", scan.scan_id, payload);

        let body = serde_json::to_string(&payload).map_err(|e| WebhookError::Serialize {
            message: e.to_string(),
        })?;

        let status = self.transport.post_json(url, body).await?;
        if !(200..300).contains(&status) {
            return Err(WebhookError::Status { status });
        }

        Ok(Delivery::Sent {
            status,
            payload: Box::new(payload),
        })
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
