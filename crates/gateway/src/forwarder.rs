//! Best-effort webhook delivery.

use {async_trait::async_trait, reqwest::StatusCode, tracing::debug};

use wabridge_whatsapp::{EventSink, WebhookPayload};

/// Why a delivery attempt failed. At-most-once contract: the caller
/// logs and moves on, nothing is retried or queued.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The webhook answered with a non-success status.
    #[error("webhook responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request never completed (refused, DNS, timeout).
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// POSTs normalized payloads to the configured webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookForwarder {
    client: reqwest::Client,
    url: String,
}

impl WebhookForwarder {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Deliver one payload as `application/json`.
    pub async fn forward(&self, payload: &WebhookPayload) -> Result<(), ForwardError> {
        let res = self.client.post(&self.url).json(payload).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ForwardError::Status { status, body });
        }

        debug!(url = %self.url, "payload forwarded");
        Ok(())
    }
}

#[async_trait]
impl EventSink for WebhookForwarder {
    async fn deliver(&self, payload: &WebhookPayload) -> anyhow::Result<()> {
        self.forward(payload).await.map_err(Into::into)
    }
}
