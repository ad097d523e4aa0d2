//! Session trait seams and the shared session slot.
//!
//! The slot is the single process-wide reference to the live connection.
//! It is created once and injected into both the lifecycle supervisor
//! (which writes it) and the HTTP gateway (which snapshots it per
//! request), so tests can substitute mock sessions without global state.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    serde_json::Value,
    tokio::sync::{RwLock, mpsc},
};

use crate::types::{SessionEvent, WebhookPayload};

/// A live, authenticated link to WhatsApp.
#[async_trait]
pub trait Session: Send + Sync {
    /// Send a plain text message to the given JID.
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;
}

/// Establishes sessions. One connect attempt is in flight at a time;
/// the returned receiver yields events until the connection dies.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        creds: Option<Value>,
    ) -> Result<(Arc<dyn Session>, mpsc::Receiver<SessionEvent>)>;
}

/// Destination for normalized inbound payloads — the webhook forwarder
/// provides the concrete implementation.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one payload, best-effort. Errors are reported to the
    /// caller, which logs and continues.
    async fn deliver(&self, payload: &WebhookPayload) -> Result<()>;
}

/// Shared holder for the at-most-one active session.
///
/// `None` until the first successful connect, and again after a
/// logged-out (terminal) disconnect. After a transient disconnect the
/// previous handle stays in place until the reconnect replaces it, so a
/// send issued during the gap uses a stale handle and fails.
pub type SessionSlot = Arc<RwLock<Option<Arc<dyn Session>>>>;

/// Create an empty session slot.
#[must_use]
pub fn new_session_slot() -> SessionSlot {
    Arc::new(RwLock::new(None))
}
