//! Connection lifecycle supervision.
//!
//! One supervisor task owns the session for the whole process: it
//! connects, publishes the handle into the shared slot, drives the
//! event stream, and reconnects after non-terminal disconnects with a
//! fixed delay. A logged-out disconnect is terminal — the loop exits
//! and the process keeps running without a session until an operator
//! restarts and re-pairs it.

use std::{sync::Arc, time::Duration};

use {
    qrcode::{QrCode, render::unicode},
    tracing::{debug, info, warn},
};

use crate::{
    creds::CredsStore,
    error::Result,
    normalize::{normalize_message, normalize_reaction},
    session::{Connector, EventSink, SessionSlot},
    types::{RawMessage, RawReaction, SessionEvent, WebhookPayload},
};

/// Disconnect status meaning the remote side invalidated the session.
pub const LOGGED_OUT_STATUS: u16 = 401;

/// Delay between reconnect attempts. Constant and unbounded: no
/// backoff and no retry cap, so a persistently failing network
/// produces a steady reconnect drumbeat.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// How one connection ended.
enum Disposition {
    /// Remote side logged us out; do not reconnect.
    LoggedOut,
    /// Anything else (network drop, timeout, server-initiated close).
    Retry,
}

/// Supervises the single WhatsApp session.
pub struct Supervisor {
    connector: Arc<dyn Connector>,
    slot: SessionSlot,
    sink: Arc<dyn EventSink>,
    creds: CredsStore,
    reconnect_delay: Duration,
}

impl Supervisor {
    pub fn new(
        connector: Arc<dyn Connector>,
        slot: SessionSlot,
        sink: Arc<dyn EventSink>,
        creds: CredsStore,
    ) -> Self {
        Self {
            connector,
            slot,
            sink,
            creds,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run until a terminal disconnect. Connect failures count as
    /// transient and go through the same fixed-delay retry as network
    /// drops.
    pub async fn run(self) {
        loop {
            match self.connect_once().await {
                Ok(Disposition::LoggedOut) => {
                    self.slot.write().await.take();
                    warn!("logged out by remote side; not reconnecting (re-pair to resume)");
                    return;
                },
                Ok(Disposition::Retry) => {
                    info!(
                        delay_ms = self.reconnect_delay.as_millis() as u64,
                        "connection closed, scheduling reconnect"
                    );
                },
                Err(e) => {
                    warn!(
                        error = %e,
                        delay_ms = self.reconnect_delay.as_millis() as u64,
                        "connect failed, scheduling reconnect"
                    );
                },
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// One connection: establish, publish the handle, drain events.
    async fn connect_once(&self) -> anyhow::Result<Disposition> {
        let creds = self.creds.load();
        let (session, mut events) = self.connector.connect(creds).await?;

        // Replace any prior handle. On a transient disconnect the stale
        // handle stays here until this line runs again on reconnect.
        *self.slot.write().await = Some(session);

        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::CredsUpdate { creds } => {
                    // Persist before the blob is needed again; failures
                    // are logged, not fatal.
                    if let Err(e) = self.creds.save(&creds) {
                        warn!(error = %e, "failed to persist credentials");
                    }
                },
                SessionEvent::Qr { code } => self.show_qr(&code),
                SessionEvent::Open => info!("connected to WhatsApp"),
                SessionEvent::Closed { status_code } => {
                    if status_code == Some(LOGGED_OUT_STATUS) {
                        return Ok(Disposition::LoggedOut);
                    }
                    debug!(?status_code, "non-terminal disconnect");
                    return Ok(Disposition::Retry);
                },
                SessionEvent::Messages(batch) => self.forward_messages(batch).await,
                SessionEvent::Reactions(batch) => self.forward_reactions(batch).await,
            }
        }

        // Event stream ended without a close event: the transport died.
        debug!("session event stream ended");
        Ok(Disposition::Retry)
    }

    /// Forward a message batch sequentially, awaiting each delivery so
    /// ordering within the batch is preserved. A slow webhook stalls
    /// the rest of the batch; order matters more than throughput here.
    async fn forward_messages(&self, batch: Vec<RawMessage>) {
        for raw in batch {
            let Some(payload) = normalize_message(&raw) else {
                debug!(
                    message_id = raw.key.id.as_deref().unwrap_or(""),
                    "skipping filtered message"
                );
                continue;
            };
            debug!(
                message_id = payload.message_id.as_deref().unwrap_or(""),
                chat = payload.chat.as_deref().unwrap_or(""),
                "forwarding inbound message"
            );
            if let Err(e) = self.sink.deliver(&WebhookPayload::Message(payload)).await {
                warn!(error = %e, "webhook delivery failed");
            }
        }
    }

    async fn forward_reactions(&self, batch: Vec<RawReaction>) {
        for raw in batch {
            let payload = normalize_reaction(&raw);
            debug!(
                message_id = payload.message_id.as_deref().unwrap_or(""),
                "forwarding inbound reaction"
            );
            if let Err(e) = self.sink.deliver(&WebhookPayload::Reaction(payload)).await {
                warn!(error = %e, "webhook delivery failed");
            }
        }
    }

    /// Render the pairing QR for the operator. Side channel only: the
    /// code never becomes application state.
    fn show_qr(&self, code: &str) {
        match render_qr(code) {
            Ok(art) => {
                info!("pairing required, scan the QR code below with WhatsApp");
                eprintln!("{art}");
            },
            Err(e) => warn!(error = %e, "failed to render pairing QR code"),
        }
    }
}

/// Render a QR code as unicode half-blocks for terminal display.
pub fn render_qr(code: &str) -> Result<String> {
    let qr = QrCode::new(code.as_bytes())?;
    Ok(qr
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}
