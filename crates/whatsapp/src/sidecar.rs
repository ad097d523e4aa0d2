//! WebSocket transport to the Baileys sidecar.
//!
//! The sidecar owns the actual WhatsApp Web session; this module speaks
//! its JSON protocol: commands out (`connect`, `send_text`), events in
//! (creds updates, QR codes, connection state, message batches, send
//! acks). One WebSocket connection per session attempt.

use std::{collections::HashMap, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    futures::{SinkExt, StreamExt},
    serde_json::Value,
    tokio::sync::{Mutex, mpsc, oneshot},
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tracing::{debug, warn},
    uuid::Uuid,
};

use crate::{
    error::Error,
    session::{Connector, Session},
    types::{SessionEvent, SidecarCommand, SidecarEvent},
};

/// Default port the sidecar's WebSocket server listens on.
pub const DEFAULT_SIDECAR_PORT: u16 = 8055;

/// How often to retry the initial WebSocket connect while the sidecar
/// process is still booting.
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Outcome of one send request, delivered by the ack router.
#[derive(Debug)]
struct SendOutcome {
    success: bool,
    error: Option<String>,
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<SendOutcome>>>>;

/// Connects to the sidecar over WebSocket.
pub struct SidecarConnector {
    url: String,
    connect_attempts: u32,
}

impl SidecarConnector {
    /// Connector for a sidecar on localhost at the given port.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self::with_url(format!("ws://127.0.0.1:{port}"))
    }

    /// Connector for an explicit WebSocket URL.
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_attempts: 10,
        }
    }

    #[must_use]
    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }
}

#[async_trait]
impl Connector for SidecarConnector {
    async fn connect(
        &self,
        creds: Option<Value>,
    ) -> anyhow::Result<(Arc<dyn Session>, mpsc::Receiver<SessionEvent>)> {
        let ws = connect_with_retry(&self.url, self.connect_attempts).await?;
        debug!(url = %self.url, "connected to sidecar");

        let (mut ws_sink, mut ws_stream) = ws.split();
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<SidecarCommand>(32);
        let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(64);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        // Writer task: serialize commands onto the socket.
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                let text = match serde_json::to_string(&cmd) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(error = %e, "failed to encode sidecar command");
                        continue;
                    },
                };
                if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                    debug!(error = %e, "sidecar write failed");
                    break;
                }
            }
        });

        // Reader task: route events to the session stream and resolve
        // send acks.
        let reader_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(frame) = ws_stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        route_event(text.as_str(), &event_tx, &reader_pending).await;
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {},
                    Err(e) => {
                        debug!(error = %e, "sidecar read failed");
                        break;
                    },
                }
            }
            // Fail any in-flight sends; dropping `event_tx` ends the
            // supervisor's event stream.
            reader_pending.lock().await.clear();
        });

        cmd_tx
            .send(SidecarCommand::Connect { creds })
            .await
            .map_err(|_| Error::connection_closed("sidecar closed during connect"))?;

        let session = SidecarSession {
            commands: cmd_tx,
            pending,
        };
        Ok((Arc::new(session), event_rx))
    }
}

/// Session handle over an established sidecar connection.
struct SidecarSession {
    commands: mpsc::Sender<SidecarCommand>,
    pending: PendingMap,
}

#[async_trait]
impl Session for SidecarSession {
    async fn send_text(&self, to: &str, text: &str) -> anyhow::Result<()> {
        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        let cmd = SidecarCommand::SendText {
            request_id: request_id.clone(),
            to: to.to_string(),
            text: text.to_string(),
        };
        if self.commands.send(cmd).await.is_err() {
            self.pending.lock().await.remove(&request_id);
            return Err(Error::connection_closed("send command channel closed").into());
        }

        // No timeout: the ack arrives, or the connection dies and the
        // reader task drops our sender.
        match rx.await {
            Ok(SendOutcome { success: true, .. }) => Ok(()),
            Ok(SendOutcome { error, .. }) => Err(Error::send_failed(
                error.unwrap_or_else(|| "unknown send error".into()),
            )
            .into()),
            Err(_) => Err(Error::connection_closed("connection closed before send ack").into()),
        }
    }
}

/// Dispatch one sidecar frame.
async fn route_event(text: &str, events: &mpsc::Sender<SessionEvent>, pending: &PendingMap) {
    let event: SidecarEvent = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "unparseable sidecar event");
            return;
        },
    };

    let session_event = match event {
        SidecarEvent::CredsUpdate { creds } => SessionEvent::CredsUpdate { creds },
        SidecarEvent::Qr { code } => SessionEvent::Qr { code },
        SidecarEvent::Open => SessionEvent::Open,
        SidecarEvent::Closed { status_code } => SessionEvent::Closed { status_code },
        SidecarEvent::Messages { messages } => SessionEvent::Messages(messages),
        SidecarEvent::Reactions { reactions } => SessionEvent::Reactions(reactions),
        SidecarEvent::SendResult {
            request_id,
            success,
            error,
        } => {
            match pending.lock().await.remove(&request_id) {
                Some(tx) => {
                    let _ = tx.send(SendOutcome { success, error });
                },
                None => debug!(request_id, "send ack for unknown request"),
            }
            return;
        },
    };

    if events.send(session_event).await.is_err() {
        debug!("session event receiver dropped");
    }
}

/// Connect with bounded retries — the sidecar process may still be
/// starting when the bridge comes up.
async fn connect_with_retry(
    url: &str,
    attempts: u32,
) -> crate::error::Result<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
> {
    let mut last_err: Option<tokio_tungstenite::tungstenite::Error> = None;
    for attempt in 1..=attempts {
        match connect_async(url).await {
            Ok((ws, _)) => return Ok(ws),
            Err(e) => {
                debug!(attempt, error = %e, "sidecar not reachable yet");
                last_err = Some(e);
            },
        }
        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
    }
    match last_err {
        Some(e) => Err(Error::transport(
            format!("failed to reach sidecar at {url} after {attempts} attempts"),
            e,
        )),
        None => Err(Error::connection_closed(format!(
            "no connect attempts made for {url}"
        ))),
    }
}
