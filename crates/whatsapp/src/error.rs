use std::error::Error as StdError;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors for session and credential operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No active session is available.
    #[error("WhatsApp not connected")]
    NotConnected,

    /// The sidecar rejected or failed an outbound send.
    #[error("send failed: {message}")]
    SendFailed { message: String },

    /// The sidecar connection dropped before an operation completed.
    #[error("sidecar connection closed: {context}")]
    ConnectionClosed { context: String },

    /// Wrapped transport error from the WebSocket layer.
    #[error("sidecar transport failed: {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// QR code rendering failed.
    #[error("QR render failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn send_failed(message: impl std::fmt::Display) -> Self {
        Self::SendFailed {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn connection_closed(context: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            context: context.into(),
        }
    }

    #[must_use]
    pub fn transport(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
