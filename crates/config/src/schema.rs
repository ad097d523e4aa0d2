//! Config schema.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Webhook URL inbound events are POSTed to. Required; startup
    /// fails without it.
    pub webhook_url: Option<String>,
    pub gateway: GatewayConfig,
    pub whatsapp: WhatsAppConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// WhatsApp session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Directory for persisted credentials. Defaults to `./auth_info`.
    pub auth_dir: Option<PathBuf>,
    /// WebSocket port of the Baileys sidecar.
    pub sidecar_port: u16,
    /// Directory containing the sidecar code; auto-discovered when
    /// unset.
    pub sidecar_dir: Option<PathBuf>,
    /// Spawn and supervise the sidecar process. Disable to attach to
    /// an externally managed one.
    pub manage_sidecar: bool,
    /// Delay between reconnect attempts after a non-terminal
    /// disconnect.
    pub reconnect_delay_ms: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            auth_dir: None,
            sidecar_port: 8055,
            sidecar_dir: None,
            manage_sidecar: true,
            reconnect_delay_ms: 3000,
        }
    }
}

impl WhatsAppConfig {
    /// Auth directory, defaulting to `./auth_info`.
    #[must_use]
    pub fn auth_dir(&self) -> PathBuf {
        self.auth_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("auth_info"))
    }
}
