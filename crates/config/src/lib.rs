//! Configuration loading and env overrides.
//!
//! Config file: `wabridge.toml`, searched in `./` then
//! `~/.config/wabridge/`. Environment variables (`WEBHOOK_URL`, `PORT`,
//! `WABRIDGE_*`) override file values.

pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, discover_and_load, load_config},
    schema::{BridgeConfig, GatewayConfig, WhatsAppConfig},
};
