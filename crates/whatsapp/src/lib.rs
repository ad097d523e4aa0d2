//! WhatsApp connection management for the bridge.
//!
//! Talks the WhatsApp Web protocol via a Baileys sidecar process (the
//! protocol library — session encryption, multi-device sync, and QR
//! pairing all live there) and turns its event stream into normalized
//! payloads for the webhook forwarder.

pub mod creds;
pub mod error;
pub mod normalize;
pub mod process;
pub mod session;
pub mod sidecar;
pub mod supervisor;
pub mod types;

pub use {
    creds::CredsStore,
    error::{Error, Result},
    process::{SidecarConfig, SidecarProcess, find_sidecar_dir, start_sidecar},
    session::{Connector, EventSink, Session, SessionSlot, new_session_slot},
    sidecar::{DEFAULT_SIDECAR_PORT, SidecarConnector},
    supervisor::{LOGGED_OUT_STATUS, Supervisor},
    types::{
        MessageContent, MessageKey, MessagePayload, RawMessage, RawReaction, ReactionPayload,
        SessionEvent, WebhookPayload,
    },
};
