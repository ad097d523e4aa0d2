//! HTTP surface of the bridge: the outbound send endpoint and the
//! webhook forwarder for inbound events.

pub mod forwarder;
pub mod send;
pub mod server;

pub use {
    forwarder::{ForwardError, WebhookForwarder},
    send::{SendMessageRequest, SendMessageResponse},
    server::{AppState, build_app, start_gateway},
};
