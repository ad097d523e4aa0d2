#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for `POST /api/send-message`.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use {anyhow::Result, async_trait::async_trait, tokio::net::TcpListener};

use {
    wabridge_gateway::{AppState, build_app},
    wabridge_whatsapp::{Session, SessionSlot, new_session_slot},
};

/// Session stub that records sends and answers from a script.
struct StubSession {
    sent: Mutex<Vec<(String, String)>>,
    fail_with: Option<String>,
}

impl StubSession {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(message.into()),
        })
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for StubSession {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string()));
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

/// Spin up a test gateway on an ephemeral port, return the bound address.
async fn start_test_server(slot: SessionSlot) -> SocketAddr {
    let app = build_app(AppState { session: slot });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn post_send(addr: SocketAddr, body: serde_json::Value) -> serde_json::Value {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/send-message"))
        .json(&body)
        .send()
        .await
        .unwrap();
    resp.json().await.unwrap()
}

#[tokio::test]
async fn health_reports_connection_state() {
    let slot = new_session_slot();
    let addr = start_test_server(Arc::clone(&slot)).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected"], false);

    *slot.write().await = Some(StubSession::ok());
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["connected"], true);
}

#[tokio::test]
async fn empty_recipient_fails_validation_without_touching_session() {
    let slot = new_session_slot();
    let session = StubSession::ok();
    *slot.write().await = Some(Arc::clone(&session) as Arc<dyn Session>);
    let addr = start_test_server(slot).await;

    let body = post_send(addr, serde_json::json!({"to": "", "message": "x"})).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["to"][0], "must not be empty");
    assert!(session.sent().is_empty());
}

#[tokio::test]
async fn missing_field_gets_structured_validation_error() {
    let addr = start_test_server(new_session_slot()).await;

    let body = post_send(addr, serde_json::json!({"to": "123@s.whatsapp.net"})).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["message"][0], "must not be empty");

    let body = post_send(addr, serde_json::json!({})).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["to"][0], "must not be empty");
    assert_eq!(body["error"]["message"][0], "must not be empty");
}

#[tokio::test]
async fn empty_message_fails_validation() {
    let addr = start_test_server(new_session_slot()).await;

    let body = post_send(
        addr,
        serde_json::json!({"to": "123@s.whatsapp.net", "message": ""}),
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["message"][0], "must not be empty");
}

#[tokio::test]
async fn valid_body_without_session_is_rejected() {
    let addr = start_test_server(new_session_slot()).await;

    let body = post_send(
        addr,
        serde_json::json!({"to": "123@s.whatsapp.net", "message": "hi"}),
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "WhatsApp not connected");
}

#[tokio::test]
async fn successful_send_returns_success_true() {
    let slot = new_session_slot();
    let session = StubSession::ok();
    *slot.write().await = Some(Arc::clone(&session) as Arc<dyn Session>);
    let addr = start_test_server(slot).await;

    let body = post_send(
        addr,
        serde_json::json!({"to": "123@s.whatsapp.net", "message": "hi"}),
    )
    .await;
    assert_eq!(body, serde_json::json!({"success": true}));
    assert_eq!(
        session.sent(),
        vec![("123@s.whatsapp.net".to_string(), "hi".to_string())]
    );
}

#[tokio::test]
async fn failed_send_surfaces_error_text() {
    let slot = new_session_slot();
    *slot.write().await = Some(StubSession::failing("recipient blocked") as Arc<dyn Session>);
    let addr = start_test_server(slot).await;

    let body = post_send(
        addr,
        serde_json::json!({"to": "123@s.whatsapp.net", "message": "hi"}),
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "recipient blocked");
}
