use {
    axum::{
        Router,
        extract::State,
        response::Json,
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use wabridge_whatsapp::SessionSlot;

use crate::send::send_message;

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    /// Read-only view of the single session slot; handlers snapshot it
    /// per request.
    pub session: SessionSlot,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the bridge router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/send-message", post(send_message))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn start_gateway(bind: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connected = state.session.read().await.is_some();
    Json(serde_json::json!({ "status": "ok", "connected": connected }))
}
