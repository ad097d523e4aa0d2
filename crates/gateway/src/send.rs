//! The outbound send endpoint.

use std::collections::BTreeMap;

use {
    axum::{Json, extract::State},
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

use crate::server::AppState;

/// `POST /api/send-message` request body. Fields default to empty so
/// an absent field reports through the validation map instead of
/// failing body extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub message: String,
}

/// `POST /api/send-message` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SendMessageError>,
}

/// Either a plain error string or a per-field validation map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SendMessageError {
    Message(String),
    Fields(BTreeMap<String, Vec<String>>),
}

impl SendMessageResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(SendMessageError::Message(error.into())),
        }
    }

    fn invalid(fields: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            success: false,
            error: Some(SendMessageError::Fields(fields)),
        }
    }
}

/// Validate the request: both fields must be non-empty.
fn validate(req: &SendMessageRequest) -> Result<(), BTreeMap<String, Vec<String>>> {
    let mut fields = BTreeMap::new();
    if req.to.is_empty() {
        fields.insert("to".to_string(), vec!["must not be empty".to_string()]);
    }
    if req.message.is_empty() {
        fields.insert("message".to_string(), vec![
            "must not be empty".to_string(),
        ]);
    }
    if fields.is_empty() { Ok(()) } else { Err(fields) }
}

/// Send a text message through the active session.
///
/// Every call is an independent best-effort send: no auth, no
/// queueing, no retry. The session handle is snapshotted once per
/// request, so a reconnect replacing the slot mid-send cannot swap the
/// handle under us (the stale handle simply fails).
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Json<SendMessageResponse> {
    debug!("received request to /api/send-message");

    if let Err(fields) = validate(&req) {
        return Json(SendMessageResponse::invalid(fields));
    }

    let session = { state.session.read().await.clone() };
    let Some(session) = session else {
        return Json(SendMessageResponse::failed("WhatsApp not connected"));
    };

    match session.send_text(&req.to, &req.message).await {
        Ok(()) => Json(SendMessageResponse::ok()),
        Err(e) => {
            warn!(to = %req.to, error = %e, "outbound send failed");
            Json(SendMessageResponse::failed(e.to_string()))
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_non_empty_fields() {
        let req = SendMessageRequest {
            to: "123@s.whatsapp.net".into(),
            message: "hi".into(),
        };
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn missing_fields_deserialize_as_empty() {
        let req: SendMessageRequest =
            serde_json::from_str(r#"{"to": "123@s.whatsapp.net"}"#).unwrap();
        assert_eq!(req.to, "123@s.whatsapp.net");
        assert_eq!(req.message, "");

        let req: SendMessageRequest = serde_json::from_str("{}").unwrap();
        let fields = validate(&req).unwrap_err();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn validate_reports_each_empty_field() {
        let req = SendMessageRequest {
            to: String::new(),
            message: String::new(),
        };
        let fields = validate(&req).unwrap_err();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["to"], vec!["must not be empty"]);
        assert_eq!(fields["message"], vec!["must not be empty"]);
    }

    #[test]
    fn field_errors_serialize_as_object() {
        let mut fields = BTreeMap::new();
        fields.insert("to".to_string(), vec!["must not be empty".to_string()]);
        let resp = SendMessageResponse::invalid(fields);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["to"][0], "must not be empty");
    }

    #[test]
    fn success_response_omits_error_key() {
        let json = serde_json::to_value(SendMessageResponse::ok()).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }
}
