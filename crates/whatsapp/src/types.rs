//! Wire types for the sidecar protocol and the normalized webhook payloads.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

// ── Raw Baileys envelopes ───────────────────────────────────────────────────

/// Addressing key attached to every message and reaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    #[serde(default)]
    pub id: Option<String>,
    /// Chat the message belongs to (`<user>@s.whatsapp.net`, group JID,
    /// or `status@broadcast` for status updates).
    #[serde(default)]
    pub remote_jid: Option<String>,
    /// True when this account sent the message itself.
    #[serde(default)]
    pub from_me: bool,
    /// Actual sender inside a group chat; absent in direct chats.
    #[serde(default)]
    pub participant: Option<String>,
}

/// The text-carrying parts of a message envelope. Unknown content kinds
/// (media, stickers, polls, …) are preserved verbatim in `other` so the
/// forwarded envelope stays lossless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_text_message: Option<ExtendedTextMessage>,
    /// Present when the envelope itself is a reaction. Such envelopes are
    /// skipped by normalization to avoid double delivery through the
    /// dedicated reaction channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_message: Option<Value>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

/// Quoted/extended text content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedTextMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

/// One inbound message as surfaced by the sidecar's upsert event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub key: MessageKey,
    #[serde(default)]
    pub message: Option<MessageContent>,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub message_timestamp: Option<i64>,
}

/// One inbound reaction event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReaction {
    #[serde(default)]
    pub key: MessageKey,
    /// Reaction body (emoji text plus the key of the reacted-to message),
    /// forwarded as-is.
    #[serde(default)]
    pub reaction: Value,
}

// ── Session event stream ────────────────────────────────────────────────────

/// Events delivered by a connected session, in arrival order.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The library mutated its in-memory credentials; persist them.
    CredsUpdate { creds: Value },
    /// Pairing required; render the code for the operator.
    Qr { code: String },
    /// Connection is open and usable.
    Open,
    /// Connection closed. `status_code` 401 means logged out (terminal).
    Closed { status_code: Option<u16> },
    /// A batch of inbound messages.
    Messages(Vec<RawMessage>),
    /// A batch of inbound reactions.
    Reactions(Vec<RawReaction>),
}

// ── Sidecar protocol ────────────────────────────────────────────────────────

/// Commands sent to the sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SidecarCommand {
    /// Establish the WhatsApp connection, resuming from persisted
    /// credentials when present.
    Connect { creds: Option<Value> },
    /// Send a text message; the sidecar replies with a `send_result`
    /// carrying the same `request_id`.
    SendText {
        request_id: String,
        to: String,
        text: String,
    },
}

/// Events received from the sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SidecarEvent {
    CredsUpdate {
        creds: Value,
    },
    Qr {
        code: String,
    },
    Open,
    Closed {
        #[serde(default)]
        status_code: Option<u16>,
    },
    Messages {
        messages: Vec<RawMessage>,
    },
    Reactions {
        reactions: Vec<RawReaction>,
    },
    SendResult {
        request_id: String,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
}

// ── Normalized webhook payloads ─────────────────────────────────────────────

/// Payload POSTed to the configured webhook, discriminated by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebhookPayload {
    Message(MessagePayload),
    Reaction(ReactionPayload),
}

/// Normalized inbound message. Field names match the webhook contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message_id: Option<String>,
    /// Sender: group participant when present, otherwise the chat JID.
    pub from: Option<String>,
    pub chat: Option<String>,
    pub timestamp: Option<i64>,
    /// Plain text, empty when the envelope carries no known text field.
    pub text: String,
    #[serde(rename = "pushName")]
    pub push_name: Option<String>,
    /// The raw message envelope, passed through for consumers that need
    /// more than the extracted text.
    pub message: Option<MessageContent>,
}

/// Normalized inbound reaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub message_id: Option<String>,
    pub chat: Option<String>,
    pub from: Option<String>,
    pub reaction: Value,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_payload_serializes_with_type_tag() {
        let payload = WebhookPayload::Message(MessagePayload {
            message_id: Some("ABC".into()),
            from: Some("123@s.whatsapp.net".into()),
            chat: Some("123@s.whatsapp.net".into()),
            timestamp: Some(1_700_000_000),
            text: "hello".into(),
            push_name: Some("Ada".into()),
            message: None,
        });

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["message_id"], "ABC");
        assert_eq!(json["pushName"], "Ada");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn reaction_payload_serializes_with_type_tag() {
        let payload = WebhookPayload::Reaction(ReactionPayload {
            message_id: Some("ABC".into()),
            chat: Some("g@g.us".into()),
            from: Some("456@s.whatsapp.net".into()),
            reaction: serde_json::json!({"text": "👍"}),
        });

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "reaction");
        assert_eq!(json["reaction"]["text"], "👍");
    }

    #[test]
    fn raw_message_parses_baileys_camel_case() {
        let raw: RawMessage = serde_json::from_str(
            r#"{
                "key": {"id": "X1", "remoteJid": "123@s.whatsapp.net", "fromMe": false},
                "message": {"conversation": "hi", "contextInfo": {"foo": 1}},
                "pushName": "Ada",
                "messageTimestamp": 1700000000
            }"#,
        )
        .unwrap();

        assert_eq!(raw.key.id.as_deref(), Some("X1"));
        assert!(!raw.key.from_me);
        let content = raw.message.unwrap();
        assert_eq!(content.conversation.as_deref(), Some("hi"));
        // Unknown envelope fields survive the round trip.
        assert!(content.other.contains_key("contextInfo"));
    }

    #[test]
    fn sidecar_event_round_trips() {
        let event: SidecarEvent =
            serde_json::from_str(r#"{"event": "closed", "status_code": 401}"#).unwrap();
        assert!(matches!(event, SidecarEvent::Closed {
            status_code: Some(401)
        }));

        let event: SidecarEvent = serde_json::from_str(r#"{"event": "closed"}"#).unwrap();
        assert!(matches!(event, SidecarEvent::Closed { status_code: None }));
    }
}
