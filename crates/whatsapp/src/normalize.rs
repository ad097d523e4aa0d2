//! Inbound event normalization and filtering.

use crate::types::{MessagePayload, RawMessage, RawReaction, ReactionPayload};

/// Chat JID carrying status updates; never forwarded.
pub const STATUS_BROADCAST_JID: &str = "status@broadcast";

/// Normalize one inbound message, or `None` when it must be skipped.
///
/// Skipped: status-broadcast traffic, messages sent by this account
/// itself, and reaction envelopes (those arrive again on the dedicated
/// reaction channel and would otherwise be delivered twice).
pub fn normalize_message(raw: &RawMessage) -> Option<MessagePayload> {
    if raw.key.remote_jid.as_deref() == Some(STATUS_BROADCAST_JID) {
        return None;
    }
    if raw.key.from_me {
        return None;
    }
    if raw
        .message
        .as_ref()
        .is_some_and(|m| m.reaction_message.is_some())
    {
        return None;
    }

    Some(MessagePayload {
        message_id: raw.key.id.clone(),
        from: sender_of(&raw.key),
        chat: raw.key.remote_jid.clone(),
        timestamp: raw.message_timestamp,
        text: extract_text(raw),
        push_name: raw.push_name.clone(),
        message: raw.message.clone(),
    })
}

/// Normalize one inbound reaction. Reactions are always forwarded.
pub fn normalize_reaction(raw: &RawReaction) -> ReactionPayload {
    ReactionPayload {
        message_id: raw.key.id.clone(),
        chat: raw.key.remote_jid.clone(),
        from: sender_of(&raw.key),
        reaction: raw.reaction.clone(),
    }
}

/// Group participant when present, otherwise the chat JID.
fn sender_of(key: &crate::types::MessageKey) -> Option<String> {
    key.participant.clone().or_else(|| key.remote_jid.clone())
}

/// Plain conversation text, else extended/quoted text, else empty. An
/// empty `conversation` counts as absent and falls through to the
/// extended text.
fn extract_text(raw: &RawMessage) -> String {
    let Some(content) = raw.message.as_ref() else {
        return String::new();
    };
    if let Some(text) = content.conversation.as_deref().filter(|t| !t.is_empty()) {
        return text.to_string();
    }
    content
        .extended_text_message
        .as_ref()
        .and_then(|e| e.text.clone())
        .unwrap_or_default()
}
