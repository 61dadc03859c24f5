//! Mapping from raw backend payloads to domain types.
//!
//! The wire shapes are duck-typed and vary per channel; decoding is
//! fail-open at the field level (timestamps fall back to "now", content to
//! plain text) and fails the whole record only when no identifier can be
//! found at all.

use serde_json::Value;

use crate::domain::{
    content,
    conversation::{Conversation, ConversationKey, ConversationPatch, Flags, Platform, Status},
    message::{DeliveryState, Direction, Message},
    timestamp,
};

const MESSAGE_ID_FIELDS: &[&str] = &["id", "_id", "message_id"];
const CONVERSATION_ID_FIELDS: &[&str] = &["id", "_id", "conversation_id"];
const EXTERNAL_ID_FIELDS: &[&str] = &["external_chat_id", "chat_id"];
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "created_at", "sent_at"];

/// Decodes a raw message row. Returns `None` only when the row carries no id.
pub fn decode_message(raw: &Value, now_ms: i64) -> Option<Message> {
    let id = first_string(raw, MESSAGE_ID_FIELDS)?;
    let conversation_id = first_string(raw, &["conversation_id", "chat_id"]).unwrap_or_default();

    let derived = content::derive(raw);
    let timestamp_ms = timestamp::field_to_epoch_millis(first_field(raw, TIMESTAMP_FIELDS), now_ms);

    Some(Message {
        id,
        conversation_id,
        direction: decode_direction(raw),
        kind: derived.kind,
        text: derived.text,
        attachment: derived.attachment,
        elements: derived.elements,
        timestamp_ms,
        delivery_state: first_string(raw, &["status", "delivery_status"])
            .map(|status| DeliveryState::parse(&status))
            .unwrap_or_default(),
        reactions: Vec::new(),
    })
}

/// Decodes a roster row into a full conversation. The last-message preview is
/// always re-derived from the raw payload, never trusted as pre-formatted.
pub fn decode_conversation(raw: &Value, now_ms: i64) -> Option<Conversation> {
    let id = first_string(raw, CONVERSATION_ID_FIELDS)?;
    let external_chat_id = first_string(raw, EXTERNAL_ID_FIELDS)
        .filter(|candidate| *candidate != id)
        .unwrap_or_default();

    let (last_message_preview, last_message_ms) = decode_last_message(raw, now_ms);

    Some(Conversation {
        key: ConversationKey::new(id, external_chat_id),
        platform: first_string(raw, &["platform", "channel"])
            .map(|platform| Platform::parse(&platform))
            .unwrap_or_default(),
        display_name: first_string(raw, &["display_name", "name", "contact_name"])
            .unwrap_or_default(),
        avatar_url: first_string(raw, &["avatar_url", "avatar"]),
        last_message_preview,
        last_message_ms,
        unread_count: first_u64(raw, &["unread_count", "unread"]).unwrap_or_default() as u32,
        status: first_string(raw, &["status"])
            .map(|status| Status::parse(&status))
            .unwrap_or_default(),
        flags: Flags {
            favorite: first_bool(raw, &["favorite", "is_favorite"]),
            disabled: first_bool(raw, &["disabled", "is_disabled"]),
            blocked: first_bool(raw, &["blocked", "is_blocked"]),
        },
    })
}

/// Decodes a partial roster patch: only the fields present in the payload.
pub fn decode_conversation_patch(raw: &Value, now_ms: i64) -> Option<ConversationPatch> {
    let id = first_string(raw, CONVERSATION_ID_FIELDS)?;
    let external_chat_id = first_string(raw, EXTERNAL_ID_FIELDS)
        .filter(|candidate| *candidate != id)
        .unwrap_or_default();

    let last_message = raw.get("last_message").filter(|value| value.is_object());
    let (preview, last_ms) = match last_message {
        Some(message) => {
            let (preview, last_ms) = derive_preview(message, now_ms);
            (Some(preview), Some(last_ms))
        }
        None => (
            None,
            first_field(raw, &["last_message_at", "updated_at"])
                .map(|value| timestamp::to_epoch_millis(value, now_ms)),
        ),
    };

    Some(ConversationPatch {
        key: ConversationKey::new(id, external_chat_id),
        platform: first_string(raw, &["platform", "channel"])
            .map(|platform| Platform::parse(&platform)),
        display_name: first_string(raw, &["display_name", "name", "contact_name"]),
        avatar_url: first_string(raw, &["avatar_url", "avatar"]),
        last_message_preview: preview,
        last_message_ms: last_ms,
        unread_count: first_u64(raw, &["unread_count", "unread"]).map(|count| count as u32),
        status: first_string(raw, &["status"]).map(|status| Status::parse(&status)),
        favorite: first_bool_opt(raw, &["favorite", "is_favorite"]),
        disabled: first_bool_opt(raw, &["disabled", "is_disabled"]),
        blocked: first_bool_opt(raw, &["blocked", "is_blocked"]),
    })
}

fn decode_last_message(raw: &Value, now_ms: i64) -> (String, i64) {
    match raw.get("last_message").filter(|value| value.is_object()) {
        Some(message) => derive_preview(message, now_ms),
        None => (
            String::new(),
            timestamp::field_to_epoch_millis(
                first_field(raw, &["last_message_at", "updated_at"]),
                now_ms,
            ),
        ),
    }
}

fn derive_preview(message: &Value, now_ms: i64) -> (String, i64) {
    let derived = content::derive(message);
    let preview = match (derived.kind.display_label(), derived.text.is_empty()) {
        (Some(label), true) => label.to_owned(),
        (Some(label), false) => format!("{} {}", label, derived.text),
        (None, _) => derived.text,
    };
    let timestamp_ms =
        timestamp::field_to_epoch_millis(first_field(message, TIMESTAMP_FIELDS), now_ms);
    (preview, timestamp_ms)
}

fn decode_direction(raw: &Value) -> Direction {
    if let Some(direction) = first_string(raw, &["direction"]) {
        return match direction.trim().to_ascii_lowercase().as_str() {
            "outgoing" | "out" => Direction::Outgoing,
            _ => Direction::Incoming,
        };
    }

    match raw
        .get("from_me")
        .or_else(|| raw.get("is_outgoing"))
        .and_then(Value::as_bool)
    {
        Some(true) => Direction::Outgoing,
        _ => Direction::Incoming,
    }
}

fn first_field<'a>(raw: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields.iter().find_map(|field| raw.get(field))
}

fn first_string(raw: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| {
        let value = raw.get(field)?;
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    })
}

fn first_u64(raw: &Value, fields: &[&str]) -> Option<u64> {
    fields
        .iter()
        .find_map(|field| raw.get(field).and_then(Value::as_u64))
}

fn first_bool(raw: &Value, fields: &[&str]) -> bool {
    first_bool_opt(raw, fields).unwrap_or_default()
}

fn first_bool_opt(raw: &Value, fields: &[&str]) -> Option<bool> {
    fields
        .iter()
        .find_map(|field| raw.get(field).and_then(Value::as_bool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::ContentKind;
    use serde_json::json;

    const NOW_MS: i64 = 1_700_000_000_000;

    #[test]
    fn decodes_a_text_message_row() {
        let raw = json!({
            "id": "m1",
            "conversation_id": "c1",
            "direction": "incoming",
            "timestamp": 1_690_000_000,
            "body": {"text": "hello"},
            "status": "delivered"
        });

        let message = decode_message(&raw, NOW_MS).expect("message must decode");

        assert_eq!(message.id, "m1");
        assert_eq!(message.conversation_id, "c1");
        assert_eq!(message.direction, Direction::Incoming);
        assert_eq!(message.kind, ContentKind::Text);
        assert_eq!(message.text, "hello");
        assert_eq!(message.timestamp_ms, 1_690_000_000_000);
        assert_eq!(message.delivery_state, DeliveryState::Delivered);
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let raw = json!({"id": 4711, "body": {"text": "x"}});

        let message = decode_message(&raw, NOW_MS).expect("message must decode");

        assert_eq!(message.id, "4711");
    }

    #[test]
    fn from_me_flag_maps_to_outgoing() {
        let raw = json!({"id": "m1", "from_me": true, "message": "hi"});

        let message = decode_message(&raw, NOW_MS).expect("message must decode");

        assert_eq!(message.direction, Direction::Outgoing);
    }

    #[test]
    fn message_without_any_id_is_rejected() {
        assert_eq!(decode_message(&json!({"body": {"text": "x"}}), NOW_MS), None);
    }

    #[test]
    fn missing_timestamp_falls_open_to_now() {
        let raw = json!({"id": "m1", "body": {"text": "x"}});

        let message = decode_message(&raw, NOW_MS).expect("message must decode");

        assert_eq!(message.timestamp_ms, NOW_MS);
    }

    #[test]
    fn decodes_a_conversation_row_with_rederived_preview() {
        let raw = json!({
            "id": "c1",
            "chat_id": "wa-77",
            "platform": "whatsapp",
            "name": "Dana",
            "unread_count": 3,
            "status": "pending",
            "favorite": true,
            "last_message": {
                "body": {"url": "https://x/y.jpg"},
                "timestamp": 1_690_000_000
            }
        });

        let conversation = decode_conversation(&raw, NOW_MS).expect("conversation must decode");

        assert_eq!(conversation.key, ConversationKey::new("c1", "wa-77"));
        assert_eq!(conversation.platform, Platform::Whatsapp);
        assert_eq!(conversation.display_name, "Dana");
        assert_eq!(conversation.unread_count, 3);
        assert_eq!(conversation.status, Status::Pending);
        assert!(conversation.flags.favorite);
        assert_eq!(conversation.last_message_preview, "[Image]");
        assert_eq!(conversation.last_message_ms, 1_690_000_000_000);
    }

    #[test]
    fn duplicate_external_id_is_dropped() {
        let raw = json!({"id": "c1", "chat_id": "c1"});

        let conversation = decode_conversation(&raw, NOW_MS).expect("conversation must decode");

        assert_eq!(conversation.key.external_chat_id, "");
    }

    #[test]
    fn conversation_without_id_is_rejected() {
        assert_eq!(decode_conversation(&json!({"name": "x"}), NOW_MS), None);
    }

    #[test]
    fn patch_only_carries_present_fields() {
        let raw = json!({"id": "c1", "status": "solved"});

        let patch = decode_conversation_patch(&raw, NOW_MS).expect("patch must decode");

        assert_eq!(patch.status, Some(Status::Solved));
        assert_eq!(patch.display_name, None);
        assert_eq!(patch.unread_count, None);
        assert_eq!(patch.last_message_ms, None);
        assert_eq!(patch.favorite, None);
    }

    #[test]
    fn patch_rederives_preview_from_last_message() {
        let raw = json!({
            "id": "c1",
            "last_message": {"body": {"text": "new text"}, "timestamp": 1_690_000_111}
        });

        let patch = decode_conversation_patch(&raw, NOW_MS).expect("patch must decode");

        assert_eq!(patch.last_message_preview.as_deref(), Some("new text"));
        assert_eq!(patch.last_message_ms, Some(1_690_000_111_000));
    }
}
