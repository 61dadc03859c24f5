//! Decoding of named socket events into [`PushEvent`]s.
//!
//! Unknown event names and malformed payloads decode to `None`: a bad push
//! must never take the inbox down, it is only logged.

use serde_json::Value;

use crate::domain::events::PushEvent;

const PUSH_EVENT_IGNORED: &str = "PUSH_EVENT_IGNORED";

/// Conversation identifier fields an event may carry, in no particular
/// order of trust; all found values participate in either-id matching.
const EVENT_ID_FIELDS: &[&str] = &["conversation_id", "chat_id", "external_chat_id"];

pub fn decode_event(name: &str, payload: &Value) -> Option<PushEvent> {
    let decoded = match name {
        "newMessage" | "new_message" => decode_new_message(payload),
        "chatsUpdated" | "conversationsUpdated" | "chats_updated" | "conversations_updated" => {
            decode_roster_snapshot(payload)
        }
        "deliveryStatusUpdated" | "delivery_status_updated" => decode_delivery_status(payload),
        "newReaction" | "new_reaction" => decode_reaction(payload),
        _ => None,
    };

    if decoded.is_none() {
        tracing::debug!(code = PUSH_EVENT_IGNORED, event = name, "push event ignored");
    }
    decoded
}

fn decode_new_message(payload: &Value) -> Option<PushEvent> {
    let message = payload
        .get("message")
        .filter(|value| value.is_object())
        .unwrap_or(payload);

    let mut conversation_ids = extract_ids(payload);
    for id in extract_ids(message) {
        if !conversation_ids.contains(&id) {
            conversation_ids.push(id);
        }
    }
    if conversation_ids.is_empty() {
        return None;
    }

    Some(PushEvent::NewMessage {
        conversation_ids,
        message: message.clone(),
    })
}

fn decode_roster_snapshot(payload: &Value) -> Option<PushEvent> {
    let entries = match payload {
        Value::Array(entries) => entries.clone(),
        Value::Object(_) => payload
            .get("conversations")
            .or_else(|| payload.get("chats"))
            .and_then(Value::as_array)
            .cloned()?,
        _ => return None,
    };

    let partial = payload
        .get("partial")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Some(PushEvent::RosterSnapshot { partial, entries })
}

fn decode_delivery_status(payload: &Value) -> Option<PushEvent> {
    let conversation_ids = extract_ids(payload);
    let message_id = string_field(payload, &["message_id", "id"])?;
    let status = string_field(payload, &["status", "delivery_status"])?;

    if conversation_ids.is_empty() {
        return None;
    }

    Some(PushEvent::DeliveryStatusUpdated {
        conversation_ids,
        message_id,
        status,
    })
}

fn decode_reaction(payload: &Value) -> Option<PushEvent> {
    let conversation_ids = extract_ids(payload);
    let message_id = string_field(payload, &["message_id", "id"])?;
    let emoji = string_field(payload, &["reaction", "emoji"])?;

    if conversation_ids.is_empty() {
        return None;
    }

    Some(PushEvent::NewReaction {
        conversation_ids,
        message_id,
        emoji,
        reactor: string_field(payload, &["from", "sender_id"]),
    })
}

fn extract_ids(payload: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    for field in EVENT_ID_FIELDS {
        if let Some(id) = payload.get(field).and_then(value_as_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn string_field(payload: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|field| payload.get(field).and_then(value_as_id))
}
