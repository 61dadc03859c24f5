use serde_json::Value;

/// Server push notifications, already decoded from the wire shape.
///
/// `conversation_ids` carries whichever of the two conversation identifiers
/// the emitting system chose to attach; consumers match on either.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    NewMessage {
        conversation_ids: Vec<String>,
        message: Value,
    },
    RosterSnapshot {
        partial: bool,
        entries: Vec<Value>,
    },
    DeliveryStatusUpdated {
        conversation_ids: Vec<String>,
        message_id: String,
        status: String,
    },
    NewReaction {
        conversation_ids: Vec<String>,
        message_id: String,
        emoji: String,
        reactor: Option<String>,
    },
}
