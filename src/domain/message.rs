use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Sent,
    Delivered,
    Read,
    #[default]
    Unknown,
}

impl DeliveryState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sent" => DeliveryState::Sent,
            "delivered" => DeliveryState::Delivered,
            "read" | "seen" => DeliveryState::Read,
            _ => DeliveryState::Unknown,
        }
    }
}

/// Content classification for a message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    File,
    Gif,
    Carousel,
    Interactive,
}

impl ContentKind {
    /// Returns a display label for non-text content, used in roster previews.
    pub fn display_label(&self) -> Option<&'static str> {
        match self {
            ContentKind::Text => None,
            ContentKind::Image => Some("[Image]"),
            ContentKind::Video => Some("[Video]"),
            ContentKind::Audio => Some("[Audio]"),
            ContentKind::File => Some("[File]"),
            ContentKind::Gif => Some("[GIF]"),
            ContentKind::Carousel => Some("[Carousel]"),
            ContentKind::Interactive => Some("[Interactive]"),
        }
    }

    /// True for kinds that can travel through the media send endpoints.
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            ContentKind::Image
                | ContentKind::Video
                | ContentKind::Audio
                | ContentKind::File
                | ContentKind::Gif
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub caption: Option<String>,
    pub filename: Option<String>,
    pub filesize: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub reactor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub direction: Direction,
    pub kind: ContentKind,
    pub text: String,
    pub attachment: Option<Attachment>,
    /// Carousel payload passed through unmodified for downstream rendering.
    pub elements: Option<Value>,
    pub timestamp_ms: i64,
    pub delivery_state: DeliveryState,
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Returns the roster preview text: content label plus text, never raw JSON.
    pub fn preview(&self) -> String {
        match (self.kind.display_label(), self.text.is_empty()) {
            (Some(label), true) => label.to_owned(),
            (Some(label), false) => format!("{} {}", label, self.text),
            (None, _) => self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(kind: ContentKind, text: &str) -> Message {
        Message {
            id: "m1".to_owned(),
            conversation_id: "c1".to_owned(),
            direction: Direction::Incoming,
            kind,
            text: text.to_owned(),
            attachment: None,
            elements: None,
            timestamp_ms: 1_000,
            delivery_state: DeliveryState::Unknown,
            reactions: Vec::new(),
        }
    }

    #[test]
    fn preview_returns_text_for_text_messages() {
        assert_eq!(message(ContentKind::Text, "hello").preview(), "hello");
    }

    #[test]
    fn preview_uses_label_for_pure_media() {
        assert_eq!(message(ContentKind::Image, "").preview(), "[Image]");
    }

    #[test]
    fn preview_combines_label_and_caption() {
        assert_eq!(
            message(ContentKind::Video, "launch clip").preview(),
            "[Video] launch clip"
        );
    }

    #[test]
    fn parses_known_delivery_states() {
        assert_eq!(DeliveryState::parse("sent"), DeliveryState::Sent);
        assert_eq!(DeliveryState::parse("Delivered"), DeliveryState::Delivered);
        assert_eq!(DeliveryState::parse("read"), DeliveryState::Read);
        assert_eq!(DeliveryState::parse("seen"), DeliveryState::Read);
    }

    #[test]
    fn unknown_delivery_states_degrade_to_unknown() {
        assert_eq!(DeliveryState::parse("queued"), DeliveryState::Unknown);
        assert_eq!(DeliveryState::parse(""), DeliveryState::Unknown);
    }

    #[test]
    fn media_kinds_are_sendable_via_media_routes() {
        assert!(ContentKind::Image.is_media());
        assert!(ContentKind::File.is_media());
        assert!(!ContentKind::Text.is_media());
        assert!(!ContentKind::Carousel.is_media());
        assert!(!ContentKind::Interactive.is_media());
    }
}
