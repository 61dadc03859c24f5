use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Whatsapp,
    Instagram,
    Messenger,
    Telegram,
    #[default]
    Other,
}

impl Platform {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "whatsapp" => Platform::Whatsapp,
            "instagram" => Platform::Instagram,
            "messenger" | "facebook" => Platform::Messenger,
            "telegram" => Platform::Telegram,
            _ => Platform::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    Pending,
    Solved,
    Closed,
}

impl Status {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Status::Pending,
            "solved" => Status::Solved,
            "closed" => Status::Closed,
            _ => Status::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    pub favorite: bool,
    pub disabled: bool,
    pub blocked: bool,
}

/// The two identifiers different backend endpoints use for the same
/// conversation. Upstream systems are inconsistent about which one they attach
/// to an event, so matching always considers both. This is a permanent
/// compatibility contract, not a workaround to remove.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConversationKey {
    pub id: String,
    pub external_chat_id: String,
}

impl ConversationKey {
    pub fn new(id: impl Into<String>, external_chat_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external_chat_id: external_chat_id.into(),
        }
    }

    /// True when the candidate equals either identifier. Empty candidates
    /// never match so two half-filled keys cannot collide.
    pub fn matches_id(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        candidate == self.id || candidate == self.external_chat_id
    }

    pub fn matches_any<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> bool {
        candidates
            .into_iter()
            .any(|candidate| self.matches_id(candidate))
    }

    pub fn matches(&self, other: &ConversationKey) -> bool {
        self.matches_id(&other.id) || self.matches_id(&other.external_chat_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub key: ConversationKey,
    pub platform: Platform,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub last_message_preview: String,
    pub last_message_ms: i64,
    pub unread_count: u32,
    pub status: Status,
    pub flags: Flags,
}

/// Partial server patch for a subset of conversation fields. Absent fields
/// leave the local value untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversationPatch {
    pub key: ConversationKey,
    pub platform: Option<Platform>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub last_message_preview: Option<String>,
    pub last_message_ms: Option<i64>,
    pub unread_count: Option<u32>,
    pub status: Option<Status>,
    pub favorite: Option<bool>,
    pub disabled: Option<bool>,
    pub blocked: Option<bool>,
}

impl ConversationPatch {
    /// Merges the provided fields into an existing conversation. The unread
    /// count is deliberately excluded: unread precedence is the roster's job.
    pub fn merge_into(&self, conversation: &mut Conversation) {
        if !self.key.external_chat_id.is_empty() && conversation.key.external_chat_id.is_empty() {
            conversation.key.external_chat_id = self.key.external_chat_id.clone();
        }
        if let Some(platform) = self.platform {
            conversation.platform = platform;
        }
        if let Some(display_name) = &self.display_name {
            conversation.display_name = display_name.clone();
        }
        if let Some(avatar_url) = &self.avatar_url {
            conversation.avatar_url = Some(avatar_url.clone());
        }
        if let Some(preview) = &self.last_message_preview {
            conversation.last_message_preview = preview.clone();
        }
        if let Some(last_message_ms) = self.last_message_ms {
            conversation.last_message_ms = last_message_ms;
        }
        if let Some(status) = self.status {
            conversation.status = status;
        }
        if let Some(favorite) = self.favorite {
            conversation.flags.favorite = favorite;
        }
        if let Some(disabled) = self.disabled {
            conversation.flags.disabled = disabled;
        }
        if let Some(blocked) = self.blocked {
            conversation.flags.blocked = blocked;
        }
    }

    /// Builds a fresh conversation from the patch for ids seen for the first
    /// time through an incremental update.
    pub fn into_conversation(self) -> Conversation {
        Conversation {
            platform: self.platform.unwrap_or_default(),
            display_name: self.display_name.unwrap_or_default(),
            avatar_url: self.avatar_url,
            last_message_preview: self.last_message_preview.unwrap_or_default(),
            last_message_ms: self.last_message_ms.unwrap_or_default(),
            unread_count: self.unread_count.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            flags: Flags {
                favorite: self.favorite.unwrap_or_default(),
                disabled: self.disabled.unwrap_or_default(),
                blocked: self.blocked.unwrap_or_default(),
            },
            key: self.key,
        }
    }
}
