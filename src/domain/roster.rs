use std::collections::HashMap;

use crate::domain::conversation::{Conversation, ConversationKey, ConversationPatch};

/// The inbox sidebar: conversation summaries ordered by recency.
///
/// Unread counts are owned locally. The override map records what this client
/// believes each count to be; server snapshots never win over it for a
/// conversation that is already tracked, so a full roster refresh cannot
/// resurrect a count the user just cleared. The sole increment path is an
/// incoming push for a non-selected conversation, and the sole reset path is
/// opening the conversation.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    conversations: Vec<Conversation>,
    unread_overrides: HashMap<String, u32>,
    selected: Option<ConversationKey>,
}

impl Roster {
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn selected(&self) -> Option<&ConversationKey> {
        self.selected.as_ref()
    }

    pub fn find(&self, candidate_id: &str) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.key.matches_id(candidate_id))
    }

    pub fn unread_count(&self, candidate_id: &str) -> Option<u32> {
        self.find(candidate_id)
            .map(|conversation| conversation.unread_count)
    }

    /// Initial load. Server-reported unread counts seed the override map, but
    /// only for ids not already tracked locally.
    pub fn seed_from_snapshot(&mut self, list: Vec<Conversation>) {
        for conversation in &list {
            self.unread_overrides
                .entry(conversation.key.id.clone())
                .or_insert(conversation.unread_count);
        }
        self.conversations = list;
        self.reapply_unread_policy();
        self.sort_by_recency();
    }

    /// Server-pushed full roster refresh. Unread comes from the local
    /// override (forced to 0 for the selected conversation), never from the
    /// snapshot itself; ids never seen before are seeded like an initial load.
    pub fn apply_full_snapshot(&mut self, list: Vec<Conversation>) {
        for conversation in &list {
            self.unread_overrides
                .entry(conversation.key.id.clone())
                .or_insert(conversation.unread_count);
        }
        self.conversations = list;
        self.reapply_unread_policy();
        self.sort_by_recency();
    }

    /// Server-pushed partial patch: field-by-field merge, same unread
    /// precedence rule.
    pub fn apply_incremental_update(&mut self, patches: Vec<ConversationPatch>) {
        for patch in patches {
            match self.position(&patch.key) {
                Some(index) => patch.merge_into(&mut self.conversations[index]),
                None => {
                    let conversation = patch.into_conversation();
                    self.unread_overrides
                        .entry(conversation.key.id.clone())
                        .or_insert(conversation.unread_count);
                    self.conversations.push(conversation);
                }
            }
        }
        self.reapply_unread_policy();
        self.sort_by_recency();
    }

    /// Applies a new-message push to the matching conversation's preview and
    /// timestamp. Incoming messages for a non-selected conversation increment
    /// unread by exactly 1; this is the only increment path. Returns whether
    /// a conversation matched.
    pub fn on_new_message_event(
        &mut self,
        candidate_ids: &[&str],
        preview: String,
        timestamp_ms: i64,
        incoming: bool,
    ) -> bool {
        let Some(index) = self
            .conversations
            .iter()
            .position(|conversation| conversation.key.matches_any(candidate_ids.iter().copied()))
        else {
            return false;
        };

        let selected = self
            .selected
            .as_ref()
            .is_some_and(|key| key.matches(&self.conversations[index].key));

        let conversation = &mut self.conversations[index];
        conversation.last_message_preview = preview;
        conversation.last_message_ms = timestamp_ms;

        if incoming && !selected {
            conversation.unread_count += 1;
            self.unread_overrides
                .insert(conversation.key.id.clone(), conversation.unread_count);
        }

        self.sort_by_recency();
        true
    }

    /// Marks the conversation as selected and zeroes its unread count in both
    /// the entry and the override map; this is the only reset path. Returns
    /// the matched conversation.
    pub fn on_conversation_opened(&mut self, candidate_id: &str) -> Option<&Conversation> {
        let index = self
            .conversations
            .iter()
            .position(|conversation| conversation.key.matches_id(candidate_id))?;

        let conversation = &mut self.conversations[index];
        conversation.unread_count = 0;
        self.unread_overrides.insert(conversation.key.id.clone(), 0);
        self.selected = Some(conversation.key.clone());

        Some(&self.conversations[index])
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    fn position(&self, key: &ConversationKey) -> Option<usize> {
        self.conversations
            .iter()
            .position(|conversation| conversation.key.matches(key))
    }

    fn reapply_unread_policy(&mut self) {
        for conversation in &mut self.conversations {
            let selected = self
                .selected
                .as_ref()
                .is_some_and(|key| key.matches(&conversation.key));

            if selected {
                conversation.unread_count = 0;
                self.unread_overrides.insert(conversation.key.id.clone(), 0);
            } else if let Some(tracked) = self.unread_overrides.get(&conversation.key.id) {
                conversation.unread_count = *tracked;
            }
        }
    }

    fn sort_by_recency(&mut self) {
        self.conversations
            .sort_by(|a, b| b.last_message_ms.cmp(&a.last_message_ms));
    }
}
