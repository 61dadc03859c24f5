use std::collections::HashSet;

use crate::domain::message::{DeliveryState, Message, Reaction};

/// Ordered, deduplicated message collection for the open conversation.
///
/// History pages fetched by the two identifiers of the same conversation can
/// overlap, and push events can race the fetch that would have delivered the
/// same message, so every merge path runs through the same dedupe-then-sort
/// step. Dedup key is the message id (first occurrence wins); order is
/// timestamp ascending with insertion order preserved on ties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Wholesale replacement for the first page of a freshly opened
    /// conversation.
    pub fn replace_page(&mut self, page: Vec<Message>) {
        self.messages = normalize(page);
    }

    /// Merges an older-history page into the existing set. Existing entries
    /// win on id conflicts so a reconciled optimistic message is never
    /// clobbered by a stale page row.
    pub fn prepend_page(&mut self, page: Vec<Message>) {
        let mut combined = std::mem::take(&mut self.messages);
        combined.extend(page);
        self.messages = normalize(combined);
    }

    /// Inserts a live (push or optimistic) message. Idempotent: a message
    /// whose id is already present is a no-op. Returns whether it was added.
    pub fn append_live(&mut self, message: Message) -> bool {
        if self.position(&message.id).is_some() {
            return false;
        }
        self.messages.push(message);
        sort_stable(&mut self.messages);
        true
    }

    /// Replaces a provisional message's id and delivery state in place.
    /// Idempotent: once the permanent id is present, a repeat call only
    /// reasserts the delivery state.
    pub fn reconcile_optimistic(
        &mut self,
        temp_id: &str,
        permanent_id: &str,
        new_state: DeliveryState,
    ) -> bool {
        if let Some(index) = self.position(temp_id) {
            self.messages[index].id = permanent_id.to_owned();
            self.messages[index].delivery_state = new_state;
            return true;
        }

        if let Some(index) = self.position(permanent_id) {
            self.messages[index].delivery_state = new_state;
            return true;
        }

        false
    }

    /// Removes a message (failed optimistic send rollback).
    pub fn remove(&mut self, id: &str) -> Option<Message> {
        let index = self.position(id)?;
        Some(self.messages.remove(index))
    }

    pub fn apply_delivery_status(&mut self, message_id: &str, state: DeliveryState) -> bool {
        match self.position(message_id) {
            Some(index) => {
                self.messages[index].delivery_state = state;
                true
            }
            None => false,
        }
    }

    pub fn add_reaction(&mut self, message_id: &str, reaction: Reaction) -> bool {
        match self.position(message_id) {
            Some(index) => {
                self.messages[index].reactions.push(reaction);
                true
            }
            None => false,
        }
    }

    pub fn newest_timestamp_ms(&self) -> Option<i64> {
        self.messages.last().map(|message| message.timestamp_ms)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|message| message.id == id)
    }
}

fn normalize(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    let mut deduped: Vec<Message> = messages
        .into_iter()
        .filter(|message| seen.insert(message.id.clone()))
        .collect();
    sort_stable(&mut deduped);
    deduped
}

fn sort_stable(messages: &mut [Message]) {
    messages.sort_by_key(|message| message.timestamp_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::{ContentKind, Direction};

    fn message(id: &str, timestamp_ms: i64) -> Message {
        Message {
            id: id.to_owned(),
            conversation_id: "c1".to_owned(),
            direction: Direction::Incoming,
            kind: ContentKind::Text,
            text: format!("msg {id}"),
            attachment: None,
            elements: None,
            timestamp_ms,
            delivery_state: DeliveryState::Unknown,
            reactions: Vec::new(),
        }
    }

    fn ids(store: &MessageStore) -> Vec<&str> {
        store
            .messages()
            .iter()
            .map(|message| message.id.as_str())
            .collect()
    }

    fn assert_invariants(store: &MessageStore) {
        let mut seen = HashSet::new();
        let mut previous = i64::MIN;
        for message in store.messages() {
            assert!(seen.insert(&message.id), "duplicate id {}", message.id);
            assert!(message.timestamp_ms >= previous, "order violated");
            previous = message.timestamp_ms;
        }
    }

    #[test]
    fn replace_page_sorts_and_dedupes() {
        let mut store = MessageStore::default();

        store.replace_page(vec![
            message("b", 200),
            message("a", 100),
            message("b", 200),
            message("c", 150),
        ]);

        assert_eq!(ids(&store), vec!["a", "c", "b"]);
        assert_invariants(&store);
    }

    #[test]
    fn prepend_page_merges_without_duplicates() {
        let mut store = MessageStore::default();
        store.replace_page(vec![message("c", 300), message("d", 400)]);

        store.prepend_page(vec![message("a", 100), message("b", 200), message("c", 300)]);

        assert_eq!(ids(&store), vec!["a", "b", "c", "d"]);
        assert_invariants(&store);
    }

    #[test]
    fn prepend_page_keeps_existing_entry_on_id_conflict() {
        let mut store = MessageStore::default();
        let mut reconciled = message("m1", 300);
        reconciled.delivery_state = DeliveryState::Read;
        store.replace_page(vec![reconciled]);

        store.prepend_page(vec![message("m1", 300)]);

        assert_eq!(store.messages()[0].delivery_state, DeliveryState::Read);
    }

    #[test]
    fn append_live_is_idempotent_on_id() {
        let mut store = MessageStore::default();

        assert!(store.append_live(message("a", 100)));
        assert!(!store.append_live(message("a", 100)));

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn append_live_inserts_in_timestamp_order() {
        let mut store = MessageStore::default();
        store.replace_page(vec![message("a", 100), message("c", 300)]);

        store.append_live(message("b", 200));

        assert_eq!(ids(&store), vec!["a", "b", "c"]);
        assert_invariants(&store);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut store = MessageStore::default();

        store.append_live(message("first", 100));
        store.append_live(message("second", 100));
        store.append_live(message("third", 100));

        assert_eq!(ids(&store), vec!["first", "second", "third"]);
    }

    #[test]
    fn interleaved_operations_keep_invariants() {
        let mut store = MessageStore::default();

        store.replace_page(vec![message("e", 500), message("f", 600)]);
        store.append_live(message("g", 700));
        store.prepend_page(vec![message("a", 100), message("e", 500)]);
        store.append_live(message("d", 400));
        store.prepend_page(vec![message("b", 200), message("c", 300)]);

        assert_eq!(ids(&store), vec!["a", "b", "c", "d", "e", "f", "g"]);
        assert_invariants(&store);
    }

    #[test]
    fn reconcile_replaces_id_and_state_in_place() {
        let mut store = MessageStore::default();
        store.replace_page(vec![message("a", 100), message("local-1", 200)]);

        let changed = store.reconcile_optimistic("local-1", "srv-9", DeliveryState::Sent);

        assert!(changed);
        assert_eq!(ids(&store), vec!["a", "srv-9"]);
        assert_eq!(store.messages()[1].delivery_state, DeliveryState::Sent);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut store = MessageStore::default();
        store.replace_page(vec![message("local-1", 200)]);

        store.reconcile_optimistic("local-1", "srv-9", DeliveryState::Sent);
        let snapshot = store.clone();
        store.reconcile_optimistic("local-1", "srv-9", DeliveryState::Sent);

        assert_eq!(store, snapshot);
    }

    #[test]
    fn reconcile_unknown_ids_is_a_noop() {
        let mut store = MessageStore::default();
        store.replace_page(vec![message("a", 100)]);

        assert!(!store.reconcile_optimistic("local-x", "srv-x", DeliveryState::Sent));
        assert_eq!(ids(&store), vec!["a"]);
    }

    #[test]
    fn remove_returns_the_message() {
        let mut store = MessageStore::default();
        store.replace_page(vec![message("a", 100), message("b", 200)]);

        let removed = store.remove("a").expect("message must be removed");

        assert_eq!(removed.id, "a");
        assert_eq!(ids(&store), vec!["b"]);
    }

    #[test]
    fn delivery_status_advances_matching_message() {
        let mut store = MessageStore::default();
        store.replace_page(vec![message("a", 100)]);

        assert!(store.apply_delivery_status("a", DeliveryState::Read));
        assert!(!store.apply_delivery_status("zzz", DeliveryState::Read));

        assert_eq!(store.messages()[0].delivery_state, DeliveryState::Read);
    }

    #[test]
    fn reactions_append_in_order() {
        let mut store = MessageStore::default();
        store.replace_page(vec![message("a", 100)]);

        store.add_reaction(
            "a",
            Reaction {
                emoji: "👍".to_owned(),
                reactor: None,
            },
        );
        store.add_reaction(
            "a",
            Reaction {
                emoji: "❤".to_owned(),
                reactor: Some("u2".to_owned()),
            },
        );

        let reactions = &store.messages()[0].reactions;
        assert_eq!(reactions.len(), 2);
        assert_eq!(reactions[0].emoji, "👍");
    }

    #[test]
    fn newest_timestamp_tracks_the_tail() {
        let mut store = MessageStore::default();
        assert_eq!(store.newest_timestamp_ms(), None);

        store.replace_page(vec![message("a", 100), message("b", 200)]);

        assert_eq!(store.newest_timestamp_ms(), Some(200));
    }
}
