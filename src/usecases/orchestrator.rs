//! The sync engine. Owns the roster, the message store for the open
//! conversation, and the messaging-window timer, and sequences every
//! operation that touches them: bootstrap, open, paginate, send, and push
//! application.

use std::sync::Arc;

use crate::{
    backend::{decode, routes::MediaRoute},
    domain::{
        conversation::{Conversation, ConversationKey, Platform},
        events::PushEvent,
        message::{Attachment, ContentKind, DeliveryState, Direction, Message, Reaction},
        message_store::MessageStore,
        roster::Roster,
    },
    infra::config::SyncConfig,
    usecases::{
        contracts::{with_deadline, Backend, BackendError, Clock, PushSource, SendReceipt},
        open_conversation::fetch_history_page,
        send_message::{
            receipt_is_window_expired, resolve_media_url, validate_text, MediaSource,
            OutboundMedia, SendError,
        },
        window_timer::WindowTimer,
    },
};

const ROSTER_FETCH_FAILED: &str = "ROSTER_FETCH_FAILED";
const HISTORY_FETCH_FAILED: &str = "HISTORY_FETCH_FAILED";
const SEND_ROLLED_BACK: &str = "SEND_ROLLED_BACK";
const WINDOW_EXPIRED_ON_SEND: &str = "WINDOW_EXPIRED_ON_SEND";

/// Lifecycle of the open conversation pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenState {
    #[default]
    Closed,
    Loading,
    Ready,
}

/// User-visible degradations. The engine degrades instead of failing hard;
/// the host drains these and decides how to present them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    RosterFetchFailed,
    HistoryFetchFailed,
    SendFailed,
    UploadFailed,
    WindowExpired,
}

#[derive(Debug, Clone)]
struct OpenConversation {
    key: ConversationKey,
    platform: Platform,
}

pub struct InboxOrchestrator<B: Backend> {
    backend: B,
    clock: Arc<dyn Clock>,
    settings: SyncConfig,
    roster: Roster,
    store: MessageStore,
    open: Option<OpenConversation>,
    open_state: OpenState,
    page: u32,
    history_exhausted: bool,
    timer: WindowTimer,
    /// Timestamp of the newest incoming message; the window deadline is
    /// derived from it and it only ever moves forward.
    window_seed_ms: i64,
    draft: Option<String>,
    next_temp_id: u64,
    notices: Vec<Notice>,
}

impl<B: Backend> InboxOrchestrator<B> {
    /// Requires a running tokio runtime for the window-timer task.
    pub fn new(backend: B, clock: Arc<dyn Clock>, settings: SyncConfig) -> Self {
        let timer = WindowTimer::start(clock.clone());
        Self {
            backend,
            clock,
            settings,
            roster: Roster::default(),
            store: MessageStore::default(),
            open: None,
            open_state: OpenState::default(),
            page: 1,
            history_exhausted: false,
            timer,
            window_seed_ms: 0,
            draft: None,
            next_temp_id: 1,
            notices: Vec::new(),
        }
    }

    /// Initial roster load. A failure leaves the roster empty and records a
    /// notice; the engine stays usable for a retry.
    pub async fn bootstrap_roster(&mut self, filter: Option<&str>) {
        let now = self.clock.now_ms();
        let result = with_deadline(
            self.settings.request_timeout(),
            self.backend.fetch_roster(filter),
        )
        .await;

        match result {
            Ok(rows) => {
                let list: Vec<Conversation> = rows
                    .iter()
                    .filter_map(|raw| decode::decode_conversation(raw, now))
                    .collect();
                self.roster.seed_from_snapshot(list);
            }
            Err(error) => {
                tracing::warn!(code = ROSTER_FETCH_FAILED, ?error, "roster fetch failed");
                self.notices.push(Notice::RosterFetchFailed);
            }
        }
    }

    /// Opens a conversation: zeroes its unread count, loads the first history
    /// page from both identifiers, and arms the window timer. A fetch failure
    /// leaves the pane open and empty with a notice. Returns false when the
    /// id matches nothing in the roster.
    ///
    /// Every fetch is awaited inside this `&mut self` method, so a response
    /// for a superseded selection can never be applied: switching selections
    /// means the previous call either finished first or was cancelled by
    /// dropping its future, and a cancelled fetch has no continuation left
    /// to merge its page. A cancelled call leaves the pane in `Loading`;
    /// the next `select_conversation` replaces it wholesale.
    pub async fn select_conversation(&mut self, candidate_id: &str) -> bool {
        let Some((key, platform, fallback_ms)) = self
            .roster
            .on_conversation_opened(candidate_id)
            .map(|conversation| {
                (
                    conversation.key.clone(),
                    conversation.platform,
                    conversation.last_message_ms,
                )
            })
        else {
            return false;
        };

        self.open = Some(OpenConversation {
            key: key.clone(),
            platform,
        });
        self.open_state = OpenState::Loading;
        self.store.clear();
        self.page = 1;
        self.history_exhausted = false;
        self.draft = None;

        let now = self.clock.now_ms();
        let result = fetch_history_page(
            &self.backend,
            &key,
            1,
            self.settings.page_size,
            self.settings.request_timeout(),
            now,
        )
        .await;

        match result {
            Ok(page) => {
                self.store.replace_page(page.messages);
                self.history_exhausted = page.exhausted;
            }
            Err(error) => {
                tracing::warn!(
                    code = HISTORY_FETCH_FAILED,
                    conversation = %key.id,
                    ?error,
                    "history fetch failed"
                );
                self.store.clear();
                // No way to know whether older pages exist; stop paginating.
                self.history_exhausted = true;
                self.notices.push(Notice::HistoryFetchFailed);
            }
        }
        self.open_state = OpenState::Ready;

        self.window_seed_ms = self
            .store
            .messages()
            .iter()
            .filter(|message| message.direction == Direction::Incoming)
            .map(|message| message.timestamp_ms)
            .max()
            .unwrap_or(fallback_ms);
        self.timer
            .reset(self.settings.window_secs(platform), self.window_seed_ms);

        true
    }

    /// Fetches the next older page and merges it under the loaded history.
    /// Returns whether anything was fetched; exhausted history short-circuits
    /// without a backend call. `&mut self` keeps loads from overlapping, and
    /// the page counter only advances once a page has actually merged, so a
    /// dropped call is simply retried.
    pub async fn load_older_messages(&mut self) -> bool {
        if self.open_state != OpenState::Ready || self.history_exhausted {
            return false;
        }
        let Some(open) = self.open.clone() else {
            return false;
        };

        let next_page = self.page + 1;
        let now = self.clock.now_ms();

        let result = fetch_history_page(
            &self.backend,
            &open.key,
            next_page,
            self.settings.page_size,
            self.settings.request_timeout(),
            now,
        )
        .await;

        match result {
            Ok(page) => {
                self.page = next_page;
                self.store.prepend_page(page.messages);
                self.history_exhausted = page.exhausted;
                true
            }
            Err(error) => {
                tracing::warn!(
                    code = HISTORY_FETCH_FAILED,
                    conversation = %open.key.id,
                    page = next_page,
                    ?error,
                    "older history fetch failed"
                );
                self.notices.push(Notice::HistoryFetchFailed);
                false
            }
        }
    }

    /// Sends a text message optimistically: the message appears immediately
    /// with a provisional id, then is reconciled with the server receipt or
    /// rolled back with the text restored as a draft.
    pub async fn send_text(&mut self, text: &str) -> Result<(), SendError> {
        let trimmed = validate_text(text)?.to_owned();
        let open = self.ready_conversation()?;
        self.preflight_window(open.platform)?;

        let now = self.clock.now_ms();
        let temp_id = self.mint_temp_id();
        let message = Message {
            id: temp_id.clone(),
            conversation_id: open.key.id.clone(),
            direction: Direction::Outgoing,
            kind: ContentKind::Text,
            text: trimmed.clone(),
            attachment: None,
            elements: None,
            timestamp_ms: now,
            delivery_state: DeliveryState::Unknown,
            reactions: Vec::new(),
        };
        let preview = message.preview();
        self.store.append_live(message);

        let result = with_deadline(
            self.settings.request_timeout(),
            self.backend
                .send_text(&open.key.id, &open.key.external_chat_id, &trimmed),
        )
        .await;

        self.finish_send(result, temp_id, text.to_owned(), preview, now, &open.key)
    }

    /// Sends a media message through the platform route for its kind,
    /// uploading the file first when the source is not already hosted.
    pub async fn send_media(
        &mut self,
        media: OutboundMedia,
        caption: Option<String>,
    ) -> Result<(), SendError> {
        let open = self.ready_conversation()?;
        let route = MediaRoute::select(open.platform, media.kind)
            .ok_or(SendError::UnsupportedMediaKind)?;
        self.preflight_window(open.platform)?;

        let filename = match &media.source {
            MediaSource::File { filename, .. } => Some(filename.clone()),
            MediaSource::Url(_) => None,
        };
        let url = match resolve_media_url(
            &self.backend,
            self.settings.request_timeout(),
            media.source,
        )
        .await
        {
            Ok(url) => url,
            Err(error) => {
                tracing::warn!(code = SEND_ROLLED_BACK, ?error, "media upload failed");
                self.notices.push(Notice::UploadFailed);
                return Err(SendError::UploadFailed);
            }
        };

        let now = self.clock.now_ms();
        let temp_id = self.mint_temp_id();
        let message = Message {
            id: temp_id.clone(),
            conversation_id: open.key.id.clone(),
            direction: Direction::Outgoing,
            kind: media.kind,
            text: caption.clone().unwrap_or_default(),
            attachment: Some(Attachment {
                url: url.clone(),
                caption: caption.clone(),
                filename,
                filesize: None,
            }),
            elements: None,
            timestamp_ms: now,
            delivery_state: DeliveryState::Unknown,
            reactions: Vec::new(),
        };
        let preview = message.preview();
        self.store.append_live(message);

        let result = with_deadline(
            self.settings.request_timeout(),
            self.backend.send_media(
                route,
                &open.key.id,
                &open.key.external_chat_id,
                &url,
                caption.as_deref(),
            ),
        )
        .await;

        self.finish_send(
            result,
            temp_id,
            caption.unwrap_or_default(),
            preview,
            now,
            &open.key,
        )
    }

    /// Applies one decoded push event. Events for conversations other than
    /// the open one only touch the roster; unknown references are dropped.
    pub fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::NewMessage {
                conversation_ids,
                message,
            } => self.on_new_message(conversation_ids, &message),
            PushEvent::RosterSnapshot { partial, entries } => {
                let now = self.clock.now_ms();
                if partial {
                    let patches = entries
                        .iter()
                        .filter_map(|raw| decode::decode_conversation_patch(raw, now))
                        .collect();
                    self.roster.apply_incremental_update(patches);
                } else {
                    let list = entries
                        .iter()
                        .filter_map(|raw| decode::decode_conversation(raw, now))
                        .collect();
                    self.roster.apply_full_snapshot(list);
                }
            }
            PushEvent::DeliveryStatusUpdated {
                conversation_ids,
                message_id,
                status,
            } => {
                if self.is_open_conversation(&conversation_ids) {
                    self.store
                        .apply_delivery_status(&message_id, DeliveryState::parse(&status));
                }
            }
            PushEvent::NewReaction {
                conversation_ids,
                message_id,
                emoji,
                reactor,
            } => {
                if self.is_open_conversation(&conversation_ids) {
                    self.store.add_reaction(&message_id, Reaction { emoji, reactor });
                }
            }
        }
    }

    /// Drains a push source, applying every queued event. Returns how many
    /// events were applied.
    pub fn pump_push<P: PushSource>(&mut self, source: &mut P) -> anyhow::Result<usize> {
        let mut applied = 0;
        while let Some(event) = source.next_event()? {
            self.handle_push(event);
            applied += 1;
        }
        Ok(applied)
    }

    /// Closes the open conversation and disarms the window timer.
    pub fn close_conversation(&mut self) {
        self.open = None;
        self.open_state = OpenState::Closed;
        self.store.clear();
        self.roster.clear_selection();
        self.page = 1;
        self.history_exhausted = false;
        self.window_seed_ms = 0;
        self.timer.clear();
    }

    pub fn open_state(&self) -> OpenState {
        self.open_state
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn history_exhausted(&self) -> bool {
        self.history_exhausted
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.timer.remaining_seconds()
    }

    pub fn send_disabled(&self) -> bool {
        self.timer.send_disabled()
    }

    /// Receiver for the once-per-second countdown of the open conversation's
    /// messaging window.
    pub fn subscribe_remaining(&self) -> tokio::sync::watch::Receiver<u64> {
        self.timer.subscribe()
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn take_draft(&mut self) -> Option<String> {
        self.draft.take()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn on_new_message(&mut self, mut ids: Vec<String>, raw: &serde_json::Value) {
        let now = self.clock.now_ms();
        let Some(decoded) = decode::decode_message(raw, now) else {
            return;
        };
        if !decoded.conversation_id.is_empty() && !ids.contains(&decoded.conversation_id) {
            ids.push(decoded.conversation_id.clone());
        }
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        let selected = self
            .open
            .as_ref()
            .is_some_and(|open| open.key.matches_any(id_refs.iter().copied()));
        let incoming = decoded.direction == Direction::Incoming;
        let preview = decoded.preview();
        let timestamp_ms = decoded.timestamp_ms;

        self.roster
            .on_new_message_event(&id_refs, preview, timestamp_ms, incoming);

        if selected && self.open_state == OpenState::Ready {
            let added = self.store.append_live(decoded);
            if added && incoming {
                if timestamp_ms > self.window_seed_ms {
                    self.window_seed_ms = timestamp_ms;
                }
                if let Some(open) = &self.open {
                    self.timer
                        .reset(self.settings.window_secs(open.platform), self.window_seed_ms);
                }
            }
        }
    }

    fn finish_send(
        &mut self,
        result: Result<SendReceipt, BackendError>,
        temp_id: String,
        composed: String,
        preview: String,
        timestamp_ms: i64,
        key: &ConversationKey,
    ) -> Result<(), SendError> {
        match result {
            Ok(receipt) if receipt.ok => {
                let permanent_id = receipt.message_id.unwrap_or_else(|| temp_id.clone());
                let state = receipt
                    .status
                    .as_deref()
                    .map(DeliveryState::parse)
                    .filter(|state| *state != DeliveryState::Unknown)
                    .unwrap_or(DeliveryState::Sent);
                self.store
                    .reconcile_optimistic(&temp_id, &permanent_id, state);
                self.roster.on_new_message_event(
                    &[key.id.as_str(), key.external_chat_id.as_str()],
                    preview,
                    timestamp_ms,
                    false,
                );
                Ok(())
            }
            Ok(receipt) if receipt_is_window_expired(&receipt) => {
                tracing::info!(
                    code = WINDOW_EXPIRED_ON_SEND,
                    conversation = %key.id,
                    "server reported the messaging window closed"
                );
                self.rollback_send(&temp_id, composed);
                self.timer.force_expired();
                self.notices.push(Notice::WindowExpired);
                Err(SendError::WindowExpired)
            }
            Ok(receipt) => {
                tracing::warn!(
                    code = SEND_ROLLED_BACK,
                    conversation = %key.id,
                    status = receipt.status.as_deref().unwrap_or(""),
                    "send rejected"
                );
                self.rollback_send(&temp_id, composed);
                self.notices.push(Notice::SendFailed);
                Err(SendError::Transport)
            }
            Err(error) => {
                tracing::warn!(
                    code = SEND_ROLLED_BACK,
                    conversation = %key.id,
                    ?error,
                    "send failed"
                );
                self.rollback_send(&temp_id, composed);
                self.notices.push(Notice::SendFailed);
                Err(SendError::Transport)
            }
        }
    }

    fn rollback_send(&mut self, temp_id: &str, composed: String) {
        self.store.remove(temp_id);
        self.draft = Some(composed);
    }

    fn ready_conversation(&self) -> Result<OpenConversation, SendError> {
        if self.open_state != OpenState::Ready {
            return Err(SendError::NoConversationOpen);
        }
        self.open.clone().ok_or(SendError::NoConversationOpen)
    }

    /// Re-derives the window from the newest incoming message before every
    /// send; a stale timer must never let an expired send through.
    fn preflight_window(&mut self, platform: Platform) -> Result<(), SendError> {
        self.timer
            .reset(self.settings.window_secs(platform), self.window_seed_ms);
        if self.timer.send_disabled() {
            tracing::info!(code = WINDOW_EXPIRED_ON_SEND, "send blocked, window closed");
            self.notices.push(Notice::WindowExpired);
            return Err(SendError::WindowExpired);
        }
        Ok(())
    }

    fn is_open_conversation(&self, candidate_ids: &[String]) -> bool {
        self.open.as_ref().is_some_and(|open| {
            open.key
                .matches_any(candidate_ids.iter().map(String::as_str))
        })
    }

    fn mint_temp_id(&mut self) -> String {
        let id = format!("local-{}", self.next_temp_id);
        self.next_temp_id += 1;
        id
    }
}
