//! In-memory backend and push-source implementations.
//!
//! Used by the engine tests and by hosts that want to exercise the inbox
//! without a network stack: every call is scripted up front and captured for
//! inspection.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    backend::routes::MediaRoute,
    domain::events::PushEvent,
    usecases::contracts::{Backend, BackendError, Clock, PushSource, SendReceipt},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSendCall {
    pub conversation_id: String,
    pub recipient_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSendCall {
    pub route: MediaRoute,
    pub conversation_id: String,
    pub url: String,
    pub caption: Option<String>,
}

#[derive(Default)]
pub struct ScriptedBackend {
    roster: Mutex<Option<Result<Vec<Value>, BackendError>>>,
    history: Mutex<HashMap<(String, u32), Result<Vec<Value>, BackendError>>>,
    send_results: Mutex<VecDeque<Result<SendReceipt, BackendError>>>,
    upload_result: Mutex<Option<Result<String, BackendError>>>,
    pub history_calls: Mutex<Vec<(String, u32)>>,
    pub text_calls: Mutex<Vec<TextSendCall>>,
    pub media_calls: Mutex<Vec<MediaSendCall>>,
}

impl ScriptedBackend {
    pub fn script_roster(&self, result: Result<Vec<Value>, BackendError>) {
        *self.roster.lock().expect("roster lock") = Some(result);
    }

    pub fn script_history(
        &self,
        conversation_key: &str,
        page: u32,
        result: Result<Vec<Value>, BackendError>,
    ) {
        self.history
            .lock()
            .expect("history lock")
            .insert((conversation_key.to_owned(), page), result);
    }

    pub fn queue_send_result(&self, result: Result<SendReceipt, BackendError>) {
        self.send_results
            .lock()
            .expect("send results lock")
            .push_back(result);
    }

    pub fn script_upload(&self, result: Result<String, BackendError>) {
        *self.upload_result.lock().expect("upload lock") = Some(result);
    }

    pub fn history_call_count(&self) -> usize {
        self.history_calls.lock().expect("history calls lock").len()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn fetch_roster(&self, _filter: Option<&str>) -> Result<Vec<Value>, BackendError> {
        self.roster
            .lock()
            .expect("roster lock")
            .clone()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn fetch_history(
        &self,
        conversation_key: &str,
        page: u32,
        _page_size: usize,
    ) -> Result<Vec<Value>, BackendError> {
        self.history_calls
            .lock()
            .expect("history calls lock")
            .push((conversation_key.to_owned(), page));

        self.history
            .lock()
            .expect("history lock")
            .get(&(conversation_key.to_owned(), page))
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn send_text(
        &self,
        conversation_id: &str,
        recipient_id: &str,
        text: &str,
    ) -> Result<SendReceipt, BackendError> {
        self.text_calls
            .lock()
            .expect("text calls lock")
            .push(TextSendCall {
                conversation_id: conversation_id.to_owned(),
                recipient_id: recipient_id.to_owned(),
                text: text.to_owned(),
            });

        self.next_send_result()
    }

    async fn send_media(
        &self,
        route: MediaRoute,
        conversation_id: &str,
        _recipient_id: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<SendReceipt, BackendError> {
        self.media_calls
            .lock()
            .expect("media calls lock")
            .push(MediaSendCall {
                route,
                conversation_id: conversation_id.to_owned(),
                url: url.to_owned(),
                caption: caption.map(str::to_owned),
            });

        self.next_send_result()
    }

    async fn upload_media(&self, _filename: &str, _bytes: &[u8]) -> Result<String, BackendError> {
        self.upload_result
            .lock()
            .expect("upload lock")
            .clone()
            .unwrap_or_else(|| Ok("https://cdn.example/upload".to_owned()))
    }
}

impl ScriptedBackend {
    fn next_send_result(&self) -> Result<SendReceipt, BackendError> {
        self.send_results
            .lock()
            .expect("send results lock")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(SendReceipt {
                    ok: true,
                    message_id: Some("srv-1".to_owned()),
                    status: Some("sent".to_owned()),
                })
            })
    }
}

/// Clock with a settable instant, for deterministic window math.
#[derive(Debug, Default)]
pub struct FixedClock {
    now_ms: AtomicI64,
}

impl FixedClock {
    pub fn at(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Pre-queued push events, drained in order.
#[derive(Debug, Default)]
pub struct QueuePushSource {
    events: VecDeque<PushEvent>,
}

impl QueuePushSource {
    pub fn with_events(events: impl IntoIterator<Item = PushEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

impl PushSource for QueuePushSource {
    fn next_event(&mut self) -> anyhow::Result<Option<PushEvent>> {
        Ok(self.events.pop_front())
    }
}
