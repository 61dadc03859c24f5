use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;

use crate::{backend::routes::MediaRoute, domain::events::PushEvent};

/// Failures a backend call can surface. One timeout-and-fail-fast policy
/// applies to every call; there is no automatic retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    Unauthorized,
    Unavailable,
    Timeout,
    Rejected { status: String },
}

/// Outcome of a send call. `status` carries the server's verdict verbatim;
/// a non-ok receipt with an "expired" status means the messaging window
/// closed server-side before we heard about it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SendReceipt {
    pub ok: bool,
    pub message_id: Option<String>,
    pub status: Option<String>,
}

/// The REST surface of the messaging backend. History must be fetched once
/// per known conversation identifier and the results unioned, because the
/// endpoints disagree about which identifier they index by.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch_roster(&self, filter: Option<&str>) -> Result<Vec<Value>, BackendError>;

    async fn fetch_history(
        &self,
        conversation_key: &str,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<Value>, BackendError>;

    async fn send_text(
        &self,
        conversation_id: &str,
        recipient_id: &str,
        text: &str,
    ) -> Result<SendReceipt, BackendError>;

    async fn send_media(
        &self,
        route: MediaRoute,
        conversation_id: &str,
        recipient_id: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<SendReceipt, BackendError>;

    async fn upload_media(&self, filename: &str, bytes: &[u8]) -> Result<String, BackendError>;
}

/// Injected time source; everything that reads "now" goes through this so the
/// engine is testable without wall-clock sleeps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// Decoded push-event feed. The host pulls events and hands them to the
/// orchestrator; dropping the source is the unsubscribe.
pub trait PushSource {
    fn next_event(&mut self) -> anyhow::Result<Option<PushEvent>>;
}

/// Applies the fail-fast request deadline to a backend call.
pub async fn with_deadline<T>(
    limit: Duration,
    call: impl std::future::Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout),
    }
}
