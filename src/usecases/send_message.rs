//! Building blocks of the outbound send protocol: text validation, media
//! resolution, and interpretation of server send verdicts. The optimistic
//! append/reconcile/rollback sequencing lives in the orchestrator.

use std::time::Duration;

use crate::{
    domain::message::ContentKind,
    usecases::contracts::{with_deadline, Backend, BackendError, SendReceipt},
};

/// Reasons a send is refused or rolled back, surfaced to the compose UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Text is empty after trimming whitespace.
    EmptyMessage,
    /// No conversation is open and ready.
    NoConversationOpen,
    /// The messaging window has expired; only a template message can go out.
    WindowExpired,
    /// The kind has no media route (text, carousel, interactive).
    UnsupportedMediaKind,
    /// The media upload failed before any send was attempted.
    UploadFailed,
    /// The backend rejected the send or was unreachable.
    Transport,
}

/// Where the outbound media comes from: an already-hosted URL or a local
/// file that must be uploaded first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Url(String),
    File { filename: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMedia {
    pub kind: ContentKind,
    pub source: MediaSource,
}

pub fn validate_text(text: &str) -> Result<&str, SendError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SendError::EmptyMessage);
    }
    Ok(trimmed)
}

/// The server may report a window closure in the response body rather than
/// as a transport failure.
pub fn receipt_is_window_expired(receipt: &SendReceipt) -> bool {
    !receipt.ok
        && receipt
            .status
            .as_deref()
            .is_some_and(|status| status.to_ascii_lowercase().contains("expired"))
}

/// Resolves the media source to a hosted URL, uploading when needed.
pub async fn resolve_media_url<B: Backend + ?Sized>(
    backend: &B,
    request_timeout: Duration,
    source: MediaSource,
) -> Result<String, BackendError> {
    match source {
        MediaSource::Url(url) => Ok(url),
        MediaSource::File { filename, bytes } => {
            with_deadline(request_timeout, backend.upload_media(&filename, &bytes)).await
        }
    }
}
