use std::time::Duration;

use crate::{
    backend::decode,
    domain::{conversation::ConversationKey, message::Message},
    usecases::contracts::{with_deadline, Backend, BackendError},
};

/// One merged page of conversation history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    /// True when both endpoints returned fewer rows than the page size,
    /// meaning no older history remains.
    pub exhausted: bool,
}

/// Fetches one history page for a conversation.
///
/// The backend indexes history inconsistently, so the page is requested once
/// per known identifier and the two result sets are unioned; the store's
/// dedupe/sort pass removes the overlap. Rows that fail to decode are
/// dropped individually rather than failing the page.
pub async fn fetch_history_page<B: Backend + ?Sized>(
    backend: &B,
    key: &ConversationKey,
    page: u32,
    page_size: usize,
    request_timeout: Duration,
    now_ms: i64,
) -> Result<HistoryPage, BackendError> {
    let primary = with_deadline(
        request_timeout,
        backend.fetch_history(&key.id, page, page_size),
    )
    .await?;

    let secondary = if key.external_chat_id.is_empty() || key.external_chat_id == key.id {
        Vec::new()
    } else {
        with_deadline(
            request_timeout,
            backend.fetch_history(&key.external_chat_id, page, page_size),
        )
        .await?
    };

    let exhausted = primary.len() < page_size && secondary.len() < page_size;

    let messages = primary
        .iter()
        .chain(secondary.iter())
        .filter_map(|raw| decode::decode_message(raw, now_ms))
        .map(|mut message| {
            if message.conversation_id.is_empty() {
                message.conversation_id = key.id.clone();
            }
            message
        })
        .collect();

    Ok(HistoryPage {
        messages,
        exhausted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stubs::ScriptedBackend;
    use serde_json::json;

    const NOW_MS: i64 = 1_700_000_000_000;
    const TIMEOUT: Duration = Duration::from_secs(15);

    fn row(id: &str, timestamp: i64) -> serde_json::Value {
        json!({"id": id, "timestamp": timestamp, "body": {"text": id}})
    }

    #[tokio::test]
    async fn fetches_both_endpoints_and_unions_results() {
        let backend = ScriptedBackend::default();
        backend.script_history("c1", 1, Ok(vec![row("m1", 100), row("m2", 200)]));
        backend.script_history("wa-77", 1, Ok(vec![row("m2", 200), row("m3", 300)]));

        let page = fetch_history_page(
            &backend,
            &ConversationKey::new("c1", "wa-77"),
            1,
            20,
            TIMEOUT,
            NOW_MS,
        )
        .await
        .expect("page must load");

        // The union still contains the overlap; the store dedupes it.
        assert_eq!(page.messages.len(), 4);
        assert!(page.exhausted);
        assert_eq!(
            *backend.history_calls.lock().expect("calls lock"),
            vec![("c1".to_owned(), 1), ("wa-77".to_owned(), 1)]
        );
    }

    #[tokio::test]
    async fn skips_second_endpoint_without_external_id() {
        let backend = ScriptedBackend::default();
        backend.script_history("c1", 1, Ok(vec![row("m1", 100)]));

        let page = fetch_history_page(
            &backend,
            &ConversationKey::new("c1", ""),
            1,
            20,
            TIMEOUT,
            NOW_MS,
        )
        .await
        .expect("page must load");

        assert_eq!(page.messages.len(), 1);
        assert_eq!(backend.history_call_count(), 1);
    }

    #[tokio::test]
    async fn full_page_from_either_endpoint_means_more_history() {
        let backend = ScriptedBackend::default();
        let full: Vec<_> = (0..3).map(|i| row(&format!("m{i}"), i)).collect();
        backend.script_history("c1", 1, Ok(full));

        let page = fetch_history_page(
            &backend,
            &ConversationKey::new("c1", "wa-77"),
            1,
            3,
            TIMEOUT,
            NOW_MS,
        )
        .await
        .expect("page must load");

        assert!(!page.exhausted);
    }

    #[tokio::test]
    async fn endpoint_failure_fails_the_page() {
        let backend = ScriptedBackend::default();
        backend.script_history("c1", 1, Err(BackendError::Unavailable));

        let result = fetch_history_page(
            &backend,
            &ConversationKey::new("c1", "wa-77"),
            1,
            20,
            TIMEOUT,
            NOW_MS,
        )
        .await;

        assert_eq!(result, Err(BackendError::Unavailable));
    }

    #[tokio::test]
    async fn undecodable_rows_are_dropped_not_fatal() {
        let backend = ScriptedBackend::default();
        backend.script_history(
            "c1",
            1,
            Ok(vec![row("m1", 100), json!({"body": {"text": "no id"}})]),
        );

        let page = fetch_history_page(
            &backend,
            &ConversationKey::new("c1", ""),
            1,
            20,
            TIMEOUT,
            NOW_MS,
        )
        .await
        .expect("page must load");

        assert_eq!(page.messages.len(), 1);
    }

    #[tokio::test]
    async fn missing_conversation_id_is_backfilled_from_key() {
        let backend = ScriptedBackend::default();
        backend.script_history("c1", 1, Ok(vec![row("m1", 100)]));

        let page = fetch_history_page(
            &backend,
            &ConversationKey::new("c1", ""),
            1,
            20,
            TIMEOUT,
            NOW_MS,
        )
        .await
        .expect("page must load");

        assert_eq!(page.messages[0].conversation_id, "c1");
    }
}
