//! The submit flow: ask the backend, then record the exchange.

use tracing::{info, warn};

use crate::backend::{QueryMode, QueryService};
use crate::common::errors::{SidekickError, SidekickResult};
use crate::conversations::{ConversationStore, Turn};

/// Ask `service` about `text` and append the answer to the active conversation.
///
/// A failed query leaves the store untouched.
///
/// # Errors
/// Returns an error if `text` is blank or the backend call fails.
pub fn ask(
    store: &mut ConversationStore,
    service: &dyn QueryService,
    text: &str,
    mode: QueryMode,
) -> SidekickResult<Turn> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SidekickError::InvalidQuery("query text is empty".to_string()));
    }

    let answer = service.query(text, mode).inspect_err(|e| {
        warn!(%mode, "Query failed: {e}");
    })?;
    info!(%mode, sources = answer.sources.len(), "Query answered");

    Ok(store.append_turn(text, answer.response, answer.sources))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::backend::QueryAnswer;
    use crate::common::clock::ManualClock;
    use crate::common::config::NamingConfig;
    use crate::conversations::NamePolicy;
    use crate::storage::MemoryStorage;

    /// Replays a canned answer and records what it was asked.
    struct ScriptedService {
        answer: Option<QueryAnswer>,
        seen: Mutex<Vec<(String, QueryMode)>>,
    }

    impl ScriptedService {
        fn answering(response: &str, sources: &[&str]) -> Self {
            Self {
                answer: Some(QueryAnswer {
                    response: response.to_string(),
                    sources: sources.iter().map(ToString::to_string).collect(),
                }),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl QueryService for ScriptedService {
        fn query(&self, text: &str, mode: QueryMode) -> SidekickResult<QueryAnswer> {
            self.seen.lock().unwrap().push((text.to_string(), mode));
            self.answer.clone().ok_or(SidekickError::Backend {
                status: 503,
                body: "index rebuilding".to_string(),
            })
        }
    }

    fn store() -> (ConversationStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = ConversationStore::open(
            Box::new(Arc::clone(&storage)),
            Box::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            )),
            NamePolicy::new(&NamingConfig::default()).unwrap(),
        );
        (store, storage)
    }

    #[test]
    fn test_ask_records_answer_and_citations() {
        let (mut store, _) = store();
        let service = ScriptedService::answering("A vector database...", &["doc-3", "doc-9"]);

        let turn = ask(&mut store, &service, "  what's a vector db? ", QueryMode::Followup).unwrap();

        assert_eq!(turn.prompt, "what's a vector db?");
        assert_eq!(turn.sources, vec!["doc-3", "doc-9"]);
        assert_eq!(store.active_history(), &[turn]);
        assert_eq!(
            service.seen.lock().unwrap().as_slice(),
            &[("what's a vector db?".to_string(), QueryMode::Followup)]
        );
    }

    #[test]
    fn test_failed_query_leaves_store_untouched() {
        let (mut store, storage) = store();
        let before = storage.snapshot();
        let service = ScriptedService::failing();

        let result = ask(&mut store, &service, "hello", QueryMode::Explain);

        assert!(matches!(result, Err(SidekickError::Backend { status: 503, .. })));
        assert!(store.active_history().is_empty());
        assert_eq!(storage.snapshot(), before);
    }

    #[test]
    fn test_blank_text_never_reaches_backend() {
        let (mut store, _) = store();
        let service = ScriptedService::answering("unused", &[]);

        assert!(matches!(
            ask(&mut store, &service, "   ", QueryMode::Explain),
            Err(SidekickError::InvalidQuery(_))
        ));
        assert!(service.seen.lock().unwrap().is_empty());
    }
}
