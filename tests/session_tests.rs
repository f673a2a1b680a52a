use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::{Notify, oneshot};

use ghosteye::data_models::*;
use ghosteye::error::SearchError;
use ghosteye::gemini::SearchBackend;
use ghosteye::session::{SearchOutcome, SearchSession};
use ghosteye::state::{StateStore, UiState};

mod test_helpers {
    use super::*;

    pub fn reply_for(query: &str) -> BackendReply {
        BackendReply {
            text: format!(
                "```json\n{{\"items\":[{{\"id\":\"1\",\"title\":\"{query}\",\"type\":\"username\"}}]}}\n```"
            ),
            citations: vec![Citation::new("https://found.example", "Found")],
        }
    }

    /// Answers immediately and records what it was asked.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub calls: StdMutex<Vec<(String, SearchFilters)>>,
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn search(
            &self,
            query: &str,
            filters: &SearchFilters,
        ) -> Result<BackendReply, SearchError> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), *filters));
            Ok(reply_for(query))
        }
    }

    pub struct FailingBackend;

    #[async_trait]
    impl SearchBackend for FailingBackend {
        async fn search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
        ) -> Result<BackendReply, SearchError> {
            Err(SearchError::Backend {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    /// Holds the query "slow" until released; everything else answers at once.
    pub struct GatedBackend {
        pub entered: StdMutex<Option<oneshot::Sender<()>>>,
        pub release: Notify,
    }

    #[async_trait]
    impl SearchBackend for GatedBackend {
        async fn search(
            &self,
            query: &str,
            _filters: &SearchFilters,
        ) -> Result<BackendReply, SearchError> {
            if query == "slow" {
                let entered = self.entered.lock().unwrap().take();
                if let Some(tx) = entered {
                    let _ = tx.send(());
                }
                self.release.notified().await;
            }
            Ok(reply_for(query))
        }
    }

    pub fn temp_store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        (dir, store)
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_flag_updates_type_and_query() {
    let (_dir, store) = temp_store();
    let backend = Arc::new(RecordingBackend::default());
    let session = SearchSession::new(backend.clone(), store.clone());

    let outcome = session.search("john_doe -u").await.unwrap();
    let SearchOutcome::Completed {
        query,
        data_type,
        response,
    } = outcome
    else {
        panic!("expected a completed search");
    };
    assert_eq!(query, "john_doe");
    assert_eq!(data_type, DataType::Username);
    assert_eq!(response.items.len(), 1);
    assert_eq!(
        response.items[0].sources,
        vec![Citation::new("https://found.example", "Found")]
    );

    let calls = backend.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "john_doe");
    assert_eq!(calls[0].1.data_type, DataType::Username);

    // The cleaned query and selected type are persisted.
    let stored = store.load();
    assert_eq!(stored.query, "john_doe");
    assert_eq!(stored.data_type, DataType::Username);
    assert_eq!(session.latest().await, Some(response));
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_no_flag_keeps_previous_type() {
    let (_dir, store) = temp_store();
    store
        .save(&UiState {
            query: String::new(),
            data_type: DataType::Phone,
            filters: SearchFilters {
                exact_match: true,
                ..SearchFilters::default()
            },
        })
        .unwrap();
    let backend = Arc::new(RecordingBackend::default());
    let session = SearchSession::new(backend.clone(), store.clone());

    session.search("  +1 555 0100 ").await.unwrap();

    let calls = backend.calls.lock().unwrap().clone();
    assert_eq!(calls[0].0, "+1 555 0100");
    assert_eq!(calls[0].1.data_type, DataType::Phone);
    assert!(calls[0].1.exact_match);
    assert_eq!(store.load().query, "  +1 555 0100 ");
}

#[tokio::test]
async fn test_blank_and_flag_only_queries_skip_backend() {
    let (_dir, store) = temp_store();
    let backend = Arc::new(RecordingBackend::default());
    let session = SearchSession::new(backend.clone(), store);

    assert!(matches!(
        session.search("   ").await.unwrap(),
        SearchOutcome::Skipped
    ));
    assert!(matches!(
        session.search("--email").await.unwrap(),
        SearchOutcome::Skipped
    ));
    assert!(backend.calls.lock().unwrap().is_empty());
    // The flag still selected the type.
    assert_eq!(session.state().await.data_type, DataType::Email);
}

#[tokio::test]
async fn test_backend_failure_is_surfaced() {
    let (_dir, store) = temp_store();
    let session = SearchSession::new(Arc::new(FailingBackend), store);

    let err = session.search("anything").await.unwrap_err();
    assert!(!err.is_configuration());
    assert!(err.advisory().starts_with("Intelligence gathering failed"));
    assert!(session.latest().await.is_none());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_superseded_response_is_discarded() {
    let (_dir, store) = temp_store();
    let (tx, rx) = oneshot::channel();
    let backend = Arc::new(GatedBackend {
        entered: StdMutex::new(Some(tx)),
        release: Notify::new(),
    });
    let session = Arc::new(SearchSession::new(backend.clone(), store));

    let slow = tokio::spawn({
        let session = session.clone();
        async move { session.search("slow").await }
    });
    rx.await.unwrap();

    let fast = session.search("fast").await.unwrap();
    assert!(matches!(fast, SearchOutcome::Completed { .. }));

    backend.release.notify_one();
    let slow = slow.await.unwrap().unwrap();
    assert!(matches!(slow, SearchOutcome::Superseded));

    let latest = session.latest().await.unwrap();
    assert_eq!(latest.items[0].title, "fast");
}

#[tokio::test]
async fn test_rerun_uses_stored_query() {
    let (_dir, store) = temp_store();
    let backend = Arc::new(RecordingBackend::default());
    let session = SearchSession::new(backend.clone(), store);

    session.set_query("report.pdf -t").await;
    session.rerun().await.unwrap();

    let calls = backend.calls.lock().unwrap().clone();
    assert_eq!(calls[0].0, "report.pdf");
    assert_eq!(calls[0].1.data_type, DataType::Text);
}

#[tokio::test]
async fn test_filter_updates_persist_and_reset() {
    let (_dir, store) = temp_store();
    let session = SearchSession::new(Arc::new(RecordingBackend::default()), store.clone());

    session.set_query("kept").await;
    session.set_data_type(DataType::Social).await;
    let state = session
        .update_filters(SearchFilters {
            deep_search: true,
            include_socials: false,
            ..SearchFilters::default()
        })
        .await;
    assert!(state.filters.deep_search);
    assert_eq!(store.load(), state);

    let state = session.reset_filters().await;
    assert_eq!(state.query, "kept");
    assert_eq!(state.data_type, DataType::All);
    assert_eq!(state.filters, SearchFilters::default());
    assert_eq!(store.load(), state);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_leave_disk_matching_memory() {
    let (_dir, store) = temp_store();
    let session = Arc::new(SearchSession::new(
        Arc::new(RecordingBackend::default()),
        store.clone(),
    ));
    let long_query = "x".repeat(400);

    for _round in 0..20 {
        let mut handles = Vec::new();
        for i in 0..16 {
            let session = session.clone();
            let query = if i % 2 == 0 {
                "a".to_string()
            } else {
                long_query.clone()
            };
            handles.push(tokio::spawn(async move {
                session.set_query(&query).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        let parsed: UiState = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(parsed, session.state().await);
    }
}

#[tokio::test]
async fn test_dropped_search_clears_loading() {
    let (_dir, store) = temp_store();
    let (tx, rx) = oneshot::channel();
    let backend = Arc::new(GatedBackend {
        entered: StdMutex::new(Some(tx)),
        release: Notify::new(),
    });
    let session = Arc::new(SearchSession::new(backend, store));

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.search("slow").await }
    });
    rx.await.unwrap();
    assert!(session.is_loading());

    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());
    assert!(!session.is_loading());
    assert!(session.latest().await.is_none());
}
