use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::data_models::{DataType, SearchFilters, SearchResponse};
use crate::error::SearchError;
use crate::extractor;
use crate::gemini::SearchBackend;
use crate::query_parser;
use crate::state::{StateStore, UiState};

/// Hands out monotonically increasing tickets. Only the holder of the most
/// recent ticket may publish a result.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_latest(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Blank query (or flags only), nothing was sent.
    Skipped,
    /// A newer search was issued while this one was in flight; its result was dropped.
    Superseded,
    Completed {
        query: String,
        data_type: DataType,
        response: Arc<SearchResponse>,
    },
}

/// One search surface: persisted UI state, the backend, and the result
/// currently on display.
pub struct SearchSession {
    backend: Arc<dyn SearchBackend>,
    store: StateStore,
    state: Mutex<UiState>,
    latest: Mutex<Option<Arc<SearchResponse>>>,
    sequencer: RequestSequencer,
    loading: AtomicBool,
}

impl SearchSession {
    pub fn new(backend: Arc<dyn SearchBackend>, store: StateStore) -> Self {
        let state = store.load();
        Self {
            backend,
            store,
            state: Mutex::new(state),
            latest: Mutex::new(None),
            sequencer: RequestSequencer::new(),
            loading: AtomicBool::new(false),
        }
    }

    pub async fn state(&self) -> UiState {
        self.state.lock().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn latest(&self) -> Option<Arc<SearchResponse>> {
        self.latest.lock().await.clone()
    }

    pub async fn set_query(&self, query: &str) -> UiState {
        self.update(|state| state.query = query.to_string()).await
    }

    pub async fn set_data_type(&self, data_type: DataType) -> UiState {
        self.update(|state| state.data_type = data_type).await
    }

    /// Replaces the toggles. The type hint inside `filters` is ignored; the
    /// selected type lives in [`UiState::data_type`].
    pub async fn update_filters(&self, filters: SearchFilters) -> UiState {
        self.update(|state| state.filters = filters.with_data_type(DataType::All))
            .await
    }

    pub async fn reset_filters(&self) -> UiState {
        self.update(UiState::reset_filters).await
    }

    async fn update<F>(&self, f: F) -> UiState
    where
        F: FnOnce(&mut UiState),
    {
        // The lock is held through the write so the file always ends up with
        // the last state applied in memory.
        let mut state = self.state.lock().await;
        f(&mut state);
        self.persist(&state).await;
        state.clone()
    }

    async fn persist(&self, state: &UiState) {
        if let Err(e) = self.store.save_async(state).await {
            warn!("failed to persist state: {:#}", e);
        }
    }

    /// Runs the stored query.
    pub async fn rerun(&self) -> Result<SearchOutcome, SearchError> {
        let query = self.state.lock().await.query.clone();
        self.search(&query).await
    }

    pub async fn search(&self, raw_query: &str) -> Result<SearchOutcome, SearchError> {
        if raw_query.trim().is_empty() {
            return Ok(SearchOutcome::Skipped);
        }

        let parsed = query_parser::parse(raw_query);
        let snapshot = self
            .update(|state| match parsed.detected_type {
                Some(data_type) => {
                    state.data_type = data_type;
                    state.query = parsed.clean_query.clone();
                }
                None => state.query = raw_query.to_string(),
            })
            .await;
        let filters = snapshot.active_filters();
        if parsed.clean_query.is_empty() {
            // Flags only: the type selection sticks but there is nothing to send.
            return Ok(SearchOutcome::Skipped);
        }

        let ticket = {
            let mut latest = self.latest.lock().await;
            *latest = None;
            self.sequencer.issue()
        };
        self.loading.store(true, Ordering::SeqCst);
        let _loading = LoadingGuard {
            sequencer: &self.sequencer,
            loading: &self.loading,
            ticket,
        };
        info!(ticket, query = %parsed.clean_query, data_type = %filters.data_type, "search started");

        let result = self.backend.search(&parsed.clean_query, &filters).await;

        // Hold the result lock while checking the ticket so a newer search
        // cannot slip in between the check and the store.
        let mut latest = self.latest.lock().await;
        if !self.sequencer.is_latest(ticket) {
            info!(ticket, "discarding response from superseded search");
            return Ok(SearchOutcome::Superseded);
        }

        let reply = result.inspect_err(|e| warn!(ticket, "search failed: {e}"))?;
        let response = Arc::new(extractor::extract(&reply.text, &reply.citations));
        info!(ticket, items = response.items.len(), "search completed");
        *latest = Some(response.clone());

        Ok(SearchOutcome::Completed {
            query: parsed.clean_query,
            data_type: filters.data_type,
            response,
        })
    }
}

/// Clears the loading flag when the newest search finishes, fails, or is
/// dropped mid-flight.
struct LoadingGuard<'a> {
    sequencer: &'a RequestSequencer,
    loading: &'a AtomicBool,
    ticket: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.sequencer.is_latest(self.ticket) {
            self.loading.store(false, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_loading_guard_only_clears_for_latest_ticket() {
    let sequencer = RequestSequencer::new();
    let loading = AtomicBool::new(true);

    let stale = sequencer.issue();
    let current = sequencer.issue();
    drop(LoadingGuard {
        sequencer: &sequencer,
        loading: &loading,
        ticket: stale,
    });
    assert!(loading.load(Ordering::SeqCst));

    drop(LoadingGuard {
        sequencer: &sequencer,
        loading: &loading,
        ticket: current,
    });
    assert!(!loading.load(Ordering::SeqCst));
}

#[test]
fn test_sequencer_only_latest_ticket_wins() {
    let seq = RequestSequencer::new();
    let first = seq.issue();
    assert!(seq.is_latest(first));
    let second = seq.issue();
    assert!(second > first);
    assert!(!seq.is_latest(first));
    assert!(seq.is_latest(second));
}
