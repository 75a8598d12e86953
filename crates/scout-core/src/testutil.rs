//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::ScoutError;
use crate::models::{Badge, ConnectionStatus, DEFAULT_EQUIPMENT_TYPE, LoadRecord, PageRow};
use crate::monitor::StatusIndicator;
use crate::traits::{
    CredentialStore, DocumentScanner, StoreNamespace, Transport, TransportResponse,
};

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// One request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub path: String,
    pub api_key: String,
    pub body: serde_json::Value,
}

/// Mock transport that returns queued responses and records every call.
#[derive(Clone)]
pub struct MockTransport {
    /// Queue of responses. Each call pops the first element.
    /// If empty, repeats `fallback`.
    responses: Arc<Mutex<Vec<Result<TransportResponse, ScoutError>>>>,
    fallback: TransportResponse,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockTransport {
    /// Transport that answers every call with `status` and `body`.
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            fallback: TransportResponse::new(status, body),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Transport whose first call fails with `error`; later calls get 200.
    pub fn with_error(error: ScoutError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    /// Transport answering calls from `responses` in order, then 200 `{}`.
    pub fn with_responses(responses: Vec<Result<TransportResponse, ScoutError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            fallback: TransportResponse::new(200, "{}"),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    async fn post_json(
        &self,
        path: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, ScoutError> {
        self.calls.lock().unwrap().push(RecordedCall {
            path: path.to_string(),
            api_key: api_key.to_string(),
            body: body.clone(),
        });

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.fallback.clone())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockCredentialStore
// ---------------------------------------------------------------------------

/// In-memory credential store with injectable read failures.
#[derive(Clone, Default)]
pub struct MockCredentialStore {
    values: Arc<Mutex<HashMap<(StoreNamespace, String), String>>>,
    failing: Arc<Mutex<HashSet<StoreNamespace>>>,
}

impl MockCredentialStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store with `key` in the sync namespace.
    pub fn with_key(key: &str) -> Self {
        let store = Self::empty();
        store.put(StoreNamespace::Sync, key);
        store
    }

    /// Set the API key in one namespace.
    pub fn put(&self, namespace: StoreNamespace, value: &str) {
        self.values.lock().unwrap().insert(
            (namespace, crate::credential::CREDENTIAL_KEY.to_string()),
            value.to_string(),
        );
    }

    /// The API key currently held in one namespace.
    pub fn value(&self, namespace: StoreNamespace) -> Option<String> {
        self.values
            .lock()
            .unwrap()
            .get(&(namespace, crate::credential::CREDENTIAL_KEY.to_string()))
            .cloned()
    }

    /// Make every read of `namespace` fail.
    pub fn fail_reads(&self, namespace: StoreNamespace) {
        self.failing.lock().unwrap().insert(namespace);
    }
}

impl CredentialStore for MockCredentialStore {
    async fn get(
        &self,
        namespace: StoreNamespace,
        key: &str,
    ) -> Result<Option<String>, ScoutError> {
        if self.failing.lock().unwrap().contains(&namespace) {
            return Err(ScoutError::StorageError(format!("{namespace} unavailable")));
        }
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(&(namespace, key.to_string()))
            .cloned())
    }

    async fn set(
        &self,
        namespace: StoreNamespace,
        key: &str,
        value: &str,
    ) -> Result<(), ScoutError> {
        self.values
            .lock()
            .unwrap()
            .insert((namespace, key.to_string()), value.to_string());
        Ok(())
    }

    async fn remove(&self, namespace: StoreNamespace, key: &str) -> Result<(), ScoutError> {
        self.values
            .lock()
            .unwrap()
            .remove(&(namespace, key.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockPage
// ---------------------------------------------------------------------------

/// In-memory table standing in for a live document.
pub struct MockPage {
    rows: Vec<Vec<String>>,
    /// Inserted badges per row: (cell index, badge).
    badges: Vec<Vec<(usize, Badge)>>,
}

impl MockPage {
    pub fn new(rows: Vec<Vec<&str>>) -> Self {
        let badges = vec![Vec::new(); rows.len()];
        Self {
            rows: rows
                .into_iter()
                .map(|cells| cells.into_iter().map(String::from).collect())
                .collect(),
            badges,
        }
    }

    pub fn badges(&self, position: usize) -> Vec<(usize, Badge)> {
        self.badges.get(position).cloned().unwrap_or_default()
    }
}

impl DocumentScanner for MockPage {
    fn rows(&self) -> Vec<PageRow> {
        self.rows
            .iter()
            .enumerate()
            .map(|(position, cells)| PageRow {
                position,
                cells: cells.iter().map(|c| c.trim().to_string()).collect(),
            })
            .collect()
    }

    fn has_badge(&self, position: usize) -> bool {
        self.badges.get(position).is_some_and(|b| !b.is_empty())
    }

    fn insert_badge(&mut self, position: usize, cell: usize, badge: &Badge) -> bool {
        let cell_exists = self.rows.get(position).is_some_and(|r| cell < r.len());
        if !cell_exists {
            return false;
        }
        self.badges[position].push((cell, badge.clone()));
        true
    }
}

// ---------------------------------------------------------------------------
// RecordingIndicator
// ---------------------------------------------------------------------------

/// Indicator that records every status it is shown.
#[derive(Clone, Default)]
pub struct RecordingIndicator {
    shown: Arc<Mutex<Vec<ConnectionStatus>>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<ConnectionStatus> {
        self.shown.lock().unwrap().clone()
    }
}

impl StatusIndicator for RecordingIndicator {
    fn show(&self, status: ConnectionStatus) {
        self.shown.lock().unwrap().push(status);
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a load record for testing.
pub fn make_test_record(origin: &str, destination: &str, price: &str) -> LoadRecord {
    LoadRecord {
        ref_id: format!("REF-1-{origin}"),
        origin: origin.to_string(),
        destination: destination.to_string(),
        price: price.to_string(),
        equipment_type: DEFAULT_EQUIPMENT_TYPE.to_string(),
        pickup_date: Utc::now(),
        load_source: None,
    }
}
