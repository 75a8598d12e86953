use std::fmt;
use std::future::Future;

use crate::error::ScoutError;
use crate::models::{Badge, PageRow};

/// Status and body of an HTTP response, as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends authenticated JSON requests to the remote scout service.
pub trait Transport: Send + Sync + Clone {
    /// POST `body` to `path` with the key in the `X-API-Key` header.
    ///
    /// Returns `Err(ScoutError::Unreachable)` only when no response was
    /// received; any HTTP status, including errors, is an `Ok`.
    fn post_json(
        &self,
        path: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<TransportResponse, ScoutError>> + Send;
}

/// The two credential namespaces, queried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreNamespace {
    Sync,
    Local,
}

impl StoreNamespace {
    pub const READ_ORDER: [StoreNamespace; 2] = [StoreNamespace::Sync, StoreNamespace::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreNamespace::Sync => "sync",
            StoreNamespace::Local => "local",
        }
    }
}

impl fmt::Display for StoreNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persistent key-value store holding the API key.
pub trait CredentialStore: Send + Sync + Clone {
    fn get(
        &self,
        namespace: StoreNamespace,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, ScoutError>> + Send;

    fn set(
        &self,
        namespace: StoreNamespace,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), ScoutError>> + Send;

    fn remove(
        &self,
        namespace: StoreNamespace,
        key: &str,
    ) -> impl Future<Output = Result<(), ScoutError>> + Send;
}

/// A live, mutable document made of rows and cells.
///
/// Reads always reflect the current state, including badges inserted
/// earlier in the same pass.
pub trait DocumentScanner {
    /// Every row-like element with the text of its cell-like children.
    fn rows(&self) -> Vec<PageRow>;

    /// Whether the row at `position` already carries a reward badge.
    fn has_badge(&self, position: usize) -> bool;

    /// Append `badge` to cell `cell` of the row at `position`.
    ///
    /// Returns false when the row or cell does not exist.
    fn insert_badge(&mut self, position: usize, cell: usize, badge: &Badge) -> bool;
}
