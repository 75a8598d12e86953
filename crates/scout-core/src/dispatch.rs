//! Request/response channel between a triggering surface and the pipeline.
//!
//! Every request carries a correlation id and its own oneshot reply slot, so
//! each request is answered at most once and a reply can never be delivered
//! to the wrong caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::error::ScoutError;
use crate::models::ConnectionStatus;
use crate::monitor::{ConnectionMonitor, StatusIndicator};
use crate::scrape::ScoutPipeline;
use crate::traits::{CredentialStore, DocumentScanner, Transport};

/// A command from the triggering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerRequest {
    ScrapeNow,
    CheckConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Success,
    Empty,
    Error,
}

/// Outcome of a SCRAPE_NOW request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeReply {
    pub status: ScrapeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeReply {
    pub fn success(count: usize) -> Self {
        Self {
            status: ScrapeStatus::Success,
            count: Some(count),
            error: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            status: ScrapeStatus::Empty,
            count: Some(0),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ScrapeStatus::Error,
            count: None,
            error: Some(message.into()),
        }
    }
}

/// Outcome of a CHECK_CONNECTION request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionReply {
    pub connected: bool,
    pub message: String,
}

impl From<ConnectionStatus> for ConnectionReply {
    fn from(status: ConnectionStatus) -> Self {
        Self {
            connected: status.is_connected(),
            message: status.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerResponse {
    Scrape(ScrapeReply),
    Connection(ConnectionReply),
}

/// A request in flight, together with the slot its answer goes into.
#[derive(Debug)]
pub struct TriggerEnvelope {
    pub id: u64,
    pub request: TriggerRequest,
    reply: oneshot::Sender<(u64, TriggerResponse)>,
}

impl TriggerEnvelope {
    /// Answer the request. Consumes the envelope, so it can happen once.
    pub fn respond(self, response: TriggerResponse) {
        if self.reply.send((self.id, response)).is_err() {
            tracing::debug!(id = self.id, "Requester went away before the reply");
        }
    }
}

/// Cloneable sending side used by triggering surfaces.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<TriggerEnvelope>,
    next_id: Arc<AtomicU64>,
}

/// Receiving side, drained by [`serve`].
pub type TriggerInbox = mpsc::Receiver<TriggerEnvelope>;

pub fn trigger_channel(capacity: usize) -> (TriggerHandle, TriggerInbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        TriggerHandle {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        },
        rx,
    )
}

impl TriggerHandle {
    /// Send `request` and wait for its reply.
    pub async fn request(&self, request: TriggerRequest) -> Result<TriggerResponse, ScoutError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, rx) = oneshot::channel();

        self.tx
            .send(TriggerEnvelope { id, request, reply })
            .await
            .map_err(|_| ScoutError::Dispatch("trigger channel closed".into()))?;

        let (reply_id, response) = rx
            .await
            .map_err(|_| ScoutError::Dispatch(format!("request {id} dropped without reply")))?;

        if reply_id != id {
            return Err(ScoutError::Dispatch(format!(
                "reply for request {reply_id} delivered to request {id}"
            )));
        }
        Ok(response)
    }
}

/// Answer trigger requests against `page` until every handle is dropped.
///
/// Requests are handled one at a time, in arrival order.
pub async fn serve<D, T, S, I>(
    mut inbox: TriggerInbox,
    page: &mut D,
    pipeline: &ScoutPipeline<T, S>,
    monitor: &ConnectionMonitor<T, S, I>,
) where
    D: DocumentScanner + ?Sized,
    T: Transport + 'static,
    S: CredentialStore,
    I: StatusIndicator,
{
    while let Some(envelope) = inbox.recv().await {
        tracing::debug!(id = envelope.id, request = ?envelope.request, "Trigger received");
        let response = match envelope.request {
            TriggerRequest::ScrapeNow => TriggerResponse::Scrape(pipeline.scrape_now(page).await),
            TriggerRequest::CheckConnection => TriggerResponse::Connection(monitor.check().await),
        };
        envelope.respond(response);
    }
}
