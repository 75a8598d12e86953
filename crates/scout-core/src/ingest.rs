use tokio::sync::mpsc;

use crate::credential::resolve_credential;
use crate::error::ScoutError;
use crate::models::{IngestAck, LoadRecord};
use crate::traits::{CredentialStore, Transport, TransportResponse};

/// Path of the batch ingestion endpoint.
pub const INGEST_PATH: &str = "/api/ingest/loads";

/// Longest slice of an error body kept in `RemoteRejected`.
const MAX_ERROR_BODY: usize = 200;

/// Work a delivery asks the status loop to do afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Probe the connection again.
    Recheck,
    /// Send a liveness report.
    Heartbeat,
}

/// Non-blocking, error-swallowing side of the follow-up channel.
#[derive(Debug, Clone)]
pub struct FollowUpSender {
    tx: mpsc::UnboundedSender<FollowUp>,
}

/// Receiving side of the follow-up channel, consumed by the monitor loop.
pub type FollowUpReceiver = mpsc::UnboundedReceiver<FollowUp>;

pub fn follow_up_channel() -> (FollowUpSender, FollowUpReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FollowUpSender { tx }, rx)
}

impl FollowUpSender {
    /// Queue a follow-up. Never blocks; a closed channel is only logged.
    pub fn notify(&self, follow_up: FollowUp) {
        if self.tx.send(follow_up).is_err() {
            tracing::debug!(?follow_up, "Follow-up dropped, status loop not running");
        }
    }
}

/// Delivers load batches to the remote endpoint.
///
/// The credential is resolved from the store on every call. Each call makes
/// at most one request; retry policy belongs to the caller.
#[derive(Clone)]
pub struct IngestionClient<T, S>
where
    T: Transport,
    S: CredentialStore,
{
    transport: T,
    store: S,
    follow_ups: Option<FollowUpSender>,
}

impl<T, S> IngestionClient<T, S>
where
    T: Transport,
    S: CredentialStore,
{
    /// Create a client that triggers no follow-ups.
    pub fn new(transport: T, store: S) -> Self {
        Self {
            transport,
            store,
            follow_ups: None,
        }
    }

    /// Report re-check and heartbeat follow-ups on `sender` after each send.
    pub fn with_follow_ups(mut self, sender: FollowUpSender) -> Self {
        self.follow_ups = Some(sender);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current API key, fresh from the store.
    pub async fn credential(&self) -> Result<Option<String>, ScoutError> {
        resolve_credential(&self.store).await
    }

    /// Deliver `records` as one batch.
    ///
    /// A 401 queues a re-check; a success queues a re-check and a heartbeat.
    pub async fn send(&self, records: &[LoadRecord]) -> Result<IngestAck, ScoutError> {
        let api_key = self.credential().await?.ok_or(ScoutError::MissingCredential)?;

        let result = self.post_batch(&api_key, records).await;

        match &result {
            Ok(ack) => {
                tracing::info!(
                    count = records.len(),
                    status_code = ack.status_code,
                    hot = ack.hot(),
                    "Batch delivered"
                );
                self.notify(FollowUp::Recheck);
                self.notify(FollowUp::Heartbeat);
            }
            Err(ScoutError::InvalidCredential) => {
                tracing::warn!("API key rejected");
                self.notify(FollowUp::Recheck);
            }
            Err(e) => {
                tracing::warn!(count = records.len(), error = %e, "Batch delivery failed");
            }
        }

        result
    }

    /// POST `records` with `api_key` and classify the response.
    ///
    /// No credential lookup and no follow-ups; this is the probe path.
    pub async fn post_batch(
        &self,
        api_key: &str,
        records: &[LoadRecord],
    ) -> Result<IngestAck, ScoutError> {
        let body = serde_json::to_value(records)?;
        let response = self.transport.post_json(INGEST_PATH, api_key, &body).await?;
        classify_response(response)
    }

    fn notify(&self, follow_up: FollowUp) {
        if let Some(sender) = &self.follow_ups {
            sender.notify(follow_up);
        }
    }
}

/// Map an ingestion response onto an acknowledgment or a typed error.
pub fn classify_response(response: TransportResponse) -> Result<IngestAck, ScoutError> {
    if response.status == 401 {
        return Err(ScoutError::InvalidCredential);
    }

    if !response.is_success() {
        let message = if response.body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !response.body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &response.body[..end])
        } else {
            response.body
        };
        return Err(ScoutError::RemoteRejected {
            status_code: response.status,
            message,
        });
    }

    let payload = if response.body.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&response.body).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ingest response is not JSON");
            serde_json::Value::Null
        })
    };

    Ok(IngestAck {
        status_code: response.status,
        payload,
    })
}
