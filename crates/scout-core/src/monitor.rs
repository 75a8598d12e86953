use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::dispatch::ConnectionReply;
use crate::error::ScoutError;
use crate::heartbeat::LivenessReporter;
use crate::ingest::{FollowUp, FollowUpReceiver, IngestionClient};
use crate::models::ConnectionStatus;
use crate::traits::{CredentialStore, Transport};

/// Default interval between background probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Receives status transitions for display (icon, badge, status line).
pub trait StatusIndicator: Send + Sync {
    fn show(&self, status: ConnectionStatus);
}

/// Indicator that logs transitions with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingIndicator;

impl StatusIndicator for TracingIndicator {
    fn show(&self, status: ConnectionStatus) {
        match status {
            ConnectionStatus::Checking => tracing::debug!(%status, "Checking connection"),
            ConnectionStatus::Connected => tracing::info!(%status, "Scout connected"),
            ConnectionStatus::Unconfigured => tracing::warn!(%status, "No API key configured"),
            ConnectionStatus::Unauthorized | ConnectionStatus::Unreachable => {
                tracing::warn!(%status, message = status.message(), "Scout disconnected")
            }
        }
    }
}

/// Classifies the client as connected, unauthorized, or unreachable.
///
/// Probes send an empty batch to the ingestion endpoint. The latest status
/// is published on a watch channel; concurrent probes and sends race and
/// the last one to finish wins.
pub struct ConnectionMonitor<T, S, I>
where
    T: Transport,
    S: CredentialStore,
    I: StatusIndicator,
{
    client: IngestionClient<T, S>,
    reporter: LivenessReporter<T>,
    indicator: I,
    interval: Duration,
    status: watch::Sender<ConnectionStatus>,
}

impl<T, S, I> ConnectionMonitor<T, S, I>
where
    T: Transport + 'static,
    S: CredentialStore,
    I: StatusIndicator,
{
    /// `client` should not carry a follow-up sender: probes must not
    /// schedule more probes.
    pub fn new(
        client: IngestionClient<T, S>,
        reporter: LivenessReporter<T>,
        indicator: I,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Unconfigured);
        Self {
            client,
            reporter,
            indicator,
            interval: DEFAULT_PROBE_INTERVAL,
            status,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Last published status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Probe the endpoint once and publish the result.
    pub async fn probe(&self) -> ConnectionStatus {
        let api_key = match self.client.credential().await {
            Ok(Some(key)) => key,
            Ok(None) => return self.publish(ConnectionStatus::Unconfigured),
            Err(e) => {
                tracing::warn!(error = %e, "Credential lookup failed during probe");
                return self.publish(ConnectionStatus::Unreachable);
            }
        };

        self.publish(ConnectionStatus::Checking);

        let status = match self.client.post_batch(&api_key, &[]).await {
            Ok(_) => {
                self.reporter.dispatch_default(api_key);
                ConnectionStatus::Connected
            }
            Err(ScoutError::InvalidCredential) => ConnectionStatus::Unauthorized,
            Err(e) => {
                tracing::debug!(error = %e, "Probe failed");
                ConnectionStatus::Unreachable
            }
        };

        self.publish(status)
    }

    /// Probe and answer a CHECK_CONNECTION request.
    pub async fn check(&self) -> ConnectionReply {
        ConnectionReply::from(self.probe().await)
    }

    /// Send the default heartbeat if a credential is configured.
    ///
    /// Returns the handle of the detached report, if one was started.
    pub async fn heartbeat(&self) -> Option<JoinHandle<()>> {
        match self.client.credential().await {
            Ok(Some(key)) => Some(self.reporter.dispatch_default(key)),
            Ok(None) => {
                tracing::debug!("Skipping heartbeat, no API key");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping heartbeat, credential lookup failed");
                None
            }
        }
    }

    /// Probe at start, on every interval tick, and on every re-check
    /// follow-up, until `cancel_token` fires.
    pub async fn run(&self, cancel_token: CancellationToken, mut follow_ups: FollowUpReceiver) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut follow_ups_open = true;

        tracing::info!(interval_secs = self.interval.as_secs(), "Status monitor started");

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.probe().await;
                }
                follow_up = follow_ups.recv(), if follow_ups_open => match follow_up {
                    Some(FollowUp::Recheck) => {
                        self.probe().await;
                    }
                    Some(FollowUp::Heartbeat) => {
                        self.heartbeat().await;
                    }
                    None => follow_ups_open = false,
                },
            }
        }

        tracing::info!("Status monitor stopped");
    }

    fn publish(&self, status: ConnectionStatus) -> ConnectionStatus {
        self.status.send_replace(status);
        self.indicator.show(status);
        status
    }
}
