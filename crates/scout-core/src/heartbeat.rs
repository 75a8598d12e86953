use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::traits::Transport;

/// Path of the liveness endpoint.
pub const HEARTBEAT_PATH: &str = "/api/scout/heartbeat";

/// Minimum acceptable rate per mile reported when none is configured.
pub const DEFAULT_MIN_RPM: f64 = 2.45;

/// Liveness payload: what the scout is watching and whether it is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub lanes: Vec<String>,
    pub min_rpm: f64,
    pub active: bool,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            lanes: Vec::new(),
            min_rpm: DEFAULT_MIN_RPM,
            active: true,
        }
    }
}

/// Best-effort liveness reporting.
///
/// Never returns an error and never retries; failures are logged.
#[derive(Clone)]
pub struct LivenessReporter<T: Transport> {
    transport: T,
    defaults: Heartbeat,
}

impl<T: Transport> LivenessReporter<T> {
    pub fn new(transport: T, defaults: Heartbeat) -> Self {
        Self {
            transport,
            defaults,
        }
    }

    /// The heartbeat sent when the caller has nothing more specific.
    pub fn defaults(&self) -> &Heartbeat {
        &self.defaults
    }

    /// POST one heartbeat. Only the response status is looked at.
    pub async fn report(&self, api_key: &str, heartbeat: &Heartbeat) {
        let body = match serde_json::to_value(heartbeat) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Heartbeat not serializable");
                return;
            }
        };

        let result = self
            .transport
            .post_json(HEARTBEAT_PATH, api_key, &body)
            .await;
        match result {
            Ok(response) if response.is_success() => {
                tracing::debug!(lanes = heartbeat.lanes.len(), "Heartbeat sent");
            }
            Ok(response) => {
                tracing::warn!(status_code = response.status, "Heartbeat rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Heartbeat failed");
            }
        }
    }
}

impl<T: Transport + 'static> LivenessReporter<T> {
    /// Send a heartbeat on a detached task.
    ///
    /// The handle is only useful to tests; dropping it does not cancel the
    /// report.
    pub fn dispatch(&self, api_key: String, heartbeat: Heartbeat) -> JoinHandle<()> {
        let reporter = self.clone();
        tokio::spawn(async move { reporter.report(&api_key, &heartbeat).await })
    }

    /// Send the default heartbeat on a detached task.
    pub fn dispatch_default(&self, api_key: String) -> JoinHandle<()> {
        self.dispatch(api_key, self.defaults.clone())
    }
}
