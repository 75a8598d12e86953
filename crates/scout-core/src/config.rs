use std::time::Duration;

use url::Url;

use crate::error::ScoutError;
use crate::heartbeat::{DEFAULT_MIN_RPM, Heartbeat};
use crate::models::DEFAULT_EQUIPMENT_TYPE;
use crate::monitor::DEFAULT_PROBE_INTERVAL;
use crate::scrape::DEFAULT_SETTLE_DELAY;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8990";

/// Runtime settings for the scout.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoutConfig {
    /// Base URL of the remote scout service.
    pub endpoint: Url,
    pub probe_interval: Duration,
    pub settle_delay: Duration,
    /// Lanes reported in every heartbeat.
    pub lanes: Vec<String>,
    pub min_rpm: f64,
    pub equipment_type: String,
    pub load_source: Option<String>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            probe_interval: DEFAULT_PROBE_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            lanes: Vec::new(),
            min_rpm: DEFAULT_MIN_RPM,
            equipment_type: DEFAULT_EQUIPMENT_TYPE.to_string(),
            load_source: None,
        }
    }
}

impl ScoutConfig {
    /// Read configuration from environment variables.
    ///
    /// - `SCOUT_ENDPOINT` (default `http://localhost:8990`)
    /// - `SCOUT_PROBE_INTERVAL_SECS` (default 30, at least 1)
    /// - `SCOUT_SETTLE_DELAY_MS` (default 1000)
    /// - `SCOUT_LANES` (comma-separated, default none)
    /// - `SCOUT_MIN_RPM` (default 2.45)
    /// - `SCOUT_EQUIPMENT_TYPE` (default `Van`)
    /// - `SCOUT_LOAD_SOURCE` (optional)
    pub fn from_env() -> Result<Self, ScoutError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScoutError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(raw) = get("SCOUT_ENDPOINT") {
            config.endpoint = parse_endpoint(&raw)?;
        }

        if let Some(raw) = get("SCOUT_PROBE_INTERVAL_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                ScoutError::ConfigError(format!(
                    "Invalid SCOUT_PROBE_INTERVAL_SECS '{raw}': must be a positive integer"
                ))
            })?;
            if secs == 0 {
                return Err(ScoutError::ConfigError(
                    "SCOUT_PROBE_INTERVAL_SECS must be at least 1".into(),
                ));
            }
            config.probe_interval = Duration::from_secs(secs);
        }

        if let Some(raw) = get("SCOUT_SETTLE_DELAY_MS") {
            let ms: u64 = raw.parse().map_err(|_| {
                ScoutError::ConfigError(format!(
                    "Invalid SCOUT_SETTLE_DELAY_MS '{raw}': must be a non-negative integer"
                ))
            })?;
            config.settle_delay = Duration::from_millis(ms);
        }

        if let Some(raw) = get("SCOUT_LANES") {
            config.lanes = raw
                .split(',')
                .map(str::trim)
                .filter(|lane| !lane.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(raw) = get("SCOUT_MIN_RPM") {
            let rpm: f64 = raw.parse().map_err(|_| {
                ScoutError::ConfigError(format!("Invalid SCOUT_MIN_RPM '{raw}': must be a number"))
            })?;
            if !rpm.is_finite() || rpm < 0.0 {
                return Err(ScoutError::ConfigError(format!(
                    "SCOUT_MIN_RPM must be a non-negative number, got {raw}"
                )));
            }
            config.min_rpm = rpm;
        }

        if let Some(raw) = get("SCOUT_EQUIPMENT_TYPE") {
            config.equipment_type = raw;
        }

        config.load_source = get("SCOUT_LOAD_SOURCE");

        Ok(config)
    }

    /// The heartbeat sent by default.
    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            lanes: self.lanes.clone(),
            min_rpm: self.min_rpm,
            active: true,
        }
    }
}

/// Parse and check a service base URL.
pub fn parse_endpoint(raw: &str) -> Result<Url, ScoutError> {
    let url = Url::parse(raw)
        .map_err(|e| ScoutError::ConfigError(format!("Invalid endpoint '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ScoutError::ConfigError(format!(
            "Endpoint scheme '{scheme}' is not allowed (only http/https)"
        ))),
    }
}
