use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default equipment category when the page does not say otherwise.
pub const DEFAULT_EQUIPMENT_TYPE: &str = "Van";

/// A single freight listing scraped from a load board.
///
/// Field names follow the ingestion endpoint's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRecord {
    /// Batch-unique reference, `REF-<random>-<row position>`.
    pub ref_id: String,
    pub origin: String,
    pub destination: String,
    /// Raw price text as displayed on the page.
    pub price: String,
    pub equipment_type: String,
    /// Scan time; the boards we read carry no explicit pickup date.
    pub pickup_date: DateTime<Utc>,
    /// Optional board label (e.g. "dat", "truckstop").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_source: Option<String>,
}

/// Text content of one row-like element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRow {
    /// Index among all rows of the document, including skipped ones.
    pub position: usize,
    /// Trimmed text of each cell-like child.
    pub cells: Vec<String>,
}

/// A record together with the row it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRow {
    pub position: usize,
    pub record: LoadRecord,
}

/// Visual reward marker inserted into a row's price cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    /// Short text shown inline, e.g. `GC: +$60.00 (15.0 gal)`.
    pub label: String,
    /// Hover text.
    pub title: String,
}

/// Connection state shown by the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Unconfigured,
    Checking,
    Connected,
    Unauthorized,
    Unreachable,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Unconfigured => "unconfigured",
            ConnectionStatus::Checking => "checking",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Unauthorized => "unauthorized",
            ConnectionStatus::Unreachable => "unreachable",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Human-readable status line for the indicator.
    pub fn message(&self) -> &'static str {
        match self {
            ConnectionStatus::Unconfigured => "Not configured",
            ConnectionStatus::Checking => "Checking...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Unauthorized => "Invalid API key - regenerate it from your dashboard",
            ConnectionStatus::Unreachable => "Cannot reach server",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unconfigured" => Ok(ConnectionStatus::Unconfigured),
            "checking" => Ok(ConnectionStatus::Checking),
            "connected" => Ok(ConnectionStatus::Connected),
            "unauthorized" => Ok(ConnectionStatus::Unauthorized),
            "unreachable" => Ok(ConnectionStatus::Unreachable),
            _ => Err(format!("Unknown connection status: {}", s)),
        }
    }
}

/// Acknowledgment of a delivered batch.
///
/// The payload is whatever JSON the endpoint returned (`Null` when the body
/// was empty or not JSON).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestAck {
    pub status_code: u16,
    pub payload: serde_json::Value,
}

impl IngestAck {
    /// Number of high-value loads the endpoint flagged, if it reported any.
    pub fn hot(&self) -> u64 {
        self.count_field("hot")
    }

    pub fn new_loads(&self) -> u64 {
        self.count_field("new_loads")
    }

    pub fn updated_loads(&self) -> u64 {
        self.count_field("updated_loads")
    }

    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(|v| v.as_str())
    }

    fn count_field(&self, key: &str) -> u64 {
        self.payload.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
    }
}
