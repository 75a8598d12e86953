pub mod annotate;
pub mod config;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod heartbeat;
pub mod ingest;
pub mod models;
pub mod monitor;
pub mod reward;
pub mod scrape;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod traits;

pub use annotate::{AnnotationEngine, AnnotationSummary, BADGE_CLASS};
pub use config::ScoutConfig;
pub use credential::{CREDENTIAL_KEY, clear_credential, resolve_credential, save_credential};
pub use dispatch::{
    ConnectionReply, ScrapeReply, ScrapeStatus, TriggerHandle, TriggerRequest, TriggerResponse,
    serve, trigger_channel,
};
pub use error::ScoutError;
pub use extract::RecordExtractor;
pub use heartbeat::{Heartbeat, LivenessReporter};
pub use ingest::{FollowUp, IngestionClient, follow_up_channel};
pub use models::{Badge, ConnectionStatus, IngestAck, LoadRecord, PageRow};
pub use monitor::{ConnectionMonitor, StatusIndicator, TracingIndicator};
pub use reward::{Reward, RewardCalculator};
pub use scrape::{ScanReport, ScoutPipeline};
pub use traits::{CredentialStore, DocumentScanner, StoreNamespace, Transport, TransportResponse};
