use std::time::Duration;

use crate::annotate::AnnotationEngine;
use crate::dispatch::ScrapeReply;
use crate::extract::RecordExtractor;
use crate::ingest::IngestionClient;
use crate::models::LoadRecord;
use crate::traits::{CredentialStore, DocumentScanner, Transport};

/// Default wait for a freshly loaded page to settle before the first scan.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Result of one synchronous pass over a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub records: Vec<LoadRecord>,
    /// Badges inserted by this pass.
    pub badges_added: usize,
    /// Records priced at or above the high-value threshold.
    pub high_value: usize,
}

/// Orchestrates the scrape pipeline: extract → reward → annotate → send.
///
/// Generic over the transport and credential store so tests can run it
/// without a network or a real store.
pub struct ScoutPipeline<T, S>
where
    T: Transport,
    S: CredentialStore,
{
    extractor: RecordExtractor,
    annotator: AnnotationEngine,
    client: IngestionClient<T, S>,
}

impl<T, S> ScoutPipeline<T, S>
where
    T: Transport,
    S: CredentialStore,
{
    /// Create a pipeline with the default extractor and reward rates.
    pub fn new(client: IngestionClient<T, S>) -> Self {
        Self {
            extractor: RecordExtractor::default(),
            annotator: AnnotationEngine::default(),
            client,
        }
    }

    pub fn with_extractor(mut self, extractor: RecordExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_annotator(mut self, annotator: AnnotationEngine) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn client(&self) -> &IngestionClient<T, S> {
        &self.client
    }

    /// Extract records and badge high-value rows in one synchronous pass.
    pub fn scan<D: DocumentScanner + ?Sized>(&self, document: &mut D) -> ScanReport {
        let rows = self.extractor.extract(&*document);
        let summary = self.annotator.annotate(document, &rows);

        tracing::info!(
            loads = rows.len(),
            high_value = summary.high_value,
            badges_added = summary.badges_added,
            "Found {} potential loads",
            rows.len()
        );

        ScanReport {
            records: rows.into_iter().map(|r| r.record).collect(),
            badges_added: summary.badges_added,
            high_value: summary.high_value,
        }
    }

    /// Scan `document` and deliver whatever was found.
    pub async fn scrape_now<D: DocumentScanner + ?Sized>(&self, document: &mut D) -> ScrapeReply {
        let report = self.scan(document);
        if report.records.is_empty() {
            return ScrapeReply::empty();
        }

        let count = report.records.len();
        match self.client.send(&report.records).await {
            Ok(ack) => {
                tracing::info!(
                    count,
                    hot = ack.hot(),
                    "{} loads sent to HQ, {} high-value loads detected",
                    count,
                    ack.hot()
                );
                ScrapeReply::success(count)
            }
            Err(e) => ScrapeReply::error(e.user_message()),
        }
    }

    /// Wait for the page to settle, then badge it without sending anything.
    pub async fn auto_enhance<D: DocumentScanner + ?Sized>(
        &self,
        document: &mut D,
        settle: Duration,
    ) -> ScanReport {
        tokio::time::sleep(settle).await;
        self.scan(document)
    }
}
