use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ScoutError;
use crate::models::{DEFAULT_EQUIPMENT_TYPE, ExtractedRow, LoadRecord, PageRow};
use crate::traits::DocumentScanner;

/// Rows with fewer cells are headers or decoration, not listings.
pub const MIN_CELLS: usize = 4;

pub const ORIGIN_CELL: usize = 0;
pub const DESTINATION_CELL: usize = 1;
pub const PRICE_CELL: usize = 2;

/// Turns the rows of a load-board document into load records.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    equipment_type: String,
    load_source: Option<String>,
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_EQUIPMENT_TYPE)
    }
}

impl RecordExtractor {
    pub fn new(equipment_type: impl Into<String>) -> Self {
        Self {
            equipment_type: equipment_type.into(),
            load_source: None,
        }
    }

    /// Tag every record with the board it came from.
    pub fn with_load_source(mut self, source: impl Into<String>) -> Self {
        self.load_source = Some(source.into());
        self
    }

    /// Read every qualifying row, in document order.
    ///
    /// Rows that cannot become records are skipped, never reported.
    pub fn extract<D: DocumentScanner + ?Sized>(&self, document: &D) -> Vec<ExtractedRow> {
        let scanned_at = Utc::now();
        let rows = document.rows();
        let total = rows.len();

        let extracted: Vec<ExtractedRow> = rows
            .iter()
            .filter(|row| row.cells.len() >= MIN_CELLS)
            .filter_map(|row| match self.parse_row(row, scanned_at) {
                Ok(record) => Some(ExtractedRow {
                    position: row.position,
                    record,
                }),
                Err(e) => {
                    tracing::debug!(position = row.position, error = %e, "Skipping row");
                    None
                }
            })
            .collect();

        tracing::info!(rows = total, loads = extracted.len(), "Scanned document");
        extracted
    }

    /// Map one row's cells onto a record.
    pub fn parse_row(
        &self,
        row: &PageRow,
        scanned_at: DateTime<Utc>,
    ) -> Result<LoadRecord, ScoutError> {
        if row.cells.len() < MIN_CELLS {
            return Err(ScoutError::MalformedRow(format!(
                "row {} has {} cells, need {}",
                row.position,
                row.cells.len(),
                MIN_CELLS
            )));
        }

        let cell = |i: usize| row.cells[i].trim().to_string();
        let origin = cell(ORIGIN_CELL);
        let destination = cell(DESTINATION_CELL);
        if origin.is_empty() || destination.is_empty() {
            return Err(ScoutError::MalformedRow(format!(
                "row {} is missing origin or destination",
                row.position
            )));
        }

        Ok(LoadRecord {
            ref_id: generate_ref_id(row.position),
            origin,
            destination,
            price: cell(PRICE_CELL),
            equipment_type: self.equipment_type.clone(),
            pickup_date: scanned_at,
            load_source: self.load_source.clone(),
        })
    }
}

/// `REF-<0..100000>-<position>`; the position keeps it unique within a scan.
fn generate_ref_id(position: usize) -> String {
    let random = Uuid::new_v4().as_u128() % 100_000;
    format!("REF-{random}-{position}")
}
