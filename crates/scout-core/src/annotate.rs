use crate::extract::PRICE_CELL;
use crate::models::ExtractedRow;
use crate::reward::{Reward, RewardCalculator};
use crate::traits::DocumentScanner;

/// Class carried by every inserted badge; used to detect earlier insertions.
pub const BADGE_CLASS: &str = "gc-scout-badge";

/// Counts from one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationSummary {
    /// Rows priced at or above the high-value threshold.
    pub high_value: usize,
    /// Badges inserted by this pass.
    pub badges_added: usize,
}

/// Marks high-value rows of a live document with a reward badge.
///
/// Insertion is idempotent: the document itself is asked whether a row is
/// already badged right before each insertion, so repeated passes over the
/// same document never stack badges.
#[derive(Debug, Clone, Default)]
pub struct AnnotationEngine {
    calculator: RewardCalculator,
}

impl AnnotationEngine {
    pub fn new(calculator: RewardCalculator) -> Self {
        Self { calculator }
    }

    pub fn calculator(&self) -> &RewardCalculator {
        &self.calculator
    }

    /// Badge the row at `position` if `reward` qualifies and the row has no
    /// badge yet. Returns true when a badge was inserted.
    pub fn annotate_row<D: DocumentScanner + ?Sized>(
        &self,
        document: &mut D,
        position: usize,
        reward: &Reward,
    ) -> bool {
        if !reward.qualifies() || document.has_badge(position) {
            return false;
        }
        document.insert_badge(position, PRICE_CELL, &reward.badge())
    }

    /// Badge every qualifying row in `rows`.
    pub fn annotate<D: DocumentScanner + ?Sized>(
        &self,
        document: &mut D,
        rows: &[ExtractedRow],
    ) -> AnnotationSummary {
        let mut summary = AnnotationSummary::default();
        for row in rows {
            let reward = self.calculator.compute(&row.record.price);
            if reward.qualifies() {
                summary.high_value += 1;
            }
            if self.annotate_row(document, row.position, &reward) {
                summary.badges_added += 1;
            }
        }
        if summary.badges_added > 0 {
            tracing::debug!(added = summary.badges_added, "Inserted reward badges");
        }
        summary
    }
}
