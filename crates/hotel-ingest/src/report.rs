//! Run phases and the final import report

use crate::ledger::SkipLedger;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Which file an import run consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Hotels,
    Reviews,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hotels => f.write_str("hotels"),
            Self::Reviews => f.write_str("reviews"),
        }
    }
}

/// Import state machine.
///
/// Hotels: `Start -> CollectEntities -> MaterializeReferences -> LoadBatches -> Done`.
/// Reviews: `Start -> LoadReferences -> LoadBatches -> Done`.
/// `Failed` can follow any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportPhase {
    Start,
    CollectEntities,
    MaterializeReferences,
    LoadReferences,
    LoadBatches,
    Done,
    Failed,
}

impl ImportPhase {
    /// Whether `next` may follow `self` for the given import kind
    pub fn can_advance_to(self, next: ImportPhase, kind: ImportKind) -> bool {
        use ImportPhase::*;
        if next == Failed {
            return !matches!(self, Done | Failed);
        }
        match kind {
            ImportKind::Hotels => matches!(
                (self, next),
                (Start, CollectEntities)
                    | (CollectEntities, MaterializeReferences)
                    | (MaterializeReferences, LoadBatches)
                    | (LoadBatches, Done)
            ),
            ImportKind::Reviews => matches!(
                (self, next),
                (Start, LoadReferences) | (LoadReferences, LoadBatches) | (LoadBatches, Done)
            ),
        }
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::CollectEntities => "COLLECT_ENTITIES",
            Self::MaterializeReferences => "MATERIALIZE_REFERENCES",
            Self::LoadReferences => "LOAD_REFERENCES",
            Self::LoadBatches => "LOAD_BATCHES",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Distinct parents persisted or loaded before the batch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParentCounts {
    pub cities: usize,
    pub regions: usize,
    pub hotels: usize,
}

/// Outcome of a completed import run
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub run_id: Uuid,
    pub kind: ImportKind,
    pub source: String,
    /// Data rows read during the loading pass
    pub rows_processed: u64,
    /// Rows handed to the writer
    pub rows_queued: u64,
    /// Rows the datastore reported as written
    pub rows_inserted: u64,
    pub batches_committed: u64,
    pub batches_failed: u64,
    pub parents: ParentCounts,
    pub skipped: SkipLedger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ImportReport {
    /// Rows queued but ignored as duplicates by the datastore
    pub fn rows_already_present(&self) -> u64 {
        let lost = self.skipped.count(crate::ledger::BATCH_FAILED);
        self.rows_queued
            .saturating_sub(lost)
            .saturating_sub(self.rows_inserted)
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Log the summary block
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            kind = %self.kind,
            source = %self.source,
            rows_processed = self.rows_processed,
            rows_queued = self.rows_queued,
            rows_inserted = self.rows_inserted,
            rows_already_present = self.rows_already_present(),
            batches_committed = self.batches_committed,
            batches_failed = self.batches_failed,
            cities = self.parents.cities,
            regions = self.parents.regions,
            hotels = self.parents.hotels,
            skipped = self.skipped.total(),
            elapsed_ms = self.elapsed_ms(),
            "Import completed"
        );
        for (reason, count) in self.skipped.iter() {
            tracing::info!(reason, count, "Skipped rows");
        }
    }
}
