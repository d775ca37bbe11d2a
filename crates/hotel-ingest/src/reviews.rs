//! Review import
//!
//! Reviews name their hotel instead of carrying its id. The name -> id map
//! is read from the store up front (LOAD_REFERENCES), then a single pass over
//! the comma separated export loads reviews in batches (LOAD_BATCHES).

use crate::config::ImportConfig;
use crate::ledger::{SkipLedger, HOTEL_NOT_FOUND};
use crate::loader;
use crate::mapping::EntityMapping;
use crate::models::{HotelKey, NewReview, ReviewRecord};
use crate::progress::RowProgress;
use crate::report::{ImportKind, ImportPhase, ImportReport, ParentCounts};
use crate::source::{CsvSource, RawRecord};
use crate::store::ImportStore;
use chrono::Utc;
use hotel_common::{ImportError, Result};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub struct ReviewImporter<S> {
    store: Arc<S>,
    source: CsvSource,
    config: ImportConfig,
    progress: RowProgress,
    run_id: Uuid,
    phase: ImportPhase,
    ledger: SkipLedger,
}

impl<S: ImportStore> ReviewImporter<S> {
    pub fn new(store: Arc<S>, source: CsvSource, config: ImportConfig) -> Self {
        Self {
            store,
            source,
            config,
            progress: RowProgress::hidden(),
            run_id: Uuid::new_v4(),
            phase: ImportPhase::Start,
            ledger: SkipLedger::new(),
        }
    }

    pub fn with_progress(mut self, progress: RowProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    pub async fn run(&mut self) -> Result<ImportReport> {
        if self.phase != ImportPhase::Start {
            return Err(ImportError::config(format!(
                "import {} already ran (phase {})",
                self.run_id, self.phase
            )));
        }

        let span = info_span!(
            "review_import",
            run_id = %self.run_id,
            source = %self.source.path().display()
        );

        async move {
            let result = self.execute().await;
            if let Err(e) = &result {
                let failed_in = self.phase;
                self.advance(ImportPhase::Failed);
                self.progress.abandon();
                error!(phase = %failed_in, error = %e, "Review import failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&mut self) -> Result<ImportReport> {
        self.config.validate()?;
        let started_at = Utc::now();
        info!(
            batch_size = self.config.batch_size,
            on_batch_failure = %self.config.on_batch_failure,
            backend = self.store.backend(),
            "Starting review import"
        );

        self.advance(ImportPhase::LoadReferences);
        let hotels: EntityMapping<HotelKey> =
            self.store.hotel_ids_by_name().await?.into_iter().collect();
        info!(hotels = hotels.len(), "Loaded hotel references");
        if hotels.is_empty() {
            warn!("No hotels in the database; every review will be skipped");
        }

        self.advance(ImportPhase::LoadBatches);
        let outcome = loader::load(
            Arc::clone(&self.store),
            &self.source,
            &self.config,
            &mut self.ledger,
            &self.progress,
            |row| resolve_review(row, &hotels),
        )
        .await?;

        self.advance(ImportPhase::Done);
        self.progress.finish("Reviews imported");

        Ok(ImportReport {
            run_id: self.run_id,
            kind: ImportKind::Reviews,
            source: self.source.path().display().to_string(),
            rows_processed: outcome.rows_processed,
            rows_queued: outcome.rows_queued,
            rows_inserted: outcome.writer.rows_inserted,
            batches_committed: outcome.writer.batches_committed,
            batches_failed: outcome.writer.batches_failed,
            parents: ParentCounts {
                hotels: hotels.len(),
                ..Default::default()
            },
            skipped: std::mem::take(&mut self.ledger),
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn advance(&mut self, next: ImportPhase) {
        if !self.phase.can_advance_to(next, ImportKind::Reviews) {
            error!(from = %self.phase, to = %next, "Unexpected phase transition");
        }
        info!(from = %self.phase, to = %next, "Phase");
        self.phase = next;
    }
}

/// Validate a review row and attach its hotel id.
pub fn resolve_review(
    row: &RawRecord,
    hotels: &EntityMapping<HotelKey>,
) -> std::result::Result<NewReview, String> {
    let review = ReviewRecord::parse(row).map_err(|rejection| rejection.reason())?;
    match hotels.get(&review.hotel_key()) {
        Some(id) => Ok(review.resolve(id)),
        None => Err(HOTEL_NOT_FOUND.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::review_columns as r;

    fn row(hotel: &str, cleanliness: &str) -> RawRecord {
        RawRecord::from_pairs([
            (r::HOTEL_NAME, hotel),
            (r::REVIEWER_NAME, "Ana"),
            (r::REVIEW_TITLE, "Lovely"),
            (r::REVIEW_CONTENT, "Great stay"),
            (r::VALUE_RATING, "4"),
            (r::LOCATION_RATING, "5"),
            (r::SERVICE_RATING, "4.5"),
            (r::ROOMS_RATING, "4"),
            (r::CLEANLINESS_RATING, cleanliness),
            (r::SLEEP_QUALITY_RATING, "3.5"),
        ])
    }

    fn hotels() -> EntityMapping<HotelKey> {
        [(HotelKey("Hotel Lutetia".into()), 1001)].into_iter().collect()
    }

    #[test]
    fn test_resolve_review() {
        let review = resolve_review(&row("Hotel Lutetia", "5"), &hotels()).unwrap();
        assert_eq!(review.global_property_id, 1001);
    }

    #[test]
    fn test_unknown_hotel() {
        assert_eq!(
            resolve_review(&row("Ritz", "5"), &hotels()).unwrap_err(),
            HOTEL_NOT_FOUND
        );
    }

    #[test]
    fn test_rating_checked_before_hotel_lookup() {
        assert_eq!(
            resolve_review(&row("Ritz", "0.5"), &hotels()).unwrap_err(),
            "Invalid CleanlinessRating (must be between 1.0 and 5.0)"
        );
    }
}
