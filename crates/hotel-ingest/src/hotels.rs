//! Hotel import
//!
//! Two passes over a tab separated hotel export:
//!
//! 1. **COLLECT_ENTITIES** gathers unique cities and regions
//! 2. **MATERIALIZE_REFERENCES** persists them and records their ids
//! 3. **LOAD_BATCHES** re-reads the file and loads hotels in batches
//!
//! An importer runs once. Calling [`HotelImporter::run`] again, even after a
//! failure, is refused; a failed run starts again from the top with a new
//! importer.

use crate::collector::EntityCollector;
use crate::config::ImportConfig;
use crate::ledger::{SkipLedger, MISSING_CITY_OR_REGION};
use crate::loader;
use crate::materializer::{self, ReferenceMappings};
use crate::models::{HotelRecord, NewHotel};
use crate::progress::RowProgress;
use crate::report::{ImportKind, ImportPhase, ImportReport, ParentCounts};
use crate::source::{CsvSource, RawRecord};
use crate::store::ImportStore;
use chrono::Utc;
use hotel_common::{ImportError, Result};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub struct HotelImporter<S> {
    store: Arc<S>,
    source: CsvSource,
    config: ImportConfig,
    progress: RowProgress,
    run_id: Uuid,
    phase: ImportPhase,
    ledger: SkipLedger,
}

impl<S: ImportStore> HotelImporter<S> {
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

    /// Run the import to completion. The phase is left at `Done` or `Failed`.
    pub async fn run(&mut self) -> Result<ImportReport> {
        if self.phase != ImportPhase::Start {
            return Err(ImportError::config(format!(
                "import {} already ran (phase {})",
                self.run_id, self.phase
            )));
        }

        let span = info_span!(
            "hotel_import",
            run_id = %self.run_id,
            source = %self.source.path().display()
        );

        async move {
            match self.execute().await {
                Ok(report) => Ok(report),
                Err(e) => {
                    let failed_in = self.phase;
                    self.advance(ImportPhase::Failed);
                    self.progress.abandon();
                    error!(phase = %failed_in, error = %e, "Hotel import failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&mut self) -> Result<ImportReport> {
        self.config.validate()?;
        let started_at = Utc::now();
        info!(
            batch_size = self.config.batch_size,
            max_pending_batches = self.config.max_pending_batches,
            on_batch_failure = %self.config.on_batch_failure,
            backend = self.store.backend(),
            "Starting hotel import"
        );

        self.advance(ImportPhase::CollectEntities);
        let collected = EntityCollector::collect(&self.source, &self.progress).await?;

        self.advance(ImportPhase::MaterializeReferences);
        let mappings =
            materializer::materialize(self.store.as_ref(), &collected, self.config.batch_size)
                .await?;

        self.advance(ImportPhase::LoadBatches);
        let outcome = loader::load(
            Arc::clone(&self.store),
            &self.source,
            &self.config,
            &mut self.ledger,
            &self.progress,
            |row| resolve_hotel(row, &mappings),
        )
        .await?;

        self.advance(ImportPhase::Done);
        self.progress.finish("Hotels imported");

        Ok(ImportReport {
            run_id: self.run_id,
            kind: ImportKind::Hotels,
            source: self.source.path().display().to_string(),
            rows_processed: outcome.rows_processed,
            rows_queued: outcome.rows_queued,
            rows_inserted: outcome.writer.rows_inserted,
            batches_committed: outcome.writer.batches_committed,
            batches_failed: outcome.writer.batches_failed,
            parents: ParentCounts {
                cities: mappings.cities.len(),
                regions: mappings.regions.len(),
                hotels: 0,
            },
            skipped: std::mem::take(&mut self.ledger),
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn advance(&mut self, next: ImportPhase) {
        if !self.phase.can_advance_to(next, ImportKind::Hotels) {
            error!(from = %self.phase, to = %next, "Unexpected phase transition");
        }
        info!(from = %self.phase, to = %next, "Phase");
        self.phase = next;
    }
}

/// Validate a hotel row and attach its city and region ids.
pub fn resolve_hotel(
    row: &RawRecord,
    mappings: &ReferenceMappings,
) -> std::result::Result<NewHotel, String> {
    let hotel = HotelRecord::parse(row).map_err(|rejection| rejection.reason())?;

    match (
        mappings.cities.get(&hotel.city_key()),
        mappings.regions.get(&hotel.region_key()),
    ) {
        (Some(city_id), Some(region_id)) => Ok(hotel.resolve(city_id, region_id)),
        _ => Err(MISSING_CITY_OR_REGION.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::hotel_columns as h;
    use crate::models::{CityKey, RegionKey};

    fn row(city: &str, region: &str) -> RawRecord {
        RawRecord::from_pairs([
            (h::GLOBAL_PROPERTY_ID, "10"),
            (h::SOURCE_PROPERTY_ID, "S"),
            (h::GLOBAL_PROPERTY_NAME, "Hotel"),
            (h::GLOBAL_CHAIN_CODE, "CC"),
            (h::ADDRESS_1, "1 Main St"),
            (h::PRIMARY_AIRPORT_CODE, "XXX"),
            (h::CITY_NAME, city),
            (h::STATE_PROVINCE, region),
            (h::ZIP_POSTAL, "00000"),
            (h::COUNTRY_CODE, "FR"),
            (h::PHONE_NUMBER, "555"),
            (h::SABRE_RATING, "3.0"),
            (h::LATITUDE, "1.0"),
            (h::LONGITUDE, "2.0"),
            (h::SOURCE_GROUP_CODE, "G"),
        ])
    }

    fn mappings() -> ReferenceMappings {
        let mut m = ReferenceMappings::default();
        m.cities.assign(CityKey::new("Paris", "FR"), 3).unwrap();
        m.regions.assign(RegionKey("IDF".into()), 4).unwrap();
        m
    }

    #[test]
    fn test_resolve_hotel() {
        let hotel = resolve_hotel(&row("Paris", "IDF"), &mappings()).unwrap();
        assert_eq!((hotel.city_id, hotel.region_id), (3, 4));
    }

    #[test]
    fn test_resolve_hotel_missing_mapping() {
        assert_eq!(
            resolve_hotel(&row("Lyon", "IDF"), &mappings()).unwrap_err(),
            MISSING_CITY_OR_REGION
        );
        assert_eq!(
            resolve_hotel(&row("Paris", "Occitanie"), &mappings()).unwrap_err(),
            MISSING_CITY_OR_REGION
        );
    }

    #[test]
    fn test_resolve_hotel_invalid_row() {
        let reason = resolve_hotel(&row("", "IDF"), &mappings()).unwrap_err();
        assert_eq!(reason, "Missing required field: Property City Name");
    }
}
