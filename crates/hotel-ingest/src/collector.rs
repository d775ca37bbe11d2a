//! Entity collection: first pass over the hotel file
//!
//! Builds the deduplicated city and region key sets. Invalid rows are passed
//! over silently; the loading pass is the one that records them.

use crate::models::{CityKey, HotelRecord, RegionKey};
use crate::progress::RowProgress;
use crate::source::{CsvSource, RawRecord};
use futures::StreamExt;
use hotel_common::Result;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Parent keys referenced by valid hotel rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityCollector {
    pub cities: BTreeSet<CityKey>,
    pub regions: BTreeSet<RegionKey>,
    pub rows_seen: u64,
    pub rows_valid: u64,
}

impl EntityCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the keys of one row, if it is valid.
    pub fn observe(&mut self, row: &RawRecord) {
        self.rows_seen += 1;
        if let Ok(hotel) = HotelRecord::parse(row) {
            self.rows_valid += 1;
            self.cities.insert(hotel.city_key());
            self.regions.insert(hotel.region_key());
        }
    }

    /// Run a full pass over `source`.
    pub async fn collect(source: &CsvSource, progress: &RowProgress) -> Result<Self> {
        let mut collector = Self::new();
        let mut rows = source.open().await?;

        progress.start_pass("Collecting cities and regions");
        while let Some(row) = rows.next().await {
            collector.observe(&row?);
            progress.inc();
        }

        info!(
            rows = collector.rows_seen,
            valid_rows = collector.rows_valid,
            cities = collector.cities.len(),
            regions = collector.regions.len(),
            "Collected unique cities and regions"
        );
        debug!(cities = ?collector.cities.iter().take(10).collect::<Vec<_>>(), "City sample");

        Ok(collector)
    }
}
