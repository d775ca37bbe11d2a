//! Datastore interface
//!
//! The importers only talk to an [`ImportStore`]. Every write happens inside
//! a store transaction, so a failed call leaves nothing behind once the
//! transaction is rolled back.
//!
//! Two implementations ship with the crate:
//! - [`postgres::PgStore`] persists into PostgreSQL
//! - [`memory::MemoryStore`] keeps everything in process (dry runs, tests)

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{CityKey, HotelKey, NewHotel, NewReview, RegionKey};
use async_trait::async_trait;
use hotel_common::Result;
use std::collections::HashMap;

/// Transactional persistence for the import pipeline
#[async_trait]
pub trait ImportStore: Send + Sync + 'static {
    /// Open transaction handle
    type Tx: Send;

    /// Human readable backend name for logs
    fn backend(&self) -> &'static str;

    async fn begin(&self) -> Result<Self::Tx>;

    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    async fn rollback(&self, tx: Self::Tx) -> Result<()>;

    /// Insert cities that do not exist yet and return the id of every key,
    /// new or pre-existing.
    async fn upsert_cities(&self, tx: &mut Self::Tx, keys: &[CityKey]) -> Result<Vec<(CityKey, i32)>>;

    /// Same contract as [`ImportStore::upsert_cities`], for regions.
    async fn upsert_regions(
        &self,
        tx: &mut Self::Tx,
        keys: &[RegionKey],
    ) -> Result<Vec<(RegionKey, i32)>>;

    /// Insert hotels, skipping ids already present. Returns rows written.
    async fn insert_hotels(&self, tx: &mut Self::Tx, rows: &[NewHotel]) -> Result<u64>;

    /// Insert reviews, skipping duplicates. Returns rows written.
    async fn insert_reviews(&self, tx: &mut Self::Tx, rows: &[NewReview]) -> Result<u64>;

    /// Hotel name -> global property id for every stored hotel.
    ///
    /// When two hotels share a name the lowest id wins.
    async fn hotel_ids_by_name(&self) -> Result<HashMap<HotelKey, i32>>;
}

/// A row type the batch loader can persist
#[async_trait]
pub trait DependentRow: Sized + Send + Sync + 'static {
    /// Table name used in log fields
    const TABLE: &'static str;

    async fn insert_batch<S: ImportStore>(store: &S, tx: &mut S::Tx, rows: &[Self]) -> Result<u64>;
}

#[async_trait]
impl DependentRow for NewHotel {
    const TABLE: &'static str = "hotels";

    async fn insert_batch<S: ImportStore>(store: &S, tx: &mut S::Tx, rows: &[Self]) -> Result<u64> {
        store.insert_hotels(tx, rows).await
    }
}

#[async_trait]
impl DependentRow for NewReview {
    const TABLE: &'static str = "reviews";

    async fn insert_batch<S: ImportStore>(store: &S, tx: &mut S::Tx, rows: &[Self]) -> Result<u64> {
        store.insert_reviews(tx, rows).await
    }
}
