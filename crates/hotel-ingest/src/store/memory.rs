//! In-process store
//!
//! Mirrors the PostgreSQL adapter's conflict rules closely enough for dry
//! runs and pipeline tests. Writes are staged on the transaction and only
//! become visible on commit. Ids are handed out from shared counters, and
//! like database sequences they are not reused after a rollback.

use super::ImportStore;
use crate::models::{CityKey, HotelKey, NewHotel, NewReview, RegionKey};
use async_trait::async_trait;
use hotel_common::{ImportError, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    cities: HashMap<CityKey, i32>,
    regions: HashMap<RegionKey, i32>,
    hotels: BTreeMap<i32, NewHotel>,
    reviews: Vec<NewReview>,
    next_city_id: i32,
    next_region_id: i32,
    /// Row count of every dependent insert call, in call order
    submissions: Vec<usize>,
    /// 1-based dependent insert calls that must fail
    failing_submissions: HashSet<usize>,
    commits: u64,
    rollbacks: u64,
}

/// Writes staged by one transaction
#[derive(Debug, Default)]
pub struct MemoryTx {
    cities: Vec<(CityKey, i32)>,
    regions: Vec<(RegionKey, i32)>,
    hotels: Vec<NewHotel>,
    reviews: Vec<NewReview>,
}

/// Store backed by process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th dependent insert call (1-based) fail with a
    /// database error.
    pub async fn fail_submission(&self, n: usize) {
        self.state.lock().await.failing_submissions.insert(n);
    }

    /// Row counts of each dependent insert call so far
    pub async fn submissions(&self) -> Vec<usize> {
        self.state.lock().await.submissions.clone()
    }

    pub async fn cities(&self) -> HashMap<CityKey, i32> {
        self.state.lock().await.cities.clone()
    }

    pub async fn regions(&self) -> HashMap<RegionKey, i32> {
        self.state.lock().await.regions.clone()
    }

    pub async fn hotels(&self) -> Vec<NewHotel> {
        self.state.lock().await.hotels.values().cloned().collect()
    }

    pub async fn reviews(&self) -> Vec<NewReview> {
        self.state.lock().await.reviews.clone()
    }

    /// `(commits, rollbacks)` seen so far
    pub async fn transactions(&self) -> (u64, u64) {
        let state = self.state.lock().await;
        (state.commits, state.rollbacks)
    }

    async fn start_submission(&self, rows: usize) -> Result<()> {
        let mut state = self.state.lock().await;
        state.submissions.push(rows);
        let n = state.submissions.len();
        if state.failing_submissions.contains(&n) {
            return Err(ImportError::Database(sqlx::Error::Protocol(format!(
                "injected failure on submission {}",
                n
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl ImportStore for MemoryStore {
    type Tx = MemoryTx;

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<MemoryTx> {
        Ok(MemoryTx::default())
    }

    async fn commit(&self, tx: MemoryTx) -> Result<()> {
        let mut state = self.state.lock().await;
        state.cities.extend(tx.cities);
        state.regions.extend(tx.regions);
        for hotel in tx.hotels {
            state.hotels.entry(hotel.global_property_id).or_insert(hotel);
        }
        for review in tx.reviews {
            if !state.reviews.contains(&review) {
                state.reviews.push(review);
            }
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> Result<()> {
        self.state.lock().await.rollbacks += 1;
        Ok(())
    }

    async fn upsert_cities(&self, tx: &mut MemoryTx, keys: &[CityKey]) -> Result<Vec<(CityKey, i32)>> {
        let mut state = self.state.lock().await;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let staged = tx.cities.iter().find(|(k, _)| k == key).map(|(_, id)| *id);
            let id = match state.cities.get(key).copied().or(staged) {
                Some(id) => id,
                None => {
                    state.next_city_id += 1;
                    let id = state.next_city_id;
                    tx.cities.push((key.clone(), id));
                    id
                }
            };
            out.push((key.clone(), id));
        }
        Ok(out)
    }

    async fn upsert_regions(
        &self,
        tx: &mut MemoryTx,
        keys: &[RegionKey],
    ) -> Result<Vec<(RegionKey, i32)>> {
        let mut state = self.state.lock().await;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let staged = tx.regions.iter().find(|(k, _)| k == key).map(|(_, id)| *id);
            let id = match state.regions.get(key).copied().or(staged) {
                Some(id) => id,
                None => {
                    state.next_region_id += 1;
                    let id = state.next_region_id;
                    tx.regions.push((key.clone(), id));
                    id
                }
            };
            out.push((key.clone(), id));
        }
        Ok(out)
    }

    async fn insert_hotels(&self, tx: &mut MemoryTx, rows: &[NewHotel]) -> Result<u64> {
        self.start_submission(rows.len()).await?;

        let state = self.state.lock().await;
        let mut written = 0;
        for hotel in rows {
            if hotel.city_id <= 0 || hotel.region_id <= 0 {
                return Err(ImportError::Database(sqlx::Error::Protocol(format!(
                    "hotel {} references city {} / region {}",
                    hotel.global_property_id, hotel.city_id, hotel.region_id
                ))));
            }
            let id = hotel.global_property_id;
            let seen = state.hotels.contains_key(&id)
                || tx.hotels.iter().any(|h| h.global_property_id == id);
            if !seen {
                tx.hotels.push(hotel.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn insert_reviews(&self, tx: &mut MemoryTx, rows: &[NewReview]) -> Result<u64> {
        self.start_submission(rows.len()).await?;

        let state = self.state.lock().await;
        let mut written = 0;
        for review in rows {
            if !state.hotels.contains_key(&review.global_property_id) {
                return Err(ImportError::Database(sqlx::Error::Protocol(format!(
                    "review references unknown hotel {}",
                    review.global_property_id
                ))));
            }
            // only a review identical in every column is a duplicate
            let seen = state.reviews.contains(review) || tx.reviews.contains(review);
            if !seen {
                tx.reviews.push(review.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn hotel_ids_by_name(&self) -> Result<HashMap<HotelKey, i32>> {
        let state = self.state.lock().await;
        let mut ids = HashMap::new();
        // ascending id order, so the first insert per name is the lowest id
        for (id, hotel) in &state.hotels {
            ids.entry(HotelKey(hotel.name.trim().to_string())).or_insert(*id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_is_stable_across_transactions() {
        let store = MemoryStore::new();
        let keys = vec![CityKey::new("Paris", "FR"), CityKey::new("Rome", "IT")];

        let mut tx = store.begin().await.unwrap();
        let first = store.upsert_cities(&mut tx, &keys).await.unwrap();
        store.commit(tx).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let second = store.upsert_cities(&mut tx, &keys).await.unwrap();
        store.commit(tx).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.cities().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_rows() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        store
            .upsert_regions(&mut tx, &[RegionKey("Lazio".into())])
            .await
            .unwrap();
        store.rollback(tx).await.unwrap();

        assert!(store.regions().await.is_empty());
        assert_eq!(store.transactions().await, (0, 1));
    }

    #[tokio::test]
    async fn test_hotel_lookup_trims_names() {
        let store = MemoryStore::new();
        let hotel = NewHotel {
            global_property_id: 42,
            source_property_id: "SRC-42".into(),
            name: "  Hotel Padded ".into(),
            chain_code: "CH".into(),
            address_1: "1 Rue".into(),
            address_2: None,
            airport_code: "CDG".into(),
            city_id: 1,
            region_id: 1,
            zip_postal: "75001".into(),
            phone_number: "+33".into(),
            fax_number: None,
            sabre_rating: 4.0,
            latitude: 48.0,
            longitude: 2.0,
            source_group_code: "G".into(),
        };
        let mut tx = store.begin().await.unwrap();
        store.insert_hotels(&mut tx, &[hotel]).await.unwrap();
        store.commit(tx).await.unwrap();

        let ids = store.hotel_ids_by_name().await.unwrap();
        assert_eq!(ids.get(&HotelKey("Hotel Padded".into())), Some(&42));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryStore::new();
        store.fail_submission(2).await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(store.insert_hotels(&mut tx, &[]).await.unwrap(), 0);
        assert!(store.insert_hotels(&mut tx, &[]).await.is_err());
        assert_eq!(store.submissions().await, vec![0, 0]);
    }
}
