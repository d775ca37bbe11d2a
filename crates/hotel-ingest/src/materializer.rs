//! Reference materialization
//!
//! Persists collected cities and regions in a single transaction and turns
//! the returned ids into [`EntityMapping`]s. Either every key gets an id or
//! the transaction is rolled back and nothing is kept.

use crate::collector::EntityCollector;
use crate::mapping::EntityMapping;
use crate::models::{CityKey, RegionKey};
use crate::store::ImportStore;
use hotel_common::Result;
use tracing::{debug, info, warn};

/// Ids for every parent a hotel row can reference
#[derive(Debug, Clone, Default)]
pub struct ReferenceMappings {
    pub cities: EntityMapping<CityKey>,
    pub regions: EntityMapping<RegionKey>,
}

pub async fn materialize<S: ImportStore>(
    store: &S,
    collected: &EntityCollector,
    batch_size: usize,
) -> Result<ReferenceMappings> {
    let mut tx = store.begin().await?;

    match write_parents(store, &mut tx, collected, batch_size).await {
        Ok(mappings) => {
            store.commit(tx).await?;
            info!(
                cities = mappings.cities.len(),
                regions = mappings.regions.len(),
                "Cities and regions committed"
            );
            Ok(mappings)
        }
        Err(e) => {
            if let Err(rollback) = store.rollback(tx).await {
                warn!(error = %rollback, "Rollback of reference transaction failed");
            }
            Err(e)
        }
    }
}

async fn write_parents<S: ImportStore>(
    store: &S,
    tx: &mut S::Tx,
    collected: &EntityCollector,
    batch_size: usize,
) -> Result<ReferenceMappings> {
    let batch_size = batch_size.max(1);
    let mut mappings = ReferenceMappings::default();

    let cities: Vec<CityKey> = collected.cities.iter().cloned().collect();
    for chunk in cities.chunks(batch_size) {
        for (key, id) in store.upsert_cities(tx, chunk).await? {
            mappings.cities.assign(key, id)?;
        }
        debug!(batch = chunk.len(), "City batch written");
    }

    let regions: Vec<RegionKey> = collected.regions.iter().cloned().collect();
    for chunk in regions.chunks(batch_size) {
        for (key, id) in store.upsert_regions(tx, chunk).await? {
            mappings.regions.assign(key, id)?;
        }
        debug!(batch = chunk.len(), "Region batch written");
    }

    mappings.cities.ensure_complete("city", &collected.cities)?;
    mappings.regions.ensure_complete("region", &collected.regions)?;

    Ok(mappings)
}
