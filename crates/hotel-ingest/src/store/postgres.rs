//! PostgreSQL store
//!
//! Multi-row statements are built with [`QueryBuilder`]. A single statement
//! is capped at [`BIND_LIMIT`] parameters, so large batches are split into
//! several statements inside the same transaction.

use super::ImportStore;
use crate::models::{CityKey, HotelKey, NewHotel, NewReview, RegionKey};
use async_trait::async_trait;
use hotel_common::Result;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Bind parameter ceiling for one PostgreSQL statement
pub const BIND_LIMIT: usize = 65_535;

const HOTEL_COLUMNS: usize = 16;
const REVIEW_COLUMNS: usize = 10;

/// Rows per statement for a table with `columns` bound values per row
fn rows_per_statement(columns: usize) -> usize {
    (BIND_LIMIT / columns).max(1)
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ImportStore for PgStore {
    type Tx = Transaction<'static, Postgres>;

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<()> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<()> {
        tx.rollback().await?;
        Ok(())
    }

    #[instrument(skip_all, fields(keys = keys.len()))]
    async fn upsert_cities(&self, tx: &mut Self::Tx, keys: &[CityKey]) -> Result<Vec<(CityKey, i32)>> {
        let mut ids = Vec::with_capacity(keys.len());

        for chunk in keys.chunks(rows_per_statement(2)) {
            let mut qb: QueryBuilder<'_, Postgres> =
                QueryBuilder::new("INSERT INTO cities (city_name, country) ");
            qb.push_values(chunk, |mut b, key| {
                b.push_bind(&key.name).push_bind(&key.country);
            });
            // DO UPDATE so that pre-existing rows also come back from RETURNING
            qb.push(
                " ON CONFLICT (city_name, country) DO UPDATE SET city_name = EXCLUDED.city_name \
                 RETURNING city_id, city_name, country",
            );

            let rows: Vec<(i32, String, String)> =
                qb.build_query_as().fetch_all(&mut **tx).await?;
            ids.extend(
                rows.into_iter()
                    .map(|(id, name, country)| (CityKey { name, country }, id)),
            );
        }

        debug!(returned = ids.len(), "Upserted cities");
        Ok(ids)
    }

    #[instrument(skip_all, fields(keys = keys.len()))]
    async fn upsert_regions(
        &self,
        tx: &mut Self::Tx,
        keys: &[RegionKey],
    ) -> Result<Vec<(RegionKey, i32)>> {
        let mut ids = Vec::with_capacity(keys.len());

        for chunk in keys.chunks(rows_per_statement(1)) {
            let mut qb: QueryBuilder<'_, Postgres> =
                QueryBuilder::new("INSERT INTO regions (region_name) ");
            qb.push_values(chunk, |mut b, key| {
                b.push_bind(&key.0);
            });
            qb.push(
                " ON CONFLICT (region_name) DO UPDATE SET region_name = EXCLUDED.region_name \
                 RETURNING region_id, region_name",
            );

            let rows: Vec<(i32, String)> = qb.build_query_as().fetch_all(&mut **tx).await?;
            ids.extend(rows.into_iter().map(|(id, name)| (RegionKey(name), id)));
        }

        debug!(returned = ids.len(), "Upserted regions");
        Ok(ids)
    }

    async fn insert_hotels(&self, tx: &mut Self::Tx, rows: &[NewHotel]) -> Result<u64> {
        let mut written = 0;

        for chunk in rows.chunks(rows_per_statement(HOTEL_COLUMNS)) {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO hotels (global_property_id, source_property_id, global_property_name, \
                 global_chain_code, property_address_1, property_address_2, primary_airport_code, \
                 city_id, region_id, property_zip_postal, property_phone_number, \
                 property_fax_number, sabre_property_rating, property_latitude, \
                 property_longitude, source_group_code) ",
            );
            qb.push_values(chunk, |mut b, h| {
                b.push_bind(h.global_property_id)
                    .push_bind(&h.source_property_id)
                    .push_bind(&h.name)
                    .push_bind(&h.chain_code)
                    .push_bind(&h.address_1)
                    .push_bind(h.address_2.as_deref())
                    .push_bind(&h.airport_code)
                    .push_bind(h.city_id)
                    .push_bind(h.region_id)
                    .push_bind(&h.zip_postal)
                    .push_bind(&h.phone_number)
                    .push_bind(h.fax_number.as_deref())
                    .push_bind(h.sabre_rating)
                    .push_bind(h.latitude)
                    .push_bind(h.longitude)
                    .push_bind(&h.source_group_code);
            });
            qb.push(" ON CONFLICT (global_property_id) DO NOTHING");

            written += qb.build().execute(&mut **tx).await?.rows_affected();
        }

        Ok(written)
    }

    async fn insert_reviews(&self, tx: &mut Self::Tx, rows: &[NewReview]) -> Result<u64> {
        let mut written = 0;

        for chunk in rows.chunks(rows_per_statement(REVIEW_COLUMNS)) {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO reviews (global_property_id, reviewer_name, review_title, \
                 review_content, value_rating, location_rating, service_rating, rooms_rating, \
                 cleanliness_rating, sleep_quality_rating) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(r.global_property_id)
                    .push_bind(&r.reviewer_name)
                    .push_bind(&r.title)
                    .push_bind(&r.content)
                    .push_bind(r.ratings.value)
                    .push_bind(r.ratings.location)
                    .push_bind(r.ratings.service)
                    .push_bind(r.ratings.rooms)
                    .push_bind(r.ratings.cleanliness)
                    .push_bind(r.ratings.sleep_quality);
            });
            // no conflict target: only the identical-row index can fire
            qb.push(" ON CONFLICT DO NOTHING");

            written += qb.build().execute(&mut **tx).await?.rows_affected();
        }

        Ok(written)
    }

    async fn hotel_ids_by_name(&self) -> Result<HashMap<HotelKey, i32>> {
        let rows: Vec<(String, i32)> = sqlx::query_as(
            "SELECT DISTINCT ON (TRIM(global_property_name)) TRIM(global_property_name), \
             global_property_id \
             FROM hotels \
             ORDER BY TRIM(global_property_name), global_property_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, id)| (HotelKey(name), id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_per_statement_stays_under_bind_limit() {
        assert_eq!(rows_per_statement(HOTEL_COLUMNS), 4095);
        assert!(rows_per_statement(REVIEW_COLUMNS) * REVIEW_COLUMNS <= BIND_LIMIT);
        assert_eq!(rows_per_statement(BIND_LIMIT + 1), 1);
    }
}
