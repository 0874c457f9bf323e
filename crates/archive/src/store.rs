//! Archive read and write operations.
//!
//! Table and column names come from the kind/field descriptors so a single
//! code path serves chlorophyll and both current components; sqlx binds
//! every value.

use chrono::{DateTime, Utc};
use tracing::debug;

use ocean_common::{
    BoundingBox, ChlorophyllRecord, CurrentsRecord, GridPoint, OceanError, OceanResult,
    ScalarField, ScalarObservation, StoreKind, VariableKind,
};

use crate::grid::materialize_grid;
use crate::Archive;

impl Archive {
    /// Bulk-insert chlorophyll records into the chosen store.
    ///
    /// Runs in a single transaction; partial success is not possible.
    /// Replayed rows hit the unique key and are dropped silently, which
    /// keeps re-ingestion of an unchanged window idempotent.
    pub async fn save_chlorophyll(
        &self,
        records: &[ChlorophyllRecord],
        which: StoreKind,
    ) -> OceanResult<()> {
        let sql = format!(
            "INSERT INTO {} (measurement_time, location, chlor_a) \
             VALUES ($1, ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography, $4) \
             ON CONFLICT (measurement_time, location) DO NOTHING",
            VariableKind::Chlorophyll.table(which)
        );

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| db_err("error starting transaction", e))?;

        for record in records {
            sqlx::query(&sql)
                .bind(record.measurement_time)
                .bind(record.longitude)
                .bind(record.latitude)
                .bind(record.chlor_a)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_err("error inserting chlorophyll data", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_err("error committing transaction", e))?;

        debug!(count = records.len(), store = ?which, "saved chlorophyll records");
        Ok(())
    }

    /// Bulk-insert currents records into the chosen store.
    pub async fn save_currents(
        &self,
        records: &[CurrentsRecord],
        which: StoreKind,
    ) -> OceanResult<()> {
        let sql = format!(
            "INSERT INTO {} (measurement_time, location, u_current, v_current) \
             VALUES ($1, ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography, $4, $5) \
             ON CONFLICT (measurement_time, location) DO NOTHING",
            VariableKind::Currents.table(which)
        );

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| db_err("error starting transaction", e))?;

        for record in records {
            sqlx::query(&sql)
                .bind(record.measurement_time)
                .bind(record.longitude)
                .bind(record.latitude)
                .bind(record.u_current)
                .bind(record.v_current)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_err("error inserting currents data", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_err("error committing transaction", e))?;

        debug!(count = records.len(), store = ?which, "saved currents records");
        Ok(())
    }

    /// Newest measurement time in the canonical store; epoch-0 when empty.
    pub async fn latest_time(&self, kind: VariableKind) -> OceanResult<DateTime<Utc>> {
        let sql = format!(
            "SELECT COALESCE(MAX(measurement_time), 'epoch'::timestamptz) FROM {}",
            kind.table(StoreKind::Canonical)
        );

        let row: (DateTime<Utc>,) = sqlx::query_as(&sql)
            .fetch_one(self.pool())
            .await
            .map_err(|e| db_err("error reading latest timestamp", e))?;

        Ok(row.0)
    }

    /// Chlorophyll records inside a time range and bounding box, ordered by
    /// measurement time ascending.
    pub async fn query_chlorophyll(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bbox: &BoundingBox,
        which: StoreKind,
    ) -> OceanResult<Vec<ChlorophyllRecord>> {
        let sql = format!(
            "SELECT id, measurement_time, \
                    ST_Y(location::geometry) AS latitude, \
                    ST_X(location::geometry) AS longitude, \
                    chlor_a, created_at \
             FROM {} \
             WHERE measurement_time BETWEEN $1 AND $2 \
               AND ST_Intersects(location::geometry, ST_MakeEnvelope($3, $4, $5, $6, 4326)) \
             ORDER BY measurement_time",
            VariableKind::Chlorophyll.table(which)
        );

        let rows: Vec<(i64, DateTime<Utc>, f64, f64, f32, DateTime<Utc>)> = sqlx::query_as(&sql)
            .bind(start)
            .bind(end)
            .bind(bbox.min_lon)
            .bind(bbox.min_lat)
            .bind(bbox.max_lon)
            .bind(bbox.max_lat)
            .fetch_all(self.pool())
            .await
            .map_err(|e| db_err("error querying chlorophyll data", e))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, measurement_time, latitude, longitude, chlor_a, created_at)| {
                    ChlorophyllRecord {
                        id: Some(id),
                        measurement_time,
                        latitude,
                        longitude,
                        chlor_a,
                        created_at: Some(created_at),
                    }
                },
            )
            .collect())
    }

    /// Currents records inside a time range and bounding box, ordered by
    /// measurement time ascending.
    pub async fn query_currents(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bbox: &BoundingBox,
        which: StoreKind,
    ) -> OceanResult<Vec<CurrentsRecord>> {
        let sql = format!(
            "SELECT id, measurement_time, \
                    ST_Y(location::geometry) AS latitude, \
                    ST_X(location::geometry) AS longitude, \
                    u_current, v_current, created_at \
             FROM {} \
             WHERE measurement_time BETWEEN $1 AND $2 \
               AND ST_Intersects(location::geometry, ST_MakeEnvelope($3, $4, $5, $6, 4326)) \
             ORDER BY measurement_time",
            VariableKind::Currents.table(which)
        );

        let rows: Vec<(i64, DateTime<Utc>, f64, f64, f32, f32, DateTime<Utc>)> =
            sqlx::query_as(&sql)
                .bind(start)
                .bind(end)
                .bind(bbox.min_lon)
                .bind(bbox.min_lat)
                .bind(bbox.max_lon)
                .bind(bbox.max_lat)
                .fetch_all(self.pool())
                .await
                .map_err(|e| db_err("error querying currents data", e))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, measurement_time, latitude, longitude, u_current, v_current, created_at)| {
                    CurrentsRecord {
                        id: Some(id),
                        measurement_time,
                        latitude,
                        longitude,
                        u_current,
                        v_current,
                        created_at: Some(created_at),
                    }
                },
            )
            .collect())
    }

    /// Distinct observation locations in the canonical store.
    pub async fn all_locations(&self, kind: VariableKind) -> OceanResult<Vec<GridPoint>> {
        let sql = format!(
            "SELECT DISTINCT ST_Y(location::geometry) AS latitude, \
                             ST_X(location::geometry) AS longitude \
             FROM {}",
            kind.table(StoreKind::Canonical)
        );

        let rows: Vec<(f64, f64)> = sqlx::query_as(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| db_err("error querying locations", e))?;

        Ok(rows
            .into_iter()
            .map(|(latitude, longitude)| GridPoint {
                latitude,
                longitude,
            })
            .collect())
    }

    /// Distinct measurement times in the canonical store, ascending.
    pub async fn all_timestamps(&self, kind: VariableKind) -> OceanResult<Vec<DateTime<Utc>>> {
        let sql = format!(
            "SELECT DISTINCT measurement_time FROM {} ORDER BY measurement_time",
            kind.table(StoreKind::Canonical)
        );

        let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| db_err("error querying timestamps", e))?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    /// One scalar field's time series at a fixed location, ordered by
    /// measurement time ascending. Canonical store only.
    pub async fn series_at_location(
        &self,
        field: ScalarField,
        point: GridPoint,
    ) -> OceanResult<Vec<ScalarObservation>> {
        let sql = format!(
            "SELECT id, measurement_time, \
                    ST_Y(location::geometry) AS latitude, \
                    ST_X(location::geometry) AS longitude, \
                    {}, created_at \
             FROM {} \
             WHERE ST_Equals(location::geometry, ST_SetSRID(ST_MakePoint($1, $2), 4326)) \
             ORDER BY measurement_time",
            field.column(),
            field.kind().table(StoreKind::Canonical)
        );

        let rows: Vec<(i64, DateTime<Utc>, f64, f64, f32, DateTime<Utc>)> = sqlx::query_as(&sql)
            .bind(point.longitude)
            .bind(point.latitude)
            .fetch_all(self.pool())
            .await
            .map_err(|e| db_err("error querying series at location", e))?;

        Ok(rows.into_iter().map(scalar_from_row).collect())
    }

    /// The rectangular grid of one scalar field at a fixed timestamp.
    ///
    /// Row 0 is the highest observed latitude, column 0 the lowest observed
    /// longitude; absent cells are NaN sentinels without identity.
    pub async fn grid_at_timestamp(
        &self,
        field: ScalarField,
        timestamp: DateTime<Utc>,
    ) -> OceanResult<Vec<Vec<ScalarObservation>>> {
        let sql = format!(
            "SELECT id, measurement_time, \
                    ST_Y(location::geometry) AS latitude, \
                    ST_X(location::geometry) AS longitude, \
                    {}, created_at \
             FROM {} \
             WHERE measurement_time = $1 \
             ORDER BY latitude DESC, longitude ASC",
            field.column(),
            field.kind().table(StoreKind::Canonical)
        );

        let rows: Vec<(i64, DateTime<Utc>, f64, f64, f32, DateTime<Utc>)> = sqlx::query_as(&sql)
            .bind(timestamp)
            .fetch_all(self.pool())
            .await
            .map_err(|e| db_err("error querying grid at timestamp", e))?;

        let records = rows.into_iter().map(scalar_from_row).collect();
        Ok(materialize_grid(timestamp, records))
    }

    /// Write interpolated values back to the canonical store, matched by
    /// identity. Sentinel records without an id are skipped.
    pub async fn update_values(
        &self,
        field: ScalarField,
        records: &[ScalarObservation],
    ) -> OceanResult<()> {
        let sql = format!(
            "UPDATE {} SET {} = $1 WHERE id = $2",
            field.kind().table(StoreKind::Canonical),
            field.column()
        );

        for record in records {
            let Some(id) = record.id else {
                continue;
            };
            sqlx::query(&sql)
                .bind(record.value)
                .bind(id)
                .execute(self.pool())
                .await
                .map_err(|e| db_err("error updating values", e))?;
        }

        Ok(())
    }
}

fn scalar_from_row(
    (id, measurement_time, latitude, longitude, value, created_at): (
        i64,
        DateTime<Utc>,
        f64,
        f64,
        f32,
        DateTime<Utc>,
    ),
) -> ScalarObservation {
    ScalarObservation {
        id: Some(id),
        measurement_time,
        latitude,
        longitude,
        value,
        created_at: Some(created_at),
    }
}

/// Map a sqlx error into the shared taxonomy. Unique-key violations become
/// `Conflict` so replays can be logged and ignored.
fn db_err(context: &str, e: sqlx::Error) -> OceanError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return OceanError::Conflict(format!("{context}: {}", db.message()));
        }
    }
    OceanError::Internal(format!("{context}: {e}"))
}
