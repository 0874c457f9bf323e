//! Spatio-temporal observation archive backed by PostgreSQL/PostGIS.
//!
//! Every variable kind is persisted twice: a canonical store the
//! interpolator mutates in place, and an append-only raw store holding
//! exactly what was decoded from upstream. Locations are geography points;
//! spatial queries use bounding-box intersection in WGS-84.

mod grid;
mod store;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use ocean_common::{OceanError, OceanResult};

pub use grid::materialize_grid;

/// Database connection pool and archive operations.
pub struct Archive {
    pool: PgPool,
}

impl Archive {
    /// Create a new archive connection from a database URL.
    pub async fn connect(database_url: &str) -> OceanResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| OceanError::Internal(format!("database connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create the observation tables and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> OceanResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| OceanError::Internal(format!("schema bootstrap failed: {e}")))?;
            }
        }

        info!("archive schema ready");
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const SCHEMA_SQL: &str = r#"
CREATE EXTENSION IF NOT EXISTS postgis;

CREATE TABLE IF NOT EXISTS chlorophyll_data (
    id BIGSERIAL PRIMARY KEY,
    measurement_time TIMESTAMPTZ NOT NULL,
    location GEOGRAPHY(POINT, 4326) NOT NULL,
    chlor_a REAL NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (measurement_time, location)
);

CREATE TABLE IF NOT EXISTS chlorophyll_data_raw (
    id BIGSERIAL PRIMARY KEY,
    measurement_time TIMESTAMPTZ NOT NULL,
    location GEOGRAPHY(POINT, 4326) NOT NULL,
    chlor_a REAL NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (measurement_time, location)
);

CREATE TABLE IF NOT EXISTS currents_data (
    id BIGSERIAL PRIMARY KEY,
    measurement_time TIMESTAMPTZ NOT NULL,
    location GEOGRAPHY(POINT, 4326) NOT NULL,
    u_current REAL NOT NULL,
    v_current REAL NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (measurement_time, location)
);

CREATE TABLE IF NOT EXISTS currents_data_raw (
    id BIGSERIAL PRIMARY KEY,
    measurement_time TIMESTAMPTZ NOT NULL,
    location GEOGRAPHY(POINT, 4326) NOT NULL,
    u_current REAL NOT NULL,
    v_current REAL NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (measurement_time, location)
);

CREATE INDEX IF NOT EXISTS idx_chlorophyll_time ON chlorophyll_data (measurement_time);
CREATE INDEX IF NOT EXISTS idx_chlorophyll_raw_time ON chlorophyll_data_raw (measurement_time);
CREATE INDEX IF NOT EXISTS idx_currents_time ON currents_data (measurement_time);
CREATE INDEX IF NOT EXISTS idx_currents_raw_time ON currents_data_raw (measurement_time)
"#;
