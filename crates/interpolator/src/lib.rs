//! Gap filling for archived observations.
//!
//! Two passes run per scalar field: a temporal pass that fills bounded gaps
//! along each location's time series, then a spatial pass that flood-fills
//! enclosed missing regions of each timestamp's grid. The u and v current
//! components are treated as independent fields throughout.

mod areafill;
mod rowfill;

use std::sync::Arc;

use tracing::{error, info};

use archive::Archive;
use ocean_common::ScalarField;

pub use areafill::area_fill;
pub use rowfill::row_fill;

/// Drives the gap-filling passes against the archive.
pub struct Interpolator {
    archive: Arc<Archive>,
}

impl Interpolator {
    pub fn new(archive: Arc<Archive>) -> Self {
        Self { archive }
    }

    /// Run both passes for every scalar field.
    ///
    /// Failures are logged per location or timestamp and do not abort the
    /// remaining work; the canonical store is simply left partially filled
    /// until the next run.
    pub async fn run(&self) {
        info!("starting interpolation of archived data");

        for field in ScalarField::ALL {
            self.fill_series(field).await;
            self.fill_grids(field).await;
        }

        info!("interpolation completed");
    }

    /// Temporal pass: row-fill every location's series for one field.
    async fn fill_series(&self, field: ScalarField) {
        let points = match self.archive.all_locations(field.kind()).await {
            Ok(points) => points,
            Err(e) => {
                error!(field = field.column(), error = %e, "failed to list locations");
                return;
            }
        };

        info!(
            field = field.column(),
            locations = points.len(),
            "starting temporal gap fill"
        );

        for point in points {
            let mut series = match self.archive.series_at_location(field, point).await {
                Ok(series) => series,
                Err(e) => {
                    error!(
                        field = field.column(),
                        latitude = point.latitude,
                        longitude = point.longitude,
                        error = %e,
                        "failed to load series at location"
                    );
                    continue;
                }
            };

            let mut values: Vec<f32> = series.iter().map(|obs| obs.value).collect();
            row_fill(&mut values);
            for (obs, value) in series.iter_mut().zip(values) {
                obs.value = value;
            }

            if let Err(e) = self.archive.update_values(field, &series).await {
                error!(
                    field = field.column(),
                    latitude = point.latitude,
                    longitude = point.longitude,
                    error = %e,
                    "failed to write series back"
                );
            }
        }

        info!(field = field.column(), "temporal gap fill completed");
    }

    /// Spatial pass: area-fill every timestamp's grid for one field.
    async fn fill_grids(&self, field: ScalarField) {
        let timestamps = match self.archive.all_timestamps(field.kind()).await {
            Ok(timestamps) => timestamps,
            Err(e) => {
                error!(field = field.column(), error = %e, "failed to list timestamps");
                return;
            }
        };

        info!(
            field = field.column(),
            timestamps = timestamps.len(),
            "starting spatial gap fill"
        );

        for timestamp in timestamps {
            let mut grid = match self.archive.grid_at_timestamp(field, timestamp).await {
                Ok(grid) => grid,
                Err(e) => {
                    error!(
                        field = field.column(),
                        timestamp = %timestamp,
                        error = %e,
                        "failed to load grid at timestamp"
                    );
                    continue;
                }
            };

            let mut values: Vec<Vec<f32>> = grid
                .iter()
                .map(|row| row.iter().map(|obs| obs.value).collect())
                .collect();
            area_fill(&mut values);

            for (obs_row, value_row) in grid.iter_mut().zip(values) {
                for (obs, value) in obs_row.iter_mut().zip(value_row) {
                    obs.value = value;
                }

                if let Err(e) = self.archive.update_values(field, obs_row).await {
                    error!(
                        field = field.column(),
                        timestamp = %timestamp,
                        error = %e,
                        "failed to write grid row back"
                    );
                }
            }
        }

        info!(field = field.column(), "spatial gap fill completed");
    }
}
