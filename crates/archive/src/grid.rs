//! In-memory materialization of rectangular observation grids.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use ocean_common::ScalarObservation;

/// Arrange a flat per-timestamp result set into a rectangular grid.
///
/// Row 0 holds the highest observed latitude and column 0 the lowest
/// observed longitude, so the grid reads north-up, east-right. Cells with
/// no backing row are synthesized as NaN sentinels with no identity; the
/// database is never asked to fabricate them.
pub fn materialize_grid(
    timestamp: DateTime<Utc>,
    records: Vec<ScalarObservation>,
) -> Vec<Vec<ScalarObservation>> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut lats: Vec<f64> = records.iter().map(|r| r.latitude).collect();
    lats.sort_by(|a, b| b.total_cmp(a));
    lats.dedup();

    let mut lons: Vec<f64> = records.iter().map(|r| r.longitude).collect();
    lons.sort_by(f64::total_cmp);
    lons.dedup();

    // Coordinates are the exact values the upstream grid emitted, so
    // bit-level equality is the right lookup key.
    let lat_index: HashMap<u64, usize> = lats
        .iter()
        .enumerate()
        .map(|(i, lat)| (lat.to_bits(), i))
        .collect();
    let lon_index: HashMap<u64, usize> = lons
        .iter()
        .enumerate()
        .map(|(i, lon)| (lon.to_bits(), i))
        .collect();

    let mut grid: Vec<Vec<ScalarObservation>> = lats
        .iter()
        .map(|&lat| {
            lons.iter()
                .map(|&lon| ScalarObservation::missing(timestamp, lat, lon))
                .collect()
        })
        .collect();

    for record in records {
        if let (Some(&row), Some(&col)) = (
            lat_index.get(&record.latitude.to_bits()),
            lon_index.get(&record.longitude.to_bits()),
        ) {
            grid[row][col] = record;
        }
    }

    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: i64, lat: f64, lon: f64, value: f32) -> ScalarObservation {
        ScalarObservation {
            id: Some(id),
            measurement_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            latitude: lat,
            longitude: lon,
            value,
            created_at: None,
        }
    }

    #[test]
    fn test_empty_input() {
        let t = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(materialize_grid(t, Vec::new()).is_empty());
    }

    #[test]
    fn test_north_up_east_right_orientation() {
        let t = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let grid = materialize_grid(
            t,
            vec![
                obs(1, 40.0, 1.0, 1.0),
                obs(2, 40.0, 2.0, 2.0),
                obs(3, 41.0, 1.0, 3.0),
                obs(4, 41.0, 2.0, 4.0),
            ],
        );

        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0].len(), 2);
        // Row 0 is the highest latitude, column 0 the lowest longitude.
        assert_eq!(grid[0][0].latitude, 41.0);
        assert_eq!(grid[0][0].longitude, 1.0);
        assert_eq!(grid[0][0].value, 3.0);
        assert_eq!(grid[1][1].value, 2.0);
    }

    #[test]
    fn test_missing_cells_become_nan_sentinels() {
        let t = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let grid = materialize_grid(
            t,
            vec![
                obs(1, 41.0, 1.0, 3.0),
                obs(2, 40.0, 2.0, 2.0),
                obs(3, 40.0, 1.0, 1.0),
            ],
        );

        // (41.0, 2.0) was absent from the flat input.
        let sentinel = &grid[0][1];
        assert!(sentinel.id.is_none());
        assert!(sentinel.value.is_nan());
        assert_eq!(sentinel.latitude, 41.0);
        assert_eq!(sentinel.longitude, 2.0);
        assert_eq!(sentinel.measurement_time, t);
    }

    #[test]
    fn test_exact_coordinates_survive() {
        let t = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let grid = materialize_grid(
            t,
            vec![
                obs(1, 41.037500191, 1.10417, 1.0),
                obs(2, 41.037500191, 1.14583, 2.0),
            ],
        );

        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0][0].longitude, 1.10417);
        assert_eq!(grid[0][1].longitude, 1.14583);
    }
}
