//! NetCDF decoding of ERDDAP gridded responses.
//!
//! ERDDAP serves classic NetCDF-3 files (including the 64-bit offset
//! variant for large slices), read here with the pure-Rust `netcdf3`
//! reader. Scalar arrays arrive either as `[time][depth][lat][lon]` with a
//! single surface depth level or as `[time][lat][lon]`, depending on the
//! dataset; both flatten to the same row-major cell order.

use std::path::Path;

use chrono::{DateTime, Utc};
use netcdf3::{DataVector, FileReader};
use tracing::info;

use ocean_common::{ChlorophyllRecord, CurrentsRecord, OceanError, OceanResult};

/// Decode a chlorophyll grid file into flat observation records.
///
/// NaN cells are dropped here: the upstream sentinel for "no retrieval"
/// carries nothing the archive needs, and the spatial interpolator
/// re-materializes the grid from coordinates alone.
pub fn decode_chlorophyll(path: &Path) -> OceanResult<Vec<ChlorophyllRecord>> {
    let mut reader = open(path)?;

    let rank = variable_rank(&reader, "chlor_a")?;
    let times = read_epoch_times(&mut reader)?;
    let lats = read_coordinates(&mut reader, "latitude")?;
    let lons = read_coordinates(&mut reader, "longitude")?;
    let values = read_cells(&mut reader, "chlor_a")?;

    let records = assemble_chlorophyll(&times, &lats, &lons, &values, rank)?;
    info!(points = records.len(), path = %path.display(), "decoded chlorophyll grid");
    Ok(records)
}

/// Decode a currents grid file into flat observation records.
///
/// NaN components are kept: the interpolator needs the full rectangular
/// grid to repair them, and the u and v fields are filled independently.
pub fn decode_currents(path: &Path) -> OceanResult<Vec<CurrentsRecord>> {
    let mut reader = open(path)?;

    let u_rank = variable_rank(&reader, "u_current")?;
    let v_rank = variable_rank(&reader, "v_current")?;
    let times = read_epoch_times(&mut reader)?;
    let lats = read_coordinates(&mut reader, "latitude")?;
    let lons = read_coordinates(&mut reader, "longitude")?;
    let u_values = read_cells(&mut reader, "u_current")?;
    let v_values = read_cells(&mut reader, "v_current")?;

    let records = assemble_currents(&times, &lats, &lons, &u_values, u_rank, &v_values, v_rank)?;
    info!(points = records.len(), path = %path.display(), "decoded currents grid");
    Ok(records)
}

fn open(path: &Path) -> OceanResult<FileReader> {
    FileReader::open(path).map_err(|e| {
        OceanError::Malformed(format!(
            "failed to open NetCDF file {}: {e:?}",
            path.display()
        ))
    })
}

fn variable_rank(reader: &FileReader, name: &str) -> OceanResult<usize> {
    let var = reader
        .data_set()
        .get_var(name)
        .ok_or_else(|| OceanError::Malformed(format!("variable {name} missing from file")))?;
    Ok(var.dim_names().len())
}

fn read_var(reader: &mut FileReader, name: &str) -> OceanResult<DataVector> {
    reader
        .read_var(name)
        .map_err(|e| OceanError::Malformed(format!("failed to read variable {name}: {e:?}")))
}

/// Time is a 1-D sequence of seconds since the epoch, truncated to whole
/// seconds.
fn read_epoch_times(reader: &mut FileReader) -> OceanResult<Vec<DateTime<Utc>>> {
    let seconds = match read_var(reader, "time")? {
        DataVector::F64(values) => values,
        _ => {
            return Err(OceanError::Malformed(
                "time variable has unexpected element type".to_string(),
            ))
        }
    };

    seconds
        .into_iter()
        .map(|s| {
            DateTime::from_timestamp(s as i64, 0).ok_or_else(|| {
                OceanError::Malformed(format!("time value {s} is outside the representable range"))
            })
        })
        .collect()
}

/// Coordinate arrays arrive as f32 in some datasets and f64 in others.
fn read_coordinates(reader: &mut FileReader, name: &str) -> OceanResult<Vec<f64>> {
    match read_var(reader, name)? {
        DataVector::F64(values) => Ok(values),
        DataVector::F32(values) => Ok(values.into_iter().map(f64::from).collect()),
        _ => Err(OceanError::Malformed(format!(
            "{name} coordinates have unexpected element type"
        ))),
    }
}

fn read_cells(reader: &mut FileReader, name: &str) -> OceanResult<Vec<f32>> {
    match read_var(reader, name)? {
        DataVector::F32(values) => Ok(values),
        DataVector::F64(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        _ => Err(OceanError::Malformed(format!(
            "variable {name} has unexpected element type"
        ))),
    }
}

/// Validate that a scalar array matches one of the two known shapes.
///
/// With the depth dimension pinned to a single surface level, a rank-4
/// array holds exactly as many cells as a rank-3 one, so the flat
/// `((t * nlat) + lat) * nlon + lon` indexing below covers both.
fn check_grid_shape(
    name: &str,
    rank: usize,
    cells: usize,
    ntime: usize,
    nlat: usize,
    nlon: usize,
) -> OceanResult<()> {
    if rank != 3 && rank != 4 {
        return Err(OceanError::Malformed(format!(
            "variable {name} has rank {rank}, expected [time][lat][lon] or [time][depth][lat][lon]"
        )));
    }
    let expected = ntime * nlat * nlon;
    if cells != expected {
        return Err(OceanError::Malformed(format!(
            "variable {name} has {cells} cells, expected {expected}"
        )));
    }
    Ok(())
}

fn assemble_chlorophyll(
    times: &[DateTime<Utc>],
    lats: &[f64],
    lons: &[f64],
    values: &[f32],
    rank: usize,
) -> OceanResult<Vec<ChlorophyllRecord>> {
    check_grid_shape("chlor_a", rank, values.len(), times.len(), lats.len(), lons.len())?;

    let mut records = Vec::new();
    for (time_idx, t) in times.iter().enumerate() {
        for (lat_idx, lat) in lats.iter().enumerate() {
            for (lon_idx, lon) in lons.iter().enumerate() {
                let value = values[(time_idx * lats.len() + lat_idx) * lons.len() + lon_idx];
                if value.is_nan() {
                    continue;
                }
                records.push(ChlorophyllRecord {
                    id: None,
                    measurement_time: *t,
                    latitude: *lat,
                    longitude: *lon,
                    chlor_a: value,
                    created_at: None,
                });
            }
        }
    }
    Ok(records)
}

fn assemble_currents(
    times: &[DateTime<Utc>],
    lats: &[f64],
    lons: &[f64],
    u_values: &[f32],
    u_rank: usize,
    v_values: &[f32],
    v_rank: usize,
) -> OceanResult<Vec<CurrentsRecord>> {
    check_grid_shape("u_current", u_rank, u_values.len(), times.len(), lats.len(), lons.len())?;
    check_grid_shape("v_current", v_rank, v_values.len(), times.len(), lats.len(), lons.len())?;

    let mut records = Vec::new();
    for (time_idx, t) in times.iter().enumerate() {
        for (lat_idx, lat) in lats.iter().enumerate() {
            for (lon_idx, lon) in lons.iter().enumerate() {
                let cell = (time_idx * lats.len() + lat_idx) * lons.len() + lon_idx;
                records.push(CurrentsRecord {
                    id: None,
                    measurement_time: *t,
                    latitude: *lat,
                    longitude: *lon,
                    u_current: u_values[cell],
                    v_current: v_values[cell],
                    created_at: None,
                });
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(n: usize) -> Vec<DateTime<Utc>> {
        (0..n)
            .map(|i| DateTime::from_timestamp(1_700_000_000 + i as i64 * 86_400, 0).unwrap())
            .collect()
    }

    #[test]
    fn test_chlorophyll_drops_nan_cells() {
        let times = times(1);
        let lats = vec![41.0, 41.1];
        let lons = vec![2.0, 2.1];
        let values = vec![0.5, f32::NAN, 1.5, 2.0];

        let records = assemble_chlorophyll(&times, &lats, &lons, &values, 4).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].latitude, 41.0);
        assert_eq!(records[0].longitude, 2.0);
        assert_eq!(records[0].chlor_a, 0.5);
        // The NaN cell at (41.0, 2.1) is gone; the next record is (41.1, 2.0).
        assert_eq!(records[1].latitude, 41.1);
        assert_eq!(records[1].longitude, 2.0);
    }

    #[test]
    fn test_chlorophyll_multiple_timesteps() {
        let times = times(2);
        let lats = vec![41.0];
        let lons = vec![2.0, 2.1];
        let values = vec![0.1, 0.2, 0.3, 0.4];

        let records = assemble_chlorophyll(&times, &lats, &lons, &values, 3).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[2].measurement_time, times[1]);
        assert_eq!(records[2].chlor_a, 0.3);
        assert_eq!(records[3].chlor_a, 0.4);
    }

    #[test]
    fn test_chlorophyll_rejects_unknown_rank() {
        let times = times(1);
        let err = assemble_chlorophyll(&times, &[41.0], &[2.0], &[0.5], 2).unwrap_err();
        assert!(matches!(err, OceanError::Malformed(_)));
    }

    #[test]
    fn test_chlorophyll_rejects_cell_count_mismatch() {
        // A rank-4 array whose depth dimension is not a single level.
        let times = times(1);
        let err =
            assemble_chlorophyll(&times, &[41.0], &[2.0, 2.1], &[0.5, 0.6, 0.7, 0.8], 4)
                .unwrap_err();
        assert!(matches!(err, OceanError::Malformed(_)));
    }

    #[test]
    fn test_currents_retain_nan_components() {
        let times = times(1);
        let lats = vec![41.0];
        let lons = vec![2.0, 2.1];
        let u = vec![0.3, f32::NAN];
        let v = vec![f32::NAN, -0.2];

        let records = assemble_currents(&times, &lats, &lons, &u, 3, &v, 3).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].u_current, 0.3);
        assert!(records[0].v_current.is_nan());
        assert!(records[1].u_current.is_nan());
        assert_eq!(records[1].v_current, -0.2);
    }

    #[test]
    fn test_currents_component_shapes_checked_independently() {
        let times = times(1);
        let err = assemble_currents(&times, &[41.0], &[2.0], &[0.3], 3, &[0.1, 0.2], 3)
            .unwrap_err();
        assert!(matches!(err, OceanError::Malformed(_)));
    }
}
