//! Client for the NOAA CoastWatch ERDDAP service.
//!
//! Three concerns live here: resolving the newest available timestamp for a
//! dataset from the info endpoint, downloading bounding-box/time-window
//! slices of a gridded dataset to a temp file, and decoding the resulting
//! NetCDF files into flat observation records.

mod catalog;
mod decode;
mod download;

use std::time::Duration;

use ocean_common::{BoundingBox, OceanError, OceanResult};

pub use decode::{decode_chlorophyll, decode_currents};

/// Dataset id for the VIIRS daily chlorophyll-a product.
pub const CHLOR_DATASET_ID: &str = "noaacwNPPVIIRSchlaDaily";

const DEFAULT_INFO_BASE: &str = "https://coastwatch.noaa.gov/erddap/info";
const DEFAULT_GRID_BASE: &str = "https://coastwatch.noaa.gov/erddap/griddap";

/// Per-request timeout. ERDDAP slices grids server-side and can take many
/// minutes to start responding for large windows.
const HTTP_TIMEOUT: Duration = Duration::from_secs(1500);

/// HTTP client for one ERDDAP deployment, scoped to a bounding box.
pub struct ErddapClient {
    client: reqwest::Client,
    info_base: String,
    grid_base: String,
    bbox: BoundingBox,
}

impl ErddapClient {
    pub fn new(bbox: BoundingBox) -> OceanResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OceanError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            info_base: DEFAULT_INFO_BASE.to_string(),
            grid_base: DEFAULT_GRID_BASE.to_string(),
            bbox,
        })
    }
}

/// Clip a string to at most `max` characters for log output.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
