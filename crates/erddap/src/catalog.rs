//! Dataset metadata lookup against the ERDDAP info endpoint.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use ocean_common::{OceanError, OceanResult};

use crate::{truncate, ErddapClient};

/// Shape of `{info_base}/{dataset_id}/index.json`.
#[derive(Debug, Deserialize)]
struct DataInfo {
    table: InfoTable,
}

#[derive(Debug, Deserialize)]
struct InfoTable {
    /// Each row is a 5-tuple: [row_type, variable_name, attribute_name, datatype, value].
    rows: Vec<Vec<Value>>,
}

impl ErddapClient {
    /// Resolve the newest measurement timestamp the provider holds for a dataset.
    pub async fn latest_data_time(&self, dataset_id: &str) -> OceanResult<DateTime<Utc>> {
        let url = format!("{}/{}/index.json", self.info_base, dataset_id);
        info!(url = %url, "fetching dataset metadata for latest time");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OceanError::Transport(format!("info request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OceanError::Transport(format!(
                "info endpoint {url} returned {status}: {}",
                truncate(&body, 512)
            )));
        }

        let data_info: DataInfo = response
            .json()
            .await
            .map_err(|e| OceanError::Malformed(format!("info response from {url}: {e}")))?;

        let latest = latest_time_from_rows(&data_info.table.rows)?;
        info!(dataset = dataset_id, latest_time = %latest, "resolved latest data time");
        Ok(latest)
    }
}

/// Extract `instant(max)` from the `time` variable's `actual_range` attribute.
fn latest_time_from_rows(rows: &[Vec<Value>]) -> OceanResult<DateTime<Utc>> {
    let row = rows
        .iter()
        .find(|row| {
            row.len() >= 5
                && row[0].as_str() == Some("attribute")
                && row[1].as_str() == Some("time")
                && row[2].as_str() == Some("actual_range")
        })
        .ok_or_else(|| {
            OceanError::NotFound(
                "time actual_range attribute missing from dataset metadata".to_string(),
            )
        })?;

    let range = row[4].as_str().ok_or_else(|| {
        OceanError::Malformed("time actual_range value is not a string".to_string())
    })?;

    // The value is a "min, max" pair of seconds since the epoch.
    let parts: Vec<&str> = range.split(',').collect();
    if parts.len() != 2 {
        return Err(OceanError::Malformed(format!(
            "time actual_range {range:?} is not a min,max pair"
        )));
    }

    let max_seconds: f64 = parts[1].trim().parse().map_err(|_| {
        OceanError::Malformed(format!(
            "time actual_range max {:?} is not numeric",
            parts[1].trim()
        ))
    })?;

    DateTime::from_timestamp(max_seconds as i64, 0).ok_or_else(|| {
        OceanError::Malformed(format!(
            "time actual_range max {max_seconds} is outside the representable range"
        ))
    })
}
