//! Gridded slice downloads from the ERDDAP griddap endpoint.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use ocean_common::{OceanError, OceanResult, VariableKind};

use crate::{truncate, ErddapClient};

/// Process-wide directory for in-flight downloads.
const TEMP_DIR: &str = "tmp/erddap";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

impl ErddapClient {
    /// Download the gridded slice covering `[start, end]` for a variable kind.
    ///
    /// Returns the path of the temporary NetCDF file. The caller owns the
    /// file and removes it once decoding finishes, success or failure.
    pub async fn fetch_grid(
        &self,
        dataset_id: &str,
        kind: VariableKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OceanResult<PathBuf> {
        fs::create_dir_all(TEMP_DIR)
            .await
            .map_err(|e| OceanError::Internal(format!("failed to create temp directory: {e}")))?;

        let url = self.grid_url(dataset_id, kind.variables(), start, end);
        info!(kind = kind.label(), url = %url, "downloading gridded data");

        // The window in the name keeps concurrent ticks from colliding.
        let dest = Path::new(TEMP_DIR).join(format!(
            "{}_{}_{}.nc",
            kind.label(),
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        ));

        self.download_to_file(&url, &dest).await?;
        Ok(dest)
    }

    /// Build the griddap query: one range selector per variable, with the
    /// depth/altitude dimension pinned to the surface.
    fn grid_url(
        &self,
        dataset_id: &str,
        variables: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> String {
        let start_str = start.format(TIME_FORMAT).to_string();
        let end_str = end.format(TIME_FORMAT).to_string();

        let query = variables
            .iter()
            .map(|var| {
                format!(
                    "{var}[({start_str}):1:({end_str})][(0.0):1:(0.0)][({:.5}):1:({:.5})][({:.5}):1:({:.5})]",
                    self.bbox.min_lat, self.bbox.max_lat, self.bbox.min_lon, self.bbox.max_lon
                )
            })
            .collect::<Vec<_>>()
            .join(",");

        format!("{}/{}.nc?{}", self.grid_base, dataset_id, query)
    }

    async fn download_to_file(&self, url: &str, dest: &Path) -> OceanResult<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OceanError::Transport(format!("griddap request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                response_body = truncate(&body, 512),
                "griddap request returned non-OK status"
            );
            return Err(OceanError::Transport(format!(
                "griddap endpoint returned {status}"
            )));
        }

        let mut file = File::create(dest)
            .await
            .map_err(|e| OceanError::Internal(format!("failed to create {}: {e}", dest.display())))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| OceanError::Transport(format!("error reading response body: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| OceanError::Internal(format!("error writing to file: {e}")))?;
        }

        file.flush()
            .await
            .map_err(|e| OceanError::Internal(format!("error flushing file: {e}")))?;

        info!(path = %dest.display(), "file downloaded successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocean_common::BoundingBox;

    fn client() -> ErddapClient {
        ErddapClient::new(BoundingBox::new(40.83, 1.10, 41.26, 2.53)).unwrap()
    }

    #[test]
    fn test_grid_url_single_variable() {
        let start = DateTime::from_timestamp(1_747_656_000, 0).unwrap();
        let end = DateTime::from_timestamp(1_747_742_400, 0).unwrap();

        let url = client().grid_url("noaacwNPPVIIRSchlaDaily", &["chlor_a"], start, end);

        assert!(url.starts_with(
            "https://coastwatch.noaa.gov/erddap/griddap/noaacwNPPVIIRSchlaDaily.nc?"
        ));
        assert!(url.contains(
            "chlor_a[(2025-05-19T12:00:00Z):1:(2025-05-20T12:00:00Z)]\
             [(0.0):1:(0.0)][(40.83000):1:(41.26000)][(1.10000):1:(2.53000)]"
        ));
    }

    #[test]
    fn test_grid_url_joins_variables_with_commas() {
        let start = DateTime::from_timestamp(1_747_656_000, 0).unwrap();
        let end = DateTime::from_timestamp(1_747_742_400, 0).unwrap();

        let url = client().grid_url("someCurrentsDataset", &["u_current", "v_current"], start, end);

        let query = url.split_once('?').unwrap().1;
        let selectors: Vec<&str> = query.split(',').collect();
        assert_eq!(selectors.len(), 2);
        assert!(selectors[0].starts_with("u_current[("));
        assert!(selectors[1].starts_with("v_current[("));
    }
}
