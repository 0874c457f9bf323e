//! Periodic ingestion driving the download, decode and persist pipeline.
//!
//! One tick ingests each variable kind in turn, then runs the interpolator
//! over everything archived. State lives entirely in the archive: each tick
//! re-reads the newest local timestamp, so a failed tick is retried from
//! scratch on the next one.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use archive::Archive;
use erddap::{ErddapClient, CHLOR_DATASET_ID};
use interpolator::Interpolator;
use ocean_common::{StoreKind, VariableKind};

/// Never reach further back than this many days, no matter how stale the
/// archive is. Bounds catch-up work after long outages.
const CATCH_UP_LIMIT_DAYS: i64 = 30;

/// Drives ingestion on a fixed interval until shutdown.
pub struct Updater {
    archive: Arc<Archive>,
    client: ErddapClient,
    interpolator: Interpolator,
    interval: Duration,
    currents_dataset_id: Option<String>,
}

impl Updater {
    pub fn new(
        archive: Arc<Archive>,
        client: ErddapClient,
        interval: Duration,
        currents_dataset_id: Option<String>,
    ) -> Self {
        let interpolator = Interpolator::new(archive.clone());
        Self {
            archive,
            client,
            interpolator,
            interval,
            currents_dataset_id,
        }
    }

    /// Run until the shutdown channel fires. The first tick starts
    /// immediately; an in-flight tick is cancelled by shutdown.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("updater stopped");
                    return;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = shutdown.recv() => {
                            info!("updater stopped mid-tick");
                            return;
                        }
                        _ = self.tick() => {}
                    }
                }
            }
        }
    }

    /// One full pass: ingest every kind sequentially, then interpolate.
    async fn tick(&self) {
        self.update_chlorophyll().await;
        self.update_currents().await;
        self.interpolator.run().await;
    }

    async fn update_chlorophyll(&self) {
        info!("starting chlorophyll data update");

        let Some((start, end)) = self
            .ingestion_window(VariableKind::Chlorophyll, CHLOR_DATASET_ID)
            .await
        else {
            return;
        };

        let path = match self
            .client
            .fetch_grid(CHLOR_DATASET_ID, VariableKind::Chlorophyll, start, end)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "failed to download chlorophyll data");
                return;
            }
        };

        let decoded = erddap::decode_chlorophyll(&path);
        remove_temp_file(&path).await;

        let records = match decoded {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "failed to decode chlorophyll data");
                return;
            }
        };

        if records.is_empty() {
            info!("no new chlorophyll data available");
            return;
        }

        if let Err(e) = self
            .archive
            .save_chlorophyll(&records, StoreKind::Canonical)
            .await
        {
            error!(error = %e, "failed to save chlorophyll data");
            return;
        }
        if let Err(e) = self.archive.save_chlorophyll(&records, StoreKind::Raw).await {
            error!(error = %e, "failed to save raw chlorophyll data");
            return;
        }

        info!(
            updated_points = records.len(),
            "chlorophyll data update completed"
        );
    }

    async fn update_currents(&self) {
        let Some(dataset_id) = self.currents_dataset_id.clone() else {
            info!("no currents dataset configured, skipping currents update");
            return;
        };

        info!(dataset = %dataset_id, "starting currents data update");

        let Some((start, end)) = self
            .ingestion_window(VariableKind::Currents, &dataset_id)
            .await
        else {
            return;
        };

        let path = match self
            .client
            .fetch_grid(&dataset_id, VariableKind::Currents, start, end)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "failed to download currents data");
                return;
            }
        };

        let decoded = erddap::decode_currents(&path);
        remove_temp_file(&path).await;

        let records = match decoded {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "failed to decode currents data");
                return;
            }
        };

        if records.is_empty() {
            info!("no new currents data available");
            return;
        }

        if let Err(e) = self
            .archive
            .save_currents(&records, StoreKind::Canonical)
            .await
        {
            error!(error = %e, "failed to save currents data");
            return;
        }
        if let Err(e) = self.archive.save_currents(&records, StoreKind::Raw).await {
            error!(error = %e, "failed to save raw currents data");
            return;
        }

        info!(
            updated_points = records.len(),
            "currents data update completed"
        );
    }

    /// Compute the `[start, end]` window for one kind, or `None` when there
    /// is nothing to ingest this tick.
    async fn ingestion_window(
        &self,
        kind: VariableKind,
        dataset_id: &str,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let latest_local = match self.archive.latest_time(kind).await {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    kind = kind.label(),
                    error = %e,
                    "failed to read latest local timestamp, assuming empty archive"
                );
                DateTime::UNIX_EPOCH
            }
        };

        let start = clamp_start(latest_local, Utc::now());

        let end = match self.client.latest_data_time(dataset_id).await {
            Ok(t) => t,
            Err(e) => {
                error!(kind = kind.label(), error = %e, "failed to resolve latest upstream time");
                return None;
            }
        };

        if start >= end {
            info!(
                kind = kind.label(),
                "local archive is current with upstream, nothing to ingest"
            );
            return None;
        }

        Some((start, end))
    }
}

/// Bound the window start: never earlier than `now - 30 days`.
fn clamp_start(latest_local: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = now - ChronoDuration::days(CATCH_UP_LIMIT_DAYS);
    latest_local.max(floor)
}

async fn remove_temp_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove temp file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_archive_is_bounded_to_thirty_days() {
        let now = DateTime::from_timestamp(1_750_000_000, 0).unwrap();
        let start = clamp_start(DateTime::UNIX_EPOCH, now);
        assert_eq!(start, now - ChronoDuration::days(30));
    }

    #[test]
    fn test_stale_archive_is_bounded_to_thirty_days() {
        let now = DateTime::from_timestamp(1_750_000_000, 0).unwrap();
        let stale = now - ChronoDuration::days(90);
        assert_eq!(clamp_start(stale, now), now - ChronoDuration::days(30));
    }

    #[test]
    fn test_recent_archive_start_is_kept() {
        let now = DateTime::from_timestamp(1_750_000_000, 0).unwrap();
        let recent = now - ChronoDuration::days(2);
        assert_eq!(clamp_start(recent, now), recent);
    }
}
