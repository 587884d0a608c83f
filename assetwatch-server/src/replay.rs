// AssetWatch Server - Fleet replay engine
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Fleet replay engine for simulating devices from a CSV recording.
//!
//! Each row is a GPS fix for one asset, optionally with engine telemetry:
//!
//! ```text
//! timestamp_ms,asset_id,latitude,longitude,engine_temperature,speed
//! 1000,Car-1,9.03,38.74,88.0,40.0
//! 2000,Car-1,9.10,38.90,,
//! ```
//!
//! Fixes go to the [`LatestFixSource`] that monitoring sessions poll;
//! telemetry columns are recorded through the [`Monitor`].

use crate::metrics::update_replay_metrics;
use assetwatch::{AssetId, GeoPoint};
use assetwatch_monitor::{LatestFixSource, Monitor};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Configuration for fleet replay.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Path to CSV recording.
    pub csv_path: String,
    /// Replay speed multiplier (1.0 = real-time, 10.0 = 10x faster).
    pub speed: f64,
    /// Whether to loop the recording.
    pub loop_replay: bool,
    /// Delay after the last row before looping.
    pub default_sample_interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            csv_path: String::new(),
            speed: 1.0,
            loop_replay: true,
            default_sample_interval_ms: 5_000,
        }
    }
}

/// State of the replay engine.
#[derive(Debug, Default)]
pub struct ReplayState {
    /// Current position in the recording (row index).
    pub position: AtomicUsize,
    /// Total rows in the recording.
    pub total_rows: AtomicUsize,
    /// Whether replay is running.
    pub running: AtomicBool,
    /// Rows whose fix or telemetry was rejected.
    pub rejected_rows: AtomicUsize,
}

/// One recorded device report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct FleetRow {
    timestamp_ms: u64,
    asset_id: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    engine_temperature: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
}

impl FleetRow {
    fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    fn has_telemetry(&self) -> bool {
        self.engine_temperature.is_some() || self.speed.is_some()
    }
}

/// Replay engine that plays a fleet recording into the monitor.
pub struct ReplayEngine {
    config: ReplayConfig,
    state: Arc<ReplayState>,
    source: Arc<LatestFixSource>,
    monitor: Arc<Monitor>,
    rows: Vec<FleetRow>,
}

impl ReplayEngine {
    /// Create a new replay engine from a CSV file.
    pub fn from_csv(
        config: ReplayConfig,
        source: Arc<LatestFixSource>,
        monitor: Arc<Monitor>,
    ) -> Result<Self, ReplayError> {
        let path = Path::new(&config.csv_path);
        if !path.exists() {
            return Err(ReplayError::FileNotFound(config.csv_path.clone()));
        }
        if !(config.speed.is_finite() && config.speed > 0.0) {
            return Err(ReplayError::InvalidSpeed(config.speed));
        }

        let rows = Self::parse_csv(path)?;
        if rows.is_empty() {
            return Err(ReplayError::EmptyDataset);
        }

        let state = Arc::new(ReplayState::default());
        state.total_rows.store(rows.len(), Ordering::SeqCst);

        let engine = Self {
            config,
            state,
            source,
            monitor,
            rows,
        };
        let info = engine.dataset_info();
        info!(
            assets = info.asset_count,
            rows = info.sample_count,
            duration_ms = info.duration_ms,
            "Loaded fleet recording"
        );
        Ok(engine)
    }

    /// Parse a CSV file into rows ordered by timestamp.
    fn parse_csv(path: &Path) -> Result<Vec<FleetRow>, ReplayError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        if headers.get(0) != Some("timestamp_ms") {
            return Err(ReplayError::InvalidFormat(
                "First column must be 'timestamp_ms'".to_string(),
            ));
        }

        let mut rows = Vec::new();
        for (line, result) in reader.deserialize::<FleetRow>().enumerate() {
            let row = result.map_err(|e| {
                ReplayError::InvalidFormat(format!("row {}: {}", line + 1, e))
            })?;
            rows.push(row);
        }

        // Stable: rows sharing a timestamp keep file order
        rows.sort_by_key(|row| row.timestamp_ms);
        Ok(rows)
    }

    /// Get the replay state.
    pub fn state(&self) -> Arc<ReplayState> {
        Arc::clone(&self.state)
    }

    /// Start the replay loop (runs until stopped or the recording ends).
    pub async fn run(&self) {
        self.state.running.store(true, Ordering::SeqCst);
        info!(
            speed = self.config.speed,
            looping = self.config.loop_replay,
            "Starting replay"
        );

        loop {
            if !self.state.running.load(Ordering::SeqCst) {
                break;
            }

            let position = self.state.position.load(Ordering::SeqCst);

            if position >= self.rows.len() {
                if self.config.loop_replay {
                    info!("Recording complete, looping");
                    self.state.position.store(0, Ordering::SeqCst);
                    continue;
                } else {
                    info!("Recording complete, stopping");
                    self.state.running.store(false, Ordering::SeqCst);
                    break;
                }
            }

            let row = &self.rows[position];
            self.process_row(row, position).await;

            self.state.position.fetch_add(1, Ordering::SeqCst);
            update_replay_metrics(position + 1, self.rows.len(), self.config.speed);

            let base_interval_ms = match self.rows.get(position + 1) {
                Some(next) => next.timestamp_ms - row.timestamp_ms,
                None => self.config.default_sample_interval_ms,
            };

            let sleep_ms = (base_interval_ms as f64 / self.config.speed) as u64;
            if sleep_ms > 0 {
                sleep(Duration::from_millis(sleep_ms)).await;
            }
        }
    }

    /// Feed one row into the fix source and telemetry store.
    async fn process_row(&self, row: &FleetRow, position: usize) {
        debug!(
            row = position,
            asset = %row.asset_id,
            timestamp_ms = row.timestamp_ms,
            "Replaying row"
        );
        let asset_id = AssetId::from(row.asset_id.as_str());

        if let Err(e) = self.source.report(&asset_id, row.position()).await {
            warn!(asset = %asset_id, error = %e, "Rejected replayed fix");
            self.state.rejected_rows.fetch_add(1, Ordering::Relaxed);
        }

        if row.has_telemetry() {
            let recorded =
                self.monitor
                    .record_reading(&asset_id, row.engine_temperature, row.speed);
            if let Err(e) = recorded {
                warn!(asset = %asset_id, error = %e, "Failed to record replayed reading");
                self.state.rejected_rows.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get dataset info.
    pub fn dataset_info(&self) -> DatasetInfo {
        let duration_ms = match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0,
        };
        let asset_ids: BTreeSet<&str> = self.rows.iter().map(|r| r.asset_id.as_str()).collect();

        DatasetInfo {
            asset_count: asset_ids.len(),
            sample_count: self.rows.len(),
            duration_ms,
            asset_ids: asset_ids.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Recording information.
#[derive(Debug, Clone)]
pub struct DatasetInfo {
    pub asset_count: usize,
    pub sample_count: usize,
    pub duration_ms: u64,
    pub asset_ids: Vec<String>,
}

/// Replay errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid replay speed: {0}")]
    InvalidSpeed(f64),

    #[error("Empty dataset")]
    EmptyDataset,
}
