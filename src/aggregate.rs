// AssetWatch - Asset tracking core
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Reading aggregation
//!
//! Reduces the latest readings of an asset to the mean features consumed by
//! the anomaly classifier.

use serde::{Deserialize, Serialize};

use crate::error::{AggregateError, AssetwatchError};
use crate::telemetry::{AssetId, Reading, TelemetryStore, DEFAULT_WINDOW};

/// Features derived from a window of readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedFeatures {
    /// Mean engine temperature
    pub avg_temperature: f64,
    /// Mean speed
    pub avg_speed: f64,
    /// Readings that contributed
    pub sample_count: usize,
}

/// Reduces reading windows to features
#[derive(Debug, Clone, Copy)]
pub struct ReadingAggregator {
    window: usize,
}

impl ReadingAggregator {
    /// Aggregator over the default window of five readings
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Aggregator over a custom window (minimum 1)
    pub fn with_window(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Number of latest readings to query
    pub fn window(&self) -> usize {
        self.window
    }

    /// Average temperature and speed over readings that carry both.
    ///
    /// Readings missing either value are ignored. When none remain the
    /// result is `InsufficientData`, never a zero average.
    pub fn reduce(&self, readings: &[Reading]) -> Result<AggregatedFeatures, AggregateError> {
        let (temp_sum, speed_sum, count) = readings
            .iter()
            .filter_map(|r| Some((r.engine_temperature?, r.speed?)))
            .fold((0.0, 0.0, 0usize), |(t, s, n), (temp, speed)| {
                (t + temp, s + speed, n + 1)
            });

        if count == 0 {
            return Err(AggregateError::InsufficientData);
        }

        Ok(AggregatedFeatures {
            avg_temperature: temp_sum / count as f64,
            avg_speed: speed_sum / count as f64,
            sample_count: count,
        })
    }

    /// Query the latest window of an asset and reduce it.
    ///
    /// Store errors come back as `Telemetry`, an empty reduction as
    /// `Aggregate(InsufficientData)`.
    pub fn latest_features(
        &self,
        store: &dyn TelemetryStore,
        asset_id: &AssetId,
    ) -> Result<AggregatedFeatures, AssetwatchError> {
        let readings = store.latest_readings(asset_id, self.window)?;
        Ok(self.reduce(&readings)?)
    }
}

impl Default for ReadingAggregator {
    fn default() -> Self {
        Self::new()
    }
}
