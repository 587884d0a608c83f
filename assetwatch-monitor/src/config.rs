// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for AssetWatch Monitor
//!
//! Every field has a default, so a JSON file only needs the values it
//! overrides:
//!
//! ```json
//! {
//!   "session": { "poll_interval_ms": 1000 },
//!   "predictor": { "model_dir": "/opt/assetwatch/models", "timeout_ms": 5000 }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use assetwatch::{FeatureLimits, RealertPolicy, DEFAULT_WINDOW, REQUIRED_VERTICES};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::sink::DEFAULT_ALERT_HISTORY;
use crate::source::DEFAULT_FIX_HISTORY;

/// Top-level monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Geofence polling sessions
    pub session: SessionConfig,

    /// Classifier process
    pub predictor: PredictorConfig,

    /// Readings per anomaly assessment (default: 5)
    pub aggregation_window: usize,

    /// Vertices per geofence boundary (default: 6)
    pub boundary_vertices: usize,

    /// Breach events kept by the in-memory alert log (default: 1000)
    pub alert_history: usize,

    /// Position fixes kept per asset (default: 100)
    pub fix_history: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            predictor: PredictorConfig::default(),
            aggregation_window: DEFAULT_WINDOW,
            boundary_vertices: REQUIRED_VERTICES,
            alert_history: DEFAULT_ALERT_HISTORY,
            fix_history: DEFAULT_FIX_HISTORY,
        }
    }
}

impl MonitorConfig {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MonitorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Reject values no session or predictor can run with
    pub fn validate(&self) -> Result<()> {
        if self.session.poll_interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "session.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.predictor.timeout_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "predictor.timeout_ms must be positive".to_string(),
            ));
        }
        if self.aggregation_window == 0 {
            return Err(MonitorError::InvalidConfig(
                "aggregation_window must be positive".to_string(),
            ));
        }
        if self.alert_history == 0 {
            return Err(MonitorError::InvalidConfig(
                "alert_history must be positive".to_string(),
            ));
        }
        if self.fix_history == 0 {
            return Err(MonitorError::InvalidConfig(
                "fix_history must be positive".to_string(),
            ));
        }
        if self.boundary_vertices < assetwatch::MIN_POLYGON_VERTICES {
            return Err(MonitorError::InvalidConfig(format!(
                "boundary_vertices must be at least {}",
                assetwatch::MIN_POLYGON_VERTICES
            )));
        }
        Ok(())
    }
}

/// Per-asset polling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Time between position polls (default: 5000 ms)
    pub poll_interval_ms: u64,

    /// Upper bound on a single alert delivery (default: 2000 ms)
    pub alert_timeout_ms: u64,

    /// Whether an asset that stays outside keeps alerting
    pub realert: RealertPolicy,

    /// Skip evaluation when the position has not moved since the last poll
    pub skip_unchanged_positions: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            alert_timeout_ms: 2_000,
            realert: RealertPolicy::EverySample,
            skip_unchanged_positions: false,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with a custom polling interval
    pub fn with_poll_interval(interval: Duration) -> Self {
        Self {
            poll_interval_ms: interval.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_millis(self.alert_timeout_ms)
    }
}

/// Classifier process configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Program to execute (default: `python3`, looked up on `PATH`)
    pub program: PathBuf,

    /// Scoring script passed as the first argument
    pub script: Option<PathBuf>,

    /// Directory holding the trained artifacts
    pub model_dir: PathBuf,

    /// Trained model file name inside `model_dir`
    pub model_file: String,

    /// Label encoder file name inside `model_dir`
    pub encoder_file: String,

    /// Per-request deadline (default: 10000 ms)
    pub timeout_ms: u64,

    /// Reject features outside this envelope before spawning
    pub limits: Option<FeatureLimits>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python3"),
            script: Some(PathBuf::from("ml-service.py")),
            model_dir: PathBuf::from("."),
            model_file: "engine_health_rf_model.pkl".to_string(),
            encoder_file: "engine_health_label_encoder.pkl".to_string(),
            timeout_ms: 10_000,
            limits: None,
        }
    }
}

impl PredictorConfig {
    /// Create a configuration reading artifacts from `model_dir`
    pub fn with_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.model_dir.join(&self.encoder_file)
    }
}
