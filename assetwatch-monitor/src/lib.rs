// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AssetWatch Monitor - Geofence sessions and anomaly orchestration
//!
//! Async layer on top of the `assetwatch` core: per-asset polling loops
//! that turn positions into geofence alerts, and an anomaly pipeline that
//! runs an external classifier over the latest engine telemetry.
//!
//! ## Features
//!
//! - **Monitoring sessions**: fixed-interval polling, one task per asset
//! - **Live boundary edits**: sessions pick up new vertices immediately
//! - **Process supervision**: timeout, kill-on-drop, typed outcomes
//! - **Injected collaborators**: position sources, alert sinks, stores
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Monitor                                                     │
//! │                                                              │
//! │  PositionSource ──▶ MonitoringSession ──▶ AlertSink          │
//! │                       (GeofenceEngine)                       │
//! │                            ▲                                 │
//! │              boundary edits│(watch)                          │
//! │                                                              │
//! │  TelemetryStore ──▶ ReadingAggregator ──▶ AnomalyPredictor   │
//! │                                             │                │
//! │                                             ▼                │
//! │                                   classifier process         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Anomaly requests run on their own task; sessions never wait on them.

mod config;
mod error;
mod monitor;
mod pipeline;
mod predictor;
mod session;
mod sink;
mod source;
mod stats;

// Public API
pub use config::{MonitorConfig, PredictorConfig, SessionConfig};
pub use error::{AlertError, ArtifactError, MonitorError, Result, SourceError};
pub use monitor::Monitor;
pub use pipeline::{AnomalyPipeline, AnomalyReport};
pub use predictor::{AnomalyPredictor, ClassifierArtifacts, ENCODER_PATH_ENV, MODEL_PATH_ENV};
pub use session::{MonitoringSession, SessionHandle, SessionSummary};
pub use sink::{
    AlertSink, FanoutAlertSink, LogAlertSink, MemoryAlertSink, DEFAULT_ALERT_HISTORY,
};
pub use source::{LatestFixSource, PositionFix, PositionSource, DEFAULT_FIX_HISTORY};
pub use stats::{MonitorStats, StatsSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
