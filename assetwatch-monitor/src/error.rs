// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for AssetWatch Monitor

use std::path::PathBuf;
use std::time::Duration;

use assetwatch::{AssetId, GeoPoint, TelemetryError};
use thiserror::Error;

/// Main error type for monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Classifier artifacts could not be resolved
    #[error("Classifier artifacts unavailable: {0}")]
    Artifact(#[from] ArtifactError),

    /// Position source failure
    #[error("Position source error: {0}")]
    Source(#[from] SourceError),

    /// Alert delivery failure
    #[error("Alert delivery error: {0}")]
    Alert(#[from] AlertError),

    /// Telemetry store error
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// A session is already polling this asset
    #[error("Monitoring session already running for asset {0}")]
    SessionExists(AssetId),

    /// No session is polling this asset
    #[error("No monitoring session for asset {0}")]
    SessionNotFound(AssetId),

    /// Session task panicked or was cancelled
    #[error("Monitoring session for asset {asset} aborted: {reason}")]
    SessionAborted { asset: AssetId, reason: String },

    /// Anomaly prediction is disabled
    #[error("Anomaly prediction unavailable: {0}")]
    PredictorUnavailable(String),

    /// Coordinates out of range
    #[error("Invalid position: {0}")]
    InvalidPosition(GeoPoint),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MonitorError {
    /// True when the error only means "no telemetry yet"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Telemetry(e) if e.is_not_found())
    }
}

/// Classifier artifacts missing at construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    /// Trained model file not found
    #[error("model file not found: {}", .0.display())]
    MissingModel(PathBuf),

    /// Label encoder file not found
    #[error("label encoder not found: {}", .0.display())]
    MissingEncoder(PathBuf),

    /// Scoring program or script not found
    #[error("scoring program not found: {}", .0.display())]
    MissingProgram(PathBuf),
}

/// Errors from a position source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Nothing has been reported for the asset yet
    #[error("no position fix for asset {0}")]
    NoFix(AssetId),

    /// Reported coordinates are out of range
    #[error("invalid position fix {0}")]
    InvalidFix(GeoPoint),

    /// Source backend failure
    #[error("position source unavailable: {0}")]
    Unavailable(String),
}

/// Errors from an alert sink
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    /// Sink rejected the event
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Sink did not answer in time
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err: MonitorError = TelemetryError::NotFound(AssetId::from("Car-1")).into();
        assert!(err.is_not_found());

        let err: MonitorError = TelemetryError::LockPoisoned.into();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_artifact_error_display() {
        let err = ArtifactError::MissingModel(PathBuf::from("/models/rf.pkl"));
        assert_eq!(err.to_string(), "model file not found: /models/rf.pkl");

        let err: MonitorError = err.into();
        assert!(err.to_string().starts_with("Classifier artifacts unavailable"));
    }
}
