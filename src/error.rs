//! Error types for AssetWatch
//!
//! This module defines the error types of the core library. Geofence
//! evaluation has no error type: an incomplete boundary is a normal state.

use thiserror::Error;

use crate::telemetry::AssetId;

/// Result type alias for AssetWatch operations
pub type Result<T> = std::result::Result<T, AssetwatchError>;

/// Main error type for core operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetwatchError {
    /// Telemetry store error
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Aggregation error
    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    /// Boundary data violates the ring invariants
    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),
}

/// Errors from the telemetry store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    /// No readings recorded for the asset yet
    #[error("No readings for asset {0}")]
    NotFound(AssetId),

    /// Asset registered twice
    #[error("Asset already registered: {0}")]
    AlreadyRegistered(AssetId),

    /// A writer panicked while holding an asset lock
    #[error("Telemetry store lock poisoned")]
    LockPoisoned,

    /// Backend failure of a persistent store
    #[error("Telemetry backend failure: {0}")]
    Backend(String),
}

impl TelemetryError {
    /// True when the error only means "no telemetry yet"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors during reading aggregation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// No reading carried both temperature and speed
    #[error("Insufficient data: no reading has both temperature and speed")]
    InsufficientData,
}
