//! # AssetWatch - Asset tracking core
//!
//! Geofence containment, engine telemetry windows and anomaly result types
//! for vehicle and IoT fleets.
//!
//! ## Key Features
//!
//! - **Geofence engine**: even-odd containment with a fixed alert cadence
//! - **Telemetry store**: placeholder-then-append history per asset
//! - **Aggregation**: mean features over the latest readings
//! - **Typed anomaly outcomes**: every prediction resolves to a result
//!
//! ## Quick Start
//!
//! ```rust
//! use assetwatch::{
//!     AssetId, GeoPoint, GeofenceBoundary, GeofenceEngine, GeofenceState,
//!     MemoryTelemetryStore, ReadingAggregator, TelemetryStore,
//! };
//!
//! // Six-vertex boundary around Addis Ababa
//! let boundary = GeofenceBoundary::from_vertices([
//!     GeoPoint::new(9.08, 38.74),
//!     GeoPoint::new(9.055, 38.79),
//!     GeoPoint::new(9.005, 38.79),
//!     GeoPoint::new(8.98, 38.74),
//!     GeoPoint::new(9.005, 38.69),
//!     GeoPoint::new(9.055, 38.69),
//! ]);
//!
//! let engine = GeofenceEngine::new();
//! let eval = engine.evaluate(&boundary, GeoPoint::new(9.10, 38.90), GeofenceState::Inside);
//! assert_eq!(eval.state, GeofenceState::Outside);
//! assert!(eval.transition.is_some());
//!
//! // Telemetry
//! let store = MemoryTelemetryStore::new();
//! let car = AssetId::from("Car-1");
//! store.register_asset(&car, Some(20_000.0)).unwrap();
//! store.append_reading(&car, Some(90.0), Some(40.0)).unwrap();
//! store.append_reading(&car, Some(95.0), Some(42.0)).unwrap();
//!
//! let aggregator = ReadingAggregator::new();
//! let readings = store.latest_readings(&car, aggregator.window()).unwrap();
//! let features = aggregator.reduce(&readings).unwrap();
//! assert_eq!(features.sample_count, 2);
//! ```
//!
//! ## Modules
//!
//! - [`geo`]: points and polygon containment
//! - [`boundary`]: bounded geofence vertex buffer
//! - [`geofence`]: state machine and breach events
//! - [`telemetry`]: reading storage
//! - [`aggregate`]: feature reduction
//! - [`anomaly`]: prediction outcomes and input validation
//! - [`health`]: component health

// Modules
pub mod aggregate;
pub mod anomaly;
pub mod boundary;
pub mod error;
pub mod geo;
pub mod geofence;
pub mod health;
pub mod telemetry;

// Re-exports for convenient access
pub use aggregate::{AggregatedFeatures, ReadingAggregator};
pub use anomaly::{validate_features, AnomalyKind, AnomalyResult, FeatureLimits};
pub use boundary::{GeofenceBoundary, REQUIRED_VERTICES};
pub use error::{AggregateError, AssetwatchError, Result, TelemetryError};
pub use geo::{GeoPoint, Polygon, MIN_POLYGON_VERTICES};
pub use geofence::{
    BreachEvent, BreachKind, Evaluation, GeofenceEngine, GeofenceState, RealertPolicy,
};
pub use health::{Component, HealthCheck, HealthMonitor, HealthStatus};
pub use telemetry::{
    AssetId, AssetRecord, FleetSummary, MemoryTelemetryStore, Reading, ReadingId,
    TelemetryStore, DEFAULT_WINDOW,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
