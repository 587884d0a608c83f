// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! High-level Monitor API
//!
//! The [`Monitor`] owns the per-asset geofence boundaries, the running
//! monitoring sessions and the anomaly pipeline. Collaborators (store,
//! position source, alert sink) are injected.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use assetwatch::{AssetId, GeoPoint, MemoryTelemetryStore};
//! use assetwatch_monitor::{LatestFixSource, LogAlertSink, Monitor, MonitorConfig};
//!
//! # async fn run() -> assetwatch_monitor::Result<()> {
//! let source = Arc::new(LatestFixSource::new());
//! let monitor = Monitor::new(
//!     MonitorConfig::default(),
//!     Arc::new(MemoryTelemetryStore::new()),
//!     source.clone(),
//!     Arc::new(LogAlertSink),
//! );
//!
//! let car = AssetId::from("Car-1");
//! for (lat, lon) in [
//!     (9.08, 38.74), (9.055, 38.79), (9.005, 38.79),
//!     (8.98, 38.74), (9.005, 38.69), (9.055, 38.69),
//! ] {
//!     monitor.push_boundary_point(&car, GeoPoint::new(lat, lon)).await?;
//! }
//! source.report(&car, GeoPoint::new(9.03, 38.74)).await?;
//! monitor.start_session(&car).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use assetwatch::{
    AnomalyResult, AssetId, Component, GeoPoint, GeofenceBoundary, GeofenceState, HealthCheck,
    HealthMonitor, Reading, ReadingAggregator, TelemetryStore,
};
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::pipeline::{AnomalyPipeline, AnomalyReport};
use crate::predictor::AnomalyPredictor;
use crate::session::{MonitoringSession, SessionHandle, SessionSummary};
use crate::sink::AlertSink;
use crate::source::PositionSource;
use crate::stats::{MonitorStats, StatsSnapshot};

/// Anomaly prediction availability
enum Prediction {
    Ready(AnomalyPipeline),
    Disabled(String),
}

/// Boundary registry, session registry and anomaly pipeline
pub struct Monitor {
    config: MonitorConfig,
    store: Arc<dyn TelemetryStore>,
    source: Arc<dyn PositionSource>,
    sink: Arc<dyn AlertSink>,
    boundaries: Mutex<HashMap<AssetId, watch::Sender<GeofenceBoundary>>>,
    sessions: Mutex<HashMap<AssetId, SessionHandle>>,
    prediction: Prediction,
    stats: Arc<MonitorStats>,
}

impl Monitor {
    /// Create a monitor, resolving classifier artifacts from the config.
    ///
    /// Missing artifacts disable anomaly prediction only; geofencing and
    /// telemetry keep working.
    pub fn new(
        config: MonitorConfig,
        store: Arc<dyn TelemetryStore>,
        source: Arc<dyn PositionSource>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let predictor = AnomalyPredictor::from_config(&config.predictor).map_err(Into::into);
        Self::with_predictor(config, store, source, sink, predictor)
    }

    /// Create a monitor with an explicit predictor outcome
    pub fn with_predictor(
        config: MonitorConfig,
        store: Arc<dyn TelemetryStore>,
        source: Arc<dyn PositionSource>,
        sink: Arc<dyn AlertSink>,
        predictor: Result<AnomalyPredictor>,
    ) -> Self {
        let prediction = match predictor {
            Ok(predictor) => Prediction::Ready(AnomalyPipeline::new(
                Arc::clone(&store),
                ReadingAggregator::with_window(config.aggregation_window),
                Arc::new(predictor),
            )),
            Err(e) => {
                warn!(error = %e, "anomaly prediction disabled");
                Prediction::Disabled(e.to_string())
            }
        };

        Self {
            config,
            store,
            source,
            sink,
            boundaries: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            prediction,
            stats: Arc::new(MonitorStats::new()),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TelemetryStore> {
        &self.store
    }

    // ------------------------------------------------------------------
    // Boundaries
    // ------------------------------------------------------------------

    fn empty_boundary(&self) -> GeofenceBoundary {
        GeofenceBoundary::with_capacity(self.config.boundary_vertices)
    }

    /// Append a vertex to the asset's boundary, evicting the oldest when
    /// the boundary is full. Returns the boundary after the edit.
    pub async fn push_boundary_point(
        &self,
        asset_id: &AssetId,
        vertex: GeoPoint,
    ) -> Result<GeofenceBoundary> {
        if !vertex.is_valid() {
            return Err(MonitorError::InvalidPosition(vertex));
        }

        let mut boundaries = self.boundaries.lock().await;
        let boundary = boundaries
            .entry(asset_id.clone())
            .or_insert_with(|| watch::channel(self.empty_boundary()).0);
        boundary.send_modify(|b| {
            b.push(vertex);
        });
        let snapshot = boundary.borrow().clone();
        info!(
            asset = %asset_id,
            vertices = snapshot.len(),
            complete = snapshot.is_complete(),
            "boundary vertex added"
        );
        Ok(snapshot)
    }

    /// Remove every vertex of the asset's boundary
    pub async fn clear_boundary(&self, asset_id: &AssetId) {
        let boundaries = self.boundaries.lock().await;
        if let Some(boundary) = boundaries.get(asset_id) {
            boundary.send_modify(GeofenceBoundary::clear);
            info!(asset = %asset_id, "boundary cleared");
        }
    }

    /// Current boundary of the asset (empty when never edited)
    pub async fn boundary(&self, asset_id: &AssetId) -> GeofenceBoundary {
        let boundaries = self.boundaries.lock().await;
        match boundaries.get(asset_id) {
            Some(boundary) => boundary.borrow().clone(),
            None => self.empty_boundary(),
        }
    }

    async fn subscribe_boundary(&self, asset_id: &AssetId) -> watch::Receiver<GeofenceBoundary> {
        let mut boundaries = self.boundaries.lock().await;
        boundaries
            .entry(asset_id.clone())
            .or_insert_with(|| watch::channel(self.empty_boundary()).0)
            .subscribe()
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Start polling the asset's position
    pub async fn start_session(&self, asset_id: &AssetId) -> Result<()> {
        let boundary = self.subscribe_boundary(asset_id).await;
        let mut sessions = self.sessions.lock().await;

        if let Some(existing) = sessions.get(asset_id) {
            if !existing.is_finished() {
                return Err(MonitorError::SessionExists(asset_id.clone()));
            }
            sessions.remove(asset_id);
            self.stats.record_session_stopped();
        }

        let session = MonitoringSession::new(
            asset_id.clone(),
            self.config.session.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.sink),
            boundary,
            Arc::clone(&self.stats),
        );
        sessions.insert(asset_id.clone(), session.spawn());
        self.stats.record_session_started();
        Ok(())
    }

    /// Stop the asset's session and return its counters
    pub async fn stop_session(&self, asset_id: &AssetId) -> Result<SessionSummary> {
        let handle = self
            .sessions
            .lock()
            .await
            .remove(asset_id)
            .ok_or_else(|| MonitorError::SessionNotFound(asset_id.clone()))?;
        self.stats.record_session_stopped();
        handle.stop().await
    }

    /// Containment state of a running session
    pub async fn session_state(&self, asset_id: &AssetId) -> Option<GeofenceState> {
        self.sessions.lock().await.get(asset_id).map(SessionHandle::state)
    }

    /// Assets with a session, sorted
    pub async fn active_sessions(&self) -> Vec<AssetId> {
        let mut ids: Vec<AssetId> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop every session
    pub async fn shutdown(&self) -> Vec<SessionSummary> {
        let handles: Vec<SessionHandle> = self
            .sessions
            .lock()
            .await
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            self.stats.record_session_stopped();
            let asset = handle.asset_id().clone();
            match handle.stop().await {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!(asset = %asset, error = %e, "session did not stop cleanly"),
            }
        }
        info!(stopped = summaries.len(), "monitor shut down");
        summaries
    }

    // ------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------

    /// Register an asset with its placeholder reading
    pub fn register_asset(&self, asset_id: &AssetId, asset_value: Option<f64>) -> Result<Reading> {
        let reading = self.store.register_asset(asset_id, asset_value)?;
        info!(asset = %asset_id, "asset registered");
        Ok(reading)
    }

    /// Record a telemetry sample taken now
    pub fn record_reading(
        &self,
        asset_id: &AssetId,
        engine_temperature: Option<f64>,
        speed: Option<f64>,
    ) -> Result<Reading> {
        let reading = self
            .store
            .append_reading(asset_id, engine_temperature, speed)?;
        self.stats.record_reading();
        Ok(reading)
    }

    /// Newest-first readings, at most `limit`
    pub fn latest_readings(&self, asset_id: &AssetId, limit: usize) -> Result<Vec<Reading>> {
        Ok(self.store.latest_readings(asset_id, limit)?)
    }

    /// Newest reading of every asset
    pub fn latest_by_asset(&self) -> Result<Vec<Reading>> {
        Ok(self.store.latest_by_asset()?)
    }

    // ------------------------------------------------------------------
    // Anomaly prediction
    // ------------------------------------------------------------------

    pub fn predictor_ready(&self) -> bool {
        matches!(self.prediction, Prediction::Ready(_))
    }

    /// Reason anomaly prediction is disabled
    pub fn predictor_error(&self) -> Option<&str> {
        match &self.prediction {
            Prediction::Ready(_) => None,
            Prediction::Disabled(reason) => Some(reason.as_str()),
        }
    }

    /// Assess the asset's latest readings on a separate task.
    ///
    /// Sessions never wait on this. If the caller goes away the assessment
    /// still completes and its result is dropped.
    pub async fn request_anomaly(&self, asset_id: &AssetId) -> Result<AnomalyReport> {
        let pipeline = match &self.prediction {
            Prediction::Ready(pipeline) => pipeline.clone(),
            Prediction::Disabled(reason) => {
                return Err(MonitorError::PredictorUnavailable(reason.clone()))
            }
        };

        let asset = asset_id.clone();
        let task = tokio::spawn(async move { pipeline.assess(&asset).await });

        let report = match task.await {
            Ok(outcome) => outcome?,
            Err(e) => {
                error!(asset = %asset_id, error = %e, "anomaly task failed");
                AnomalyReport {
                    asset_id: asset_id.clone(),
                    features: None,
                    result: AnomalyResult::system_error(e.to_string()),
                    assessed_at: chrono::Utc::now(),
                }
            }
        };
        self.stats.record_prediction(report.result.kind);
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Health and statistics
    // ------------------------------------------------------------------

    /// Component health
    pub fn health(&self) -> HealthMonitor {
        let mut health = HealthMonitor::new();
        health.add_check(HealthCheck::healthy(Component::Geofencing));
        health.add_check(HealthCheck::healthy(Component::Telemetry));
        health.add_check(match self.predictor_error() {
            None => HealthCheck::healthy(Component::AnomalyPrediction),
            Some(reason) => HealthCheck::unhealthy(Component::AnomalyPrediction, reason),
        });
        health
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
