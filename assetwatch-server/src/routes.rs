// AssetWatch Server - HTTP routes
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! HTTP API: fleet registry, telemetry, device fixes, geofences,
//! monitoring sessions and anomaly reports.

use crate::metrics::{encode_metrics, update_from_snapshot};
use crate::replay::{DatasetInfo, ReplayState};
use assetwatch::{
    AssetId, BreachEvent, GeoPoint, GeofenceBoundary, GeofenceState, HealthMonitor, TelemetryError,
    DEFAULT_WINDOW,
};
use assetwatch_monitor::{
    LatestFixSource, MemoryAlertSink, Monitor, MonitorError, SourceError, StatsSnapshot,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Application state shared across handlers.
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub source: Arc<LatestFixSource>,
    pub alerts: Arc<MemoryAlertSink>,
    pub replay: Option<(Arc<ReplayState>, DatasetInfo)>,
    pub start_time: Instant,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .route("/assets", get(list_assets).post(register_asset))
        .route("/assets/summary", get(fleet_summary))
        .route("/assets/readings/latest", get(fleet_latest_readings))
        .route(
            "/assets/:id/readings",
            get(latest_readings).post(append_reading),
        )
        .route("/assets/:id/anomaly", get(anomaly_report))
        .route("/assets/:id/location", get(get_location).post(report_location))
        .route("/assets/:id/locations", get(location_trail))
        .route("/assets/:id/geofence/points", post(push_geofence_point))
        .route("/assets/:id/geofence", get(get_geofence).delete(clear_geofence))
        .route(
            "/assets/:id/monitor",
            get(session_status).post(start_monitor).delete(stop_monitor),
        )
        .route("/assets/:id/breaches", get(breaches))
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

/// Handler error, rendered as JSON `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Telemetry(TelemetryError::NotFound(_)) => {
                Self::NotFound("no readings yet".to_string())
            }
            MonitorError::Telemetry(e @ TelemetryError::AlreadyRegistered(_)) => {
                Self::Conflict(e.to_string())
            }
            e @ MonitorError::SessionExists(_) => Self::Conflict(e.to_string()),
            e @ MonitorError::SessionNotFound(_) => Self::NotFound(e.to_string()),
            e @ MonitorError::InvalidPosition(_) => Self::BadRequest(e.to_string()),
            MonitorError::Source(e) => e.into(),
            e @ MonitorError::PredictorUnavailable(_) => Self::Unavailable(e.to_string()),
            e => Self::Internal(e.to_string()),
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NoFix(_) => Self::NotFound("no position yet".to_string()),
            e @ SourceError::InvalidFix(_) => Self::BadRequest(e.to_string()),
            e => Self::Internal(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Conflict(m) => (StatusCode::CONFLICT, m),
            Self::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            Self::Internal(m) => {
                error!(error = %m, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Service endpoints
// ============================================================================

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>AssetWatch</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #2c3e50; }
        a { color: #3498db; text-decoration: none; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { margin: 10px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>AssetWatch</h1>
    <p>Vehicle tracking: geofence alerts and engine anomaly reports.</p>

    <div class="endpoints">
        <h2>Service</h2>
        <div class="endpoint"><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><a href="/health">/health</a> - Health check</div>
        <div class="endpoint"><a href="/ready">/ready</a> - Readiness check</div>
        <div class="endpoint"><a href="/status">/status</a> - Status information (JSON)</div>
    </div>

    <div class="endpoints">
        <h2>Fleet</h2>
        <div class="endpoint"><code>GET|POST /assets</code> - Asset registry</div>
        <div class="endpoint"><code>GET /assets/summary</code> - Fleet valuation</div>
        <div class="endpoint"><code>GET|POST /assets/{id}/readings</code> - Engine telemetry</div>
        <div class="endpoint"><code>GET /assets/{id}/anomaly</code> - Anomaly report</div>
        <div class="endpoint"><code>GET|POST /assets/{id}/location</code> - Device GPS fix</div>
        <div class="endpoint"><code>POST /assets/{id}/geofence/points</code> - Add boundary vertex</div>
        <div class="endpoint"><code>GET|DELETE /assets/{id}/geofence</code> - Boundary</div>
        <div class="endpoint"><code>GET|POST|DELETE /assets/{id}/monitor</code> - Monitoring session</div>
        <div class="endpoint"><code>GET /assets/{id}/breaches</code> - Breach history</div>
    </div>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    update_from_snapshot(&state.monitor.stats(), state.monitor.predictor_ready());
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        encode_metrics(),
    )
}

/// Liveness check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler. Geofencing works without the predictor, but
/// anomaly reports do not.
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.monitor.predictor_error() {
        None => (StatusCode::OK, "Ready".to_string()),
        Some(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Anomaly prediction unavailable: {reason}"),
        ),
    }
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    health: HealthMonitor,
    active_sessions: Vec<AssetId>,
    stats: StatsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay: Option<ReplayStatus>,
}

/// Replay status information.
#[derive(Serialize)]
struct ReplayStatus {
    running: bool,
    position: usize,
    total_rows: usize,
    rejected_rows: usize,
    progress_percent: f64,
    assets: Vec<String>,
    duration_ms: u64,
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let replay = state.replay.as_ref().map(|(replay_state, info)| {
        let position = replay_state.position.load(Ordering::SeqCst);
        let total = replay_state.total_rows.load(Ordering::SeqCst);
        let progress = if total > 0 {
            (position as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        ReplayStatus {
            running: replay_state.running.load(Ordering::SeqCst),
            position,
            total_rows: total,
            rejected_rows: replay_state.rejected_rows.load(Ordering::SeqCst),
            progress_percent: progress,
            assets: info.asset_ids.clone(),
            duration_ms: info.duration_ms,
        }
    });

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        health: state.monitor.health(),
        active_sessions: state.monitor.active_sessions().await,
        stats: state.monitor.stats(),
        replay,
    })
}

// ============================================================================
// Fleet and telemetry
// ============================================================================

#[derive(Debug, Deserialize)]
struct RegisterAsset {
    asset_id: String,
    #[serde(default)]
    asset_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReadingBody {
    #[serde(default)]
    engine_temperature: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn list_assets(State(state): State<Arc<AppState>>) -> Json<Vec<AssetId>> {
    Json(state.monitor.store().assets())
}

async fn register_asset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterAsset>,
) -> ApiResult<impl IntoResponse> {
    if body.asset_id.trim().is_empty() {
        return Err(ApiError::BadRequest("asset_id must not be empty".to_string()));
    }
    let asset_id = AssetId::new(body.asset_id);
    let reading = state.monitor.register_asset(&asset_id, body.asset_value)?;
    Ok((StatusCode::CREATED, Json(reading)))
}

async fn fleet_summary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.store().fleet_summary())
}

async fn append_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ReadingBody>,
) -> ApiResult<impl IntoResponse> {
    let asset_id = AssetId::new(id);
    let reading = state
        .monitor
        .record_reading(&asset_id, body.engine_temperature, body.speed)?;
    Ok((StatusCode::CREATED, Json(reading)))
}

async fn latest_readings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_WINDOW);
    let readings = state.monitor.latest_readings(&AssetId::new(id), limit)?;
    Ok(Json(readings))
}

async fn fleet_latest_readings(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.monitor.latest_by_asset()?))
}

async fn anomaly_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let report = state.monitor.request_anomaly(&AssetId::new(id)).await?;
    Ok(Json(report))
}

// ============================================================================
// Positions and geofences
// ============================================================================

async fn report_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(position): Json<GeoPoint>,
) -> ApiResult<impl IntoResponse> {
    let fix = state.source.report(&AssetId::new(id), position).await?;
    Ok(Json(fix))
}

async fn get_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let asset_id = AssetId::new(id);
    let fix = state
        .source
        .latest(&asset_id)
        .await
        .ok_or(SourceError::NoFix(asset_id))?;
    Ok(Json(fix))
}

async fn location_trail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(state.source.history_capacity());
    Json(state.source.trail(&AssetId::new(id), limit).await)
}

/// Boundary as exposed over HTTP.
#[derive(Serialize)]
struct BoundaryView {
    asset_id: AssetId,
    vertices: Vec<GeoPoint>,
    capacity: usize,
    complete: bool,
}

impl BoundaryView {
    fn new(asset_id: AssetId, boundary: &GeofenceBoundary) -> Self {
        Self {
            asset_id,
            vertices: boundary.vertices(),
            capacity: boundary.capacity(),
            complete: boundary.is_complete(),
        }
    }
}

async fn push_geofence_point(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(vertex): Json<GeoPoint>,
) -> ApiResult<impl IntoResponse> {
    let asset_id = AssetId::new(id);
    let boundary = state.monitor.push_boundary_point(&asset_id, vertex).await?;
    Ok(Json(BoundaryView::new(asset_id, &boundary)))
}

async fn get_geofence(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let asset_id = AssetId::new(id);
    let boundary = state.monitor.boundary(&asset_id).await;
    Json(BoundaryView::new(asset_id, &boundary))
}

async fn clear_geofence(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    state.monitor.clear_boundary(&AssetId::new(id)).await;
    StatusCode::NO_CONTENT
}

// ============================================================================
// Monitoring sessions
// ============================================================================

#[derive(Serialize)]
struct SessionStatus {
    asset_id: AssetId,
    state: GeofenceState,
}

async fn start_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let asset_id = AssetId::new(id);
    state.monitor.start_session(&asset_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionStatus {
            asset_id,
            state: GeofenceState::Unknown,
        }),
    ))
}

async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let asset_id = AssetId::new(id);
    let current = state
        .monitor
        .session_state(&asset_id)
        .await
        .ok_or_else(|| MonitorError::SessionNotFound(asset_id.clone()))?;
    Ok(Json(SessionStatus {
        asset_id,
        state: current,
    }))
}

async fn stop_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let summary = state.monitor.stop_session(&AssetId::new(id)).await?;
    Ok(Json(summary))
}

#[derive(Serialize)]
struct BreachReport {
    asset_id: AssetId,
    breach_count: usize,
    breaches: Vec<BreachEvent>,
}

async fn breaches(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    let asset_id = AssetId::new(id);
    let breach_count = state.alerts.breach_count(&asset_id).await;
    let breaches = state.alerts.breach_details(&asset_id).await;
    Json(BreachReport {
        asset_id,
        breach_count,
        breaches,
    })
}
