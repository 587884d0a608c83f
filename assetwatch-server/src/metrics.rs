// AssetWatch Server - Prometheus metrics definitions
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for AssetWatch.
//!
//! Counters live in the monitor; the gauges below mirror a
//! [`StatsSnapshot`] each time `/metrics` is scraped.

use assetwatch::AnomalyKind;
use assetwatch_monitor::StatsSnapshot;
use lazy_static::lazy_static;
use prometheus::{register_gauge, register_gauge_vec, Encoder, Gauge, GaugeVec, TextEncoder};
use tracing::warn;

lazy_static! {
    // ============================================================
    // Geofencing
    // ============================================================

    /// Position samples evaluated against a boundary.
    pub static ref POLLS_TOTAL: Gauge = register_gauge!(
        "assetwatch_polls_total",
        "Position samples evaluated against a geofence"
    ).unwrap();

    /// Polls where no position was available.
    pub static ref SOURCE_ERRORS_TOTAL: Gauge = register_gauge!(
        "assetwatch_source_errors_total",
        "Polls without a position fix"
    ).unwrap();

    /// Breach events by kind (entered / exited).
    pub static ref BREACHES_TOTAL: GaugeVec = register_gauge_vec!(
        "assetwatch_breaches_total",
        "Geofence events emitted",
        &["event"]
    ).unwrap();

    /// Failed or timed-out alert deliveries.
    pub static ref ALERT_FAILURES_TOTAL: Gauge = register_gauge!(
        "assetwatch_alert_failures_total",
        "Alert deliveries that failed or timed out"
    ).unwrap();

    /// Running monitoring sessions.
    pub static ref ACTIVE_SESSIONS: Gauge = register_gauge!(
        "assetwatch_active_sessions",
        "Running monitoring sessions"
    ).unwrap();

    // ============================================================
    // Telemetry and prediction
    // ============================================================

    /// Readings written through the API or replay.
    pub static ref READINGS_APPENDED_TOTAL: Gauge = register_gauge!(
        "assetwatch_readings_appended_total",
        "Telemetry readings recorded"
    ).unwrap();

    /// Anomaly assessments by outcome.
    pub static ref PREDICTIONS_TOTAL: GaugeVec = register_gauge_vec!(
        "assetwatch_predictions_total",
        "Anomaly assessments by outcome",
        &["kind"]
    ).unwrap();

    /// 1 when classifier artifacts resolved.
    pub static ref PREDICTOR_READY: Gauge = register_gauge!(
        "assetwatch_predictor_ready",
        "Anomaly predictor availability (1=ready, 0=disabled)"
    ).unwrap();

    // ============================================================
    // Replay
    // ============================================================

    /// Current replay position (row index).
    pub static ref REPLAY_POSITION: Gauge = register_gauge!(
        "assetwatch_replay_position",
        "Current replay position (row index)"
    ).unwrap();

    /// Rows in the replay dataset.
    pub static ref REPLAY_TOTAL_ROWS: Gauge = register_gauge!(
        "assetwatch_replay_total_rows",
        "Rows in the replay dataset"
    ).unwrap();

    /// Replay speed multiplier.
    pub static ref REPLAY_SPEED: Gauge = register_gauge!(
        "assetwatch_replay_speed",
        "Replay speed multiplier"
    ).unwrap();
}

/// Mirror monitor counters into the gauges.
pub fn update_from_snapshot(snapshot: &StatsSnapshot, predictor_ready: bool) {
    POLLS_TOTAL.set(snapshot.polls as f64);
    SOURCE_ERRORS_TOTAL.set(snapshot.source_errors as f64);
    BREACHES_TOTAL
        .with_label_values(&["entered"])
        .set(snapshot.breaches_entered as f64);
    BREACHES_TOTAL
        .with_label_values(&["exited"])
        .set(snapshot.breaches_exited as f64);
    ALERT_FAILURES_TOTAL.set(snapshot.alert_failures as f64);
    ACTIVE_SESSIONS.set(snapshot.active_sessions() as f64);
    READINGS_APPENDED_TOTAL.set(snapshot.readings_appended as f64);

    for kind in AnomalyKind::ALL {
        PREDICTIONS_TOTAL
            .with_label_values(&[kind.as_str()])
            .set(snapshot.predictions_of(kind) as f64);
    }

    PREDICTOR_READY.set(if predictor_ready { 1.0 } else { 0.0 });
}

/// Update replay position metrics.
pub fn update_replay_metrics(position: usize, total: usize, speed: f64) {
    REPLAY_POSITION.set(position as f64);
    REPLAY_TOTAL_ROWS.set(total as f64);
    REPLAY_SPEED.set(speed);
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
