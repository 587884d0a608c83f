// AssetWatch Monitor - Session tests
//
// Sessions run on paused tokio time; sleeping in the test advances the
// clock through the poll ticks deterministically.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assetwatch::{
    AssetId, BreachEvent, BreachKind, GeoPoint, GeofenceState, MemoryTelemetryStore,
    RealertPolicy,
};
use assetwatch_monitor::{
    AlertError, AlertSink, ArtifactError, LatestFixSource, MemoryAlertSink, Monitor,
    MonitorConfig, SessionConfig,
};
use async_trait::async_trait;
use tokio::time::sleep;

// ============================================================================
// Helper Functions
// ============================================================================

const HEXAGON: [(f64, f64); 6] = [
    (9.08, 38.74),
    (9.055, 38.79),
    (9.005, 38.79),
    (8.98, 38.74),
    (9.005, 38.69),
    (9.055, 38.69),
];

const INSIDE: GeoPoint = GeoPoint::new(9.03, 38.74);
const OUTSIDE: GeoPoint = GeoPoint::new(9.10, 38.90);

struct Fixture {
    monitor: Monitor,
    source: Arc<LatestFixSource>,
    car: AssetId,
}

fn fixture_with(session: SessionConfig, sink: Arc<dyn AlertSink>) -> Fixture {
    let source = Arc::new(LatestFixSource::new());
    let config = MonitorConfig {
        session,
        ..Default::default()
    };
    let monitor = Monitor::with_predictor(
        config,
        Arc::new(MemoryTelemetryStore::new()),
        source.clone(),
        sink,
        Err(ArtifactError::MissingModel(PathBuf::from("rf.pkl")).into()),
    );
    Fixture {
        monitor,
        source,
        car: AssetId::from("Car-1"),
    }
}

fn fixture() -> (Fixture, Arc<MemoryAlertSink>) {
    let sink = Arc::new(MemoryAlertSink::new());
    (fixture_with(SessionConfig::default(), sink.clone()), sink)
}

async fn draw_hexagon(f: &Fixture) {
    for (lat, lon) in HEXAGON {
        f.monitor
            .push_boundary_point(&f.car, GeoPoint::new(lat, lon))
            .await
            .unwrap();
    }
}

/// Sink that never answers in time
struct StalledSink;

#[async_trait]
impl AlertSink for StalledSink {
    async fn deliver(&self, _event: &BreachEvent) -> Result<(), AlertError> {
        sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

// ============================================================================
// Alert cadence
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_three_outside_polls_three_alerts() {
    let (f, sink) = fixture();
    draw_hexagon(&f).await;
    f.source.report(&f.car, OUTSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    // Ticks at 0 s, 5 s and 10 s
    sleep(Duration::from_millis(10_100)).await;

    let summary = f.monitor.stop_session(&f.car).await.unwrap();
    assert_eq!(summary.polls, 3);
    assert_eq!(summary.alerts, 3);
    assert_eq!(summary.final_state, GeofenceState::Outside);
    assert_eq!(sink.breach_count(&f.car).await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_parked_outside_keeps_alert_log_bounded() {
    let sink = Arc::new(MemoryAlertSink::with_capacity(10));
    let f = fixture_with(SessionConfig::default(), sink.clone());
    draw_hexagon(&f).await;
    f.source.report(&f.car, OUTSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    // One hour of 5 s ticks, 0 s through 3600 s
    sleep(Duration::from_millis(3_600_100)).await;

    let summary = f.monitor.stop_session(&f.car).await.unwrap();
    assert_eq!(summary.polls, 721);
    assert_eq!(sink.len().await, 10);
    assert_eq!(sink.breach_count(&f.car).await, 721);
    assert_eq!(sink.breach_details(&f.car).await.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_inside_baseline_then_exit() {
    let (f, sink) = fixture();
    draw_hexagon(&f).await;
    f.source.report(&f.car, INSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(
        f.monitor.session_state(&f.car).await,
        Some(GeofenceState::Inside)
    );
    assert!(sink.is_empty().await);

    f.source.report(&f.car, OUTSIDE).await.unwrap();
    sleep(Duration::from_secs(5)).await;

    let events = sink.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, BreachKind::Exited);
    assert_eq!(events[0].position, OUTSIDE);

    f.source.report(&f.car, INSIDE).await.unwrap();
    sleep(Duration::from_secs(5)).await;
    let events = sink.events().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].kind, BreachKind::Entered);

    f.monitor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_boundary_never_alerts() {
    let (f, sink) = fixture();
    for (lat, lon) in &HEXAGON[..5] {
        f.monitor
            .push_boundary_point(&f.car, GeoPoint::new(*lat, *lon))
            .await
            .unwrap();
    }
    f.source.report(&f.car, OUTSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    sleep(Duration::from_millis(15_100)).await;

    assert_eq!(
        f.monitor.session_state(&f.car).await,
        Some(GeofenceState::Unknown)
    );
    let summary = f.monitor.stop_session(&f.car).await.unwrap();
    assert_eq!(summary.polls, 4);
    assert!(sink.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_transitions_only_policy() {
    let sink = Arc::new(MemoryAlertSink::new());
    let session = SessionConfig {
        realert: RealertPolicy::TransitionsOnly,
        ..Default::default()
    };
    let f = fixture_with(session, sink.clone());
    draw_hexagon(&f).await;
    f.source.report(&f.car, OUTSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    sleep(Duration::from_millis(10_100)).await;

    let summary = f.monitor.stop_session(&f.car).await.unwrap();
    assert_eq!(summary.polls, 3);
    assert_eq!(sink.breach_count(&f.car).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_skip_unchanged_positions() {
    let sink = Arc::new(MemoryAlertSink::new());
    let session = SessionConfig {
        skip_unchanged_positions: true,
        ..Default::default()
    };
    let f = fixture_with(session, sink.clone());
    draw_hexagon(&f).await;
    f.source.report(&f.car, OUTSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    sleep(Duration::from_millis(10_100)).await;

    let summary = f.monitor.stop_session(&f.car).await.unwrap();
    assert_eq!(summary.polls, 1);
    assert_eq!(sink.len().await, 1);
}

// ============================================================================
// Boundary edits
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_boundary_clear_resets_state() {
    let (f, sink) = fixture();
    draw_hexagon(&f).await;
    f.source.report(&f.car, INSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(
        f.monitor.session_state(&f.car).await,
        Some(GeofenceState::Inside)
    );

    f.monitor.clear_boundary(&f.car).await;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(
        f.monitor.session_state(&f.car).await,
        Some(GeofenceState::Unknown)
    );

    sleep(Duration::from_secs(5)).await;
    assert_eq!(
        f.monitor.session_state(&f.car).await,
        Some(GeofenceState::Unknown)
    );
    assert!(sink.is_empty().await);

    f.monitor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_redrawn_boundary_applies_to_running_session() {
    let (f, sink) = fixture();
    draw_hexagon(&f).await;
    f.source.report(&f.car, INSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    sleep(Duration::from_secs(1)).await;

    // Same shape two degrees east; the ring buffer replaces every vertex
    for (lat, lon) in HEXAGON {
        f.monitor
            .push_boundary_point(&f.car, GeoPoint::new(lat, lon + 2.0))
            .await
            .unwrap();
    }
    sleep(Duration::from_secs(5)).await;

    assert_eq!(
        f.monitor.session_state(&f.car).await,
        Some(GeofenceState::Outside)
    );
    let events = sink.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, BreachKind::Exited);

    f.monitor.shutdown().await;
}

// ============================================================================
// Failures and lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stalled_sink_times_out_and_polling_continues() {
    let f = fixture_with(SessionConfig::default(), Arc::new(StalledSink));
    draw_hexagon(&f).await;
    f.source.report(&f.car, OUTSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    sleep(Duration::from_millis(5_100)).await;

    let summary = f.monitor.stop_session(&f.car).await.unwrap();
    assert_eq!(summary.polls, 2);
    assert_eq!(summary.alert_failures, 2);
    assert_eq!(f.monitor.stats().alert_failures, 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_fix_counts_source_errors() {
    let (f, sink) = fixture();
    draw_hexagon(&f).await;

    f.monitor.start_session(&f.car).await.unwrap();
    sleep(Duration::from_millis(5_100)).await;

    let summary = f.monitor.stop_session(&f.car).await.unwrap();
    assert_eq!(summary.polls, 0);
    assert_eq!(summary.source_errors, 2);
    assert!(sink.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_stopped_session_no_longer_polls() {
    let (f, sink) = fixture();
    draw_hexagon(&f).await;
    f.source.report(&f.car, OUTSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    f.monitor.stop_session(&f.car).await.unwrap();
    assert_eq!(sink.len().await, 1);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(sink.len().await, 1);
    assert_eq!(f.monitor.session_state(&f.car).await, None);
}

#[tokio::test(start_paused = true)]
async fn test_sessions_are_independent() {
    let (f, sink) = fixture();
    let other = AssetId::from("Car-2");
    draw_hexagon(&f).await;
    f.source.report(&f.car, OUTSIDE).await.unwrap();
    f.source.report(&other, OUTSIDE).await.unwrap();

    f.monitor.start_session(&f.car).await.unwrap();
    f.monitor.start_session(&other).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    // Car-2 has no boundary of its own
    assert_eq!(sink.breach_count(&f.car).await, 1);
    assert_eq!(sink.breach_count(&other).await, 0);
    assert_eq!(f.monitor.stats().active_sessions(), 2);

    let summaries = f.monitor.shutdown().await;
    assert_eq!(summaries.len(), 2);
    assert!(f.monitor.active_sessions().await.is_empty());
}
