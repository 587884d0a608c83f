// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Geofence monitoring sessions
//!
//! A session polls one asset's position on a fixed interval, evaluates it
//! against the asset's boundary and hands any transition to the alert sink.
//! A slow poll or delivery delays the next tick instead of queueing ticks.
//!
//! Boundary edits arrive through a `watch` channel. Any change resets the
//! containment state to `Unknown`, so the next sample re-establishes the
//! baseline.

use std::sync::Arc;

use assetwatch::{AssetId, GeoPoint, GeofenceBoundary, GeofenceEngine, GeofenceState};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{AlertError, MonitorError, Result};
use crate::sink::AlertSink;
use crate::source::PositionSource;
use crate::stats::MonitorStats;

/// Counters of a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub asset_id: AssetId,
    /// Samples evaluated against the boundary
    pub polls: u64,
    /// Events handed to the sink
    pub alerts: u64,
    /// Deliveries that failed or timed out
    pub alert_failures: u64,
    /// Polls where the source had no position
    pub source_errors: u64,
    pub final_state: GeofenceState,
}

/// Control handle of a running session
#[derive(Debug)]
pub struct SessionHandle {
    asset_id: AssetId,
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<GeofenceState>,
    task: JoinHandle<SessionSummary>,
}

impl SessionHandle {
    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    /// Containment state after the last evaluated sample
    pub fn state(&self) -> GeofenceState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop and wait for it to exit.
    ///
    /// No poll is started after the signal is observed.
    pub async fn stop(self) -> Result<SessionSummary> {
        // The loop may already be gone; the join below reports how it ended
        let _ = self.shutdown.send(true);
        self.task.await.map_err(|e| MonitorError::SessionAborted {
            asset: self.asset_id,
            reason: e.to_string(),
        })
    }
}

/// Polling loop for one asset
pub struct MonitoringSession {
    asset_id: AssetId,
    config: SessionConfig,
    engine: GeofenceEngine,
    source: Arc<dyn PositionSource>,
    sink: Arc<dyn AlertSink>,
    boundary: watch::Receiver<GeofenceBoundary>,
    stats: Arc<MonitorStats>,
    state: GeofenceState,
    last_position: Option<GeoPoint>,
    summary: SessionSummary,
}

impl MonitoringSession {
    pub fn new(
        asset_id: AssetId,
        config: SessionConfig,
        source: Arc<dyn PositionSource>,
        sink: Arc<dyn AlertSink>,
        boundary: watch::Receiver<GeofenceBoundary>,
        stats: Arc<MonitorStats>,
    ) -> Self {
        Self {
            engine: GeofenceEngine::with_policy(config.realert),
            summary: SessionSummary {
                asset_id: asset_id.clone(),
                polls: 0,
                alerts: 0,
                alert_failures: 0,
                source_errors: 0,
                final_state: GeofenceState::Unknown,
            },
            asset_id,
            config,
            source,
            sink,
            boundary,
            stats,
            state: GeofenceState::Unknown,
            last_position: None,
        }
    }

    /// Run the loop on its own task
    pub fn spawn(self) -> SessionHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(GeofenceState::Unknown);
        let asset_id = self.asset_id.clone();
        let task = tokio::spawn(self.run(shutdown_rx, state_tx));

        SessionHandle {
            asset_id,
            shutdown: shutdown_tx,
            state: state_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
        state_tx: watch::Sender<GeofenceState>,
    ) -> SessionSummary {
        info!(
            asset = %self.asset_id,
            interval = ?self.config.poll_interval(),
            "monitoring session started"
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut boundary_open = true;

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                changed = self.boundary.changed(), if boundary_open => {
                    match changed {
                        Ok(()) => {
                            self.boundary.borrow_and_update();
                            self.reset_state(&state_tx);
                        }
                        Err(_) => {
                            // Editor dropped; keep polling the last boundary
                            boundary_open = false;
                        }
                    }
                }

                _ = ticker.tick() => {
                    self.poll_once(&state_tx).await;
                }
            }
        }

        self.summary.final_state = self.state;
        info!(
            asset = %self.asset_id,
            polls = self.summary.polls,
            alerts = self.summary.alerts,
            "monitoring session stopped"
        );
        self.summary
    }

    fn reset_state(&mut self, state_tx: &watch::Sender<GeofenceState>) {
        debug!(asset = %self.asset_id, "boundary changed, containment state reset");
        self.state = GeofenceState::Unknown;
        self.last_position = None;
        state_tx.send_replace(GeofenceState::Unknown);
    }

    async fn poll_once(&mut self, state_tx: &watch::Sender<GeofenceState>) {
        let position = match self.source.current_position(&self.asset_id).await {
            Ok(position) => position,
            Err(e) => {
                debug!(asset = %self.asset_id, error = %e, "no position this tick");
                self.summary.source_errors += 1;
                self.stats.record_source_error();
                return;
            }
        };

        // An edit that landed during the source call applies before evaluating
        if self.boundary.has_changed().unwrap_or(false) {
            self.reset_state(state_tx);
        }

        if self.config.skip_unchanged_positions && self.last_position == Some(position) {
            return;
        }
        self.last_position = Some(position);

        let evaluation = {
            let boundary = self.boundary.borrow_and_update();
            self.engine.evaluate(&boundary, position, self.state)
        };
        self.summary.polls += 1;
        self.stats.record_poll();

        if evaluation.state != self.state {
            debug!(
                asset = %self.asset_id,
                from = self.state.as_str(),
                to = evaluation.state.as_str(),
                "containment state changed"
            );
        }
        self.state = evaluation.state;
        state_tx.send_replace(evaluation.state);

        let Some(event) = evaluation.into_event(self.asset_id.clone(), position, Utc::now()) else {
            return;
        };

        self.summary.alerts += 1;
        self.stats.record_breach(event.kind);

        let timeout = self.config.alert_timeout();
        let delivery = match tokio::time::timeout(timeout, self.sink.deliver(&event)).await {
            Ok(result) => result,
            Err(_) => Err(AlertError::Timeout(timeout)),
        };
        if let Err(e) = delivery {
            warn!(
                asset = %self.asset_id,
                event = event.kind.as_str(),
                error = %e,
                "alert delivery failed"
            );
            self.summary.alert_failures += 1;
            self.stats.record_alert_failure();
        }
    }
}
