// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Monitor counters
//!
//! Lock-free counters shared by sessions and the anomaly pipeline. The
//! exporter reads them through [`MonitorStats::snapshot`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use assetwatch::{AnomalyKind, BreachKind};
use serde::{Deserialize, Serialize};

/// Shared counters
#[derive(Debug, Default)]
pub struct MonitorStats {
    polls: AtomicU64,
    source_errors: AtomicU64,
    breaches_entered: AtomicU64,
    breaches_exited: AtomicU64,
    alert_failures: AtomicU64,
    readings_appended: AtomicU64,
    sessions_started: AtomicU64,
    sessions_stopped: AtomicU64,
    predictions: [AtomicU64; AnomalyKind::ALL.len()],
}

impl MonitorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_error(&self) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_breach(&self, kind: BreachKind) {
        let counter = match kind {
            BreachKind::Entered => &self.breaches_entered,
            BreachKind::Exited => &self.breaches_exited,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_failure(&self) {
        self.alert_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reading(&self) {
        self.readings_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_stopped(&self) {
        self.sessions_stopped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prediction(&self, kind: AnomalyKind) {
        if let Some(index) = AnomalyKind::ALL.iter().position(|k| *k == kind) {
            self.predictions[index].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        let predictions = AnomalyKind::ALL
            .iter()
            .zip(&self.predictions)
            .map(|(kind, count)| (kind.as_str().to_string(), count.load(Ordering::Relaxed)))
            .collect();

        StatsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            breaches_entered: self.breaches_entered.load(Ordering::Relaxed),
            breaches_exited: self.breaches_exited.load(Ordering::Relaxed),
            alert_failures: self.alert_failures.load(Ordering::Relaxed),
            readings_appended: self.readings_appended.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_stopped: self.sessions_stopped.load(Ordering::Relaxed),
            predictions,
        }
    }
}

/// Serializable counter values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub polls: u64,
    pub source_errors: u64,
    pub breaches_entered: u64,
    pub breaches_exited: u64,
    pub alert_failures: u64,
    pub readings_appended: u64,
    pub sessions_started: u64,
    pub sessions_stopped: u64,
    /// Prediction outcomes keyed by kind name
    pub predictions: BTreeMap<String, u64>,
}

impl StatsSnapshot {
    /// Sessions started and not yet stopped
    pub fn active_sessions(&self) -> u64 {
        self.sessions_started.saturating_sub(self.sessions_stopped)
    }

    pub fn predictions_of(&self, kind: AnomalyKind) -> u64 {
        self.predictions.get(kind.as_str()).copied().unwrap_or(0)
    }
}
