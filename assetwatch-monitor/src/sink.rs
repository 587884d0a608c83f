// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Alert sinks
//!
//! Sessions hand every breach event to an [`AlertSink`] and move on. A
//! failed delivery is logged by the session and never retried.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use assetwatch::{AssetId, BreachEvent, BreachKind};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::AlertError;

/// Receives geofence transition events
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, event: &BreachEvent) -> Result<(), AlertError>;
}

/// Events kept by [`MemoryAlertSink::new`]
pub const DEFAULT_ALERT_HISTORY: usize = 1_000;

/// In-memory alert log
///
/// Retains the most recent `capacity` events. Per-asset exit counts
/// cover every delivery, including evicted ones.
#[derive(Debug)]
pub struct MemoryAlertSink {
    capacity: usize,
    log: Mutex<AlertLog>,
}

#[derive(Debug, Default)]
struct AlertLog {
    events: VecDeque<BreachEvent>,
    exits: HashMap<AssetId, usize>,
    delivered: u64,
}

impl Default for MemoryAlertSink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ALERT_HISTORY)
    }
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` events (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            log: Mutex::new(AlertLog {
                events: VecDeque::with_capacity(capacity.min(DEFAULT_ALERT_HISTORY)),
                ..Default::default()
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained events in delivery order
    pub async fn events(&self) -> Vec<BreachEvent> {
        self.log.lock().await.events.iter().cloned().collect()
    }

    /// Retained events for one asset in delivery order
    pub async fn events_for(&self, asset_id: &AssetId) -> Vec<BreachEvent> {
        self.log
            .lock()
            .await
            .events
            .iter()
            .filter(|e| &e.asset_id == asset_id)
            .cloned()
            .collect()
    }

    /// Number of `exited` events ever delivered for an asset
    pub async fn breach_count(&self, asset_id: &AssetId) -> usize {
        self.log
            .lock()
            .await
            .exits
            .get(asset_id)
            .copied()
            .unwrap_or(0)
    }

    /// Retained `exited` events for an asset, newest first
    pub async fn breach_details(&self, asset_id: &AssetId) -> Vec<BreachEvent> {
        let mut breaches: Vec<BreachEvent> = self
            .log
            .lock()
            .await
            .events
            .iter()
            .rev()
            .filter(|e| &e.asset_id == asset_id && e.kind == BreachKind::Exited)
            .cloned()
            .collect();
        // Stable: equal timestamps keep newest-delivered first
        breaches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        breaches
    }

    /// Total deliveries, retained or not
    pub async fn delivered(&self) -> u64 {
        self.log.lock().await.delivered
    }

    /// Retained events
    pub async fn len(&self) -> usize {
        self.log.lock().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.log.lock().await.events.is_empty()
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    async fn deliver(&self, event: &BreachEvent) -> Result<(), AlertError> {
        let mut log = self.log.lock().await;
        if log.events.len() == self.capacity {
            log.events.pop_front();
        }
        log.events.push_back(event.clone());
        if event.kind == BreachKind::Exited {
            *log.exits.entry(event.asset_id.clone()).or_insert(0) += 1;
        }
        log.delivered += 1;
        Ok(())
    }
}

/// Writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn deliver(&self, event: &BreachEvent) -> Result<(), AlertError> {
        warn!(
            asset = %event.asset_id,
            event = event.kind.as_str(),
            latitude = event.position.latitude,
            longitude = event.position.longitude,
            timestamp = %event.timestamp,
            "geofence alert"
        );
        Ok(())
    }
}

/// Delivers each event to several sinks
#[derive(Default, Clone)]
pub struct FanoutAlertSink {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl FanoutAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a downstream sink
    pub fn with(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl AlertSink for FanoutAlertSink {
    /// Every sink is attempted; the first error is returned
    async fn deliver(&self, event: &BreachEvent) -> Result<(), AlertError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(event).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetwatch::GeoPoint;
    use chrono::{Duration, Utc};

    fn event(asset: &str, kind: BreachKind, offset_secs: i64) -> BreachEvent {
        BreachEvent {
            asset_id: AssetId::from(asset),
            kind,
            position: GeoPoint::new(9.10, 38.90),
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    struct RejectingSink;

    #[async_trait]
    impl AlertSink for RejectingSink {
        async fn deliver(&self, _event: &BreachEvent) -> Result<(), AlertError> {
            Err(AlertError::Delivery("push service down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_breach_count_only_exits() {
        let sink = MemoryAlertSink::new();
        sink.deliver(&event("Car-1", BreachKind::Exited, 0)).await.unwrap();
        sink.deliver(&event("Car-1", BreachKind::Entered, 1)).await.unwrap();
        sink.deliver(&event("Car-1", BreachKind::Exited, 2)).await.unwrap();
        sink.deliver(&event("Car-2", BreachKind::Exited, 3)).await.unwrap();

        let car = AssetId::from("Car-1");
        assert_eq!(sink.len().await, 4);
        assert_eq!(sink.breach_count(&car).await, 2);
        assert_eq!(sink.events_for(&car).await.len(), 3);
    }

    #[tokio::test]
    async fn test_breach_details_newest_first() {
        let sink = MemoryAlertSink::new();
        let older = event("Car-1", BreachKind::Exited, 0);
        let newer = event("Car-1", BreachKind::Exited, 10);
        sink.deliver(&older).await.unwrap();
        sink.deliver(&newer).await.unwrap();

        let details = sink.breach_details(&AssetId::from("Car-1")).await;
        assert_eq!(details, vec![newer, older]);
    }

    #[tokio::test]
    async fn test_history_evicts_oldest_and_keeps_counts() {
        let sink = MemoryAlertSink::with_capacity(3);
        let car = AssetId::from("Car-1");
        for i in 0..10 {
            sink.deliver(&event("Car-1", BreachKind::Exited, i)).await.unwrap();
        }
        sink.deliver(&event("Car-1", BreachKind::Entered, 10)).await.unwrap();

        assert_eq!(sink.len().await, 3);
        assert_eq!(sink.delivered().await, 11);
        assert_eq!(sink.breach_count(&car).await, 10);

        let details = sink.breach_details(&car).await;
        assert_eq!(details.len(), 2);
        assert!(details[0].timestamp > details[1].timestamp);
        assert_eq!(sink.events().await.last().unwrap().kind, BreachKind::Entered);
    }

    #[tokio::test]
    async fn test_zero_capacity_keeps_latest() {
        let sink = MemoryAlertSink::with_capacity(0);
        assert_eq!(sink.capacity(), 1);
        sink.deliver(&event("Car-1", BreachKind::Exited, 0)).await.unwrap();
        sink.deliver(&event("Car-2", BreachKind::Exited, 1)).await.unwrap();

        assert_eq!(sink.len().await, 1);
        assert_eq!(sink.events().await[0].asset_id, AssetId::from("Car-2"));
        assert_eq!(sink.breach_count(&AssetId::from("Car-1")).await, 1);
    }

    #[tokio::test]
    async fn test_fanout_attempts_all_sinks() {
        let memory = Arc::new(MemoryAlertSink::new());
        let fanout = FanoutAlertSink::new()
            .with(Arc::new(RejectingSink))
            .with(memory.clone())
            .with(Arc::new(LogAlertSink));
        assert_eq!(fanout.len(), 3);

        let err = fanout
            .deliver(&event("Car-1", BreachKind::Exited, 0))
            .await
            .unwrap_err();
        assert_eq!(err, AlertError::Delivery("push service down".to_string()));
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_fanout_succeeds() {
        let fanout = FanoutAlertSink::new();
        assert!(fanout.is_empty());
        fanout
            .deliver(&event("Car-1", BreachKind::Exited, 0))
            .await
            .unwrap();
    }
}
