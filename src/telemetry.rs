// AssetWatch - Asset tracking core
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Engine telemetry storage
//!
//! Readings are grouped by asset. A registered asset starts with a single
//! placeholder reading whose fields are all null. The first real sample
//! overwrites that placeholder in place; every later sample is appended, so
//! the history needed for anomaly detection is preserved.
//!
//! [`MemoryTelemetryStore`] serializes all operations on one asset behind a
//! per-asset lock so the overwrite-or-append decision cannot race. Different
//! assets never contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;

/// Default aggregation window
pub const DEFAULT_WINDOW: usize = 5;

/// Identity of a tracked asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row identity of a reading; increases with insertion order
pub type ReadingId = u64;

/// One telemetry sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Row identity
    pub id: ReadingId,
    /// Owning asset
    pub asset_id: AssetId,
    /// Engine temperature in degrees Celsius
    pub engine_temperature: Option<f64>,
    /// Speed in km/h
    pub speed: Option<f64>,
    /// Sample time; `None` for the registration placeholder
    pub timestamp: Option<DateTime<Utc>>,
}

impl Reading {
    /// True for an untouched registration placeholder
    pub fn is_placeholder(&self) -> bool {
        self.timestamp.is_none()
    }

    /// True when both sensor values are present
    pub fn is_complete(&self) -> bool {
        self.engine_temperature.is_some() && self.speed.is_some()
    }
}

/// Registration data for an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub asset_id: AssetId,
    /// Declared monetary value at registration
    pub asset_value: Option<f64>,
}

/// Fleet valuation summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    /// Registered assets with their value
    pub assets: Vec<AssetRecord>,
    /// Sum of declared values
    pub total_value: f64,
    /// Number of known assets
    pub asset_count: usize,
}

/// Result type for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Keyed record store for readings
pub trait TelemetryStore: Send + Sync {
    /// Register an asset with its placeholder reading
    fn register_asset(&self, asset_id: &AssetId, asset_value: Option<f64>) -> Result<Reading>;

    /// Record a sample taken at `timestamp`.
    ///
    /// Overwrites the registration placeholder when it is the only reading,
    /// appends a new reading otherwise.
    fn append_reading_at(
        &self,
        asset_id: &AssetId,
        engine_temperature: Option<f64>,
        speed: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Result<Reading>;

    /// Newest-first readings for an asset, at most `limit`.
    ///
    /// Fails with `NotFound` when the asset has no readings.
    fn latest_readings(&self, asset_id: &AssetId, limit: usize) -> Result<Vec<Reading>>;

    /// Total stored readings for an asset
    fn reading_count(&self, asset_id: &AssetId) -> Result<usize>;

    /// All known assets, sorted
    fn assets(&self) -> Vec<AssetId>;

    /// Valuation of registered assets
    fn fleet_summary(&self) -> FleetSummary;

    /// Record a sample taken now
    fn append_reading(
        &self,
        asset_id: &AssetId,
        engine_temperature: Option<f64>,
        speed: Option<f64>,
    ) -> Result<Reading> {
        self.append_reading_at(asset_id, engine_temperature, speed, Utc::now())
    }

    /// Newest reading of every asset, ordered by asset id.
    ///
    /// Assets without readings are skipped. An asset holding only its
    /// registration placeholder reports the placeholder.
    fn latest_by_asset(&self) -> Result<Vec<Reading>> {
        let mut latest = Vec::new();
        for asset_id in self.assets() {
            match self.latest_readings(&asset_id, 1) {
                Ok(mut readings) => latest.extend(readings.pop()),
                Err(TelemetryError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(latest)
    }
}

/// Readings and registration data for one asset
#[derive(Debug, Default)]
struct AssetLedger {
    asset_value: Option<f64>,
    registered: bool,
    readings: Vec<Reading>,
}

impl AssetLedger {
    /// Index of the placeholder when it is the only reading
    fn sole_placeholder(&self) -> Option<usize> {
        match self.readings.as_slice() {
            [only] if only.is_placeholder() => Some(0),
            _ => None,
        }
    }

    fn newest_first(&self, limit: usize) -> Vec<Reading> {
        let mut readings = self.readings.clone();
        // Option orders None first, so descending puts placeholders last.
        // Equal timestamps fall back to row identity.
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        readings.truncate(limit);
        readings
    }
}

/// In-memory telemetry store with per-asset locking
#[derive(Debug, Default)]
pub struct MemoryTelemetryStore {
    ledgers: RwLock<HashMap<AssetId, Arc<Mutex<AssetLedger>>>>,
    next_id: AtomicU64,
}

impl MemoryTelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> ReadingId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn ledger(&self, asset_id: &AssetId) -> Result<Option<Arc<Mutex<AssetLedger>>>> {
        let ledgers = self
            .ledgers
            .read()
            .map_err(|_| TelemetryError::LockPoisoned)?;
        Ok(ledgers.get(asset_id).cloned())
    }

    fn ledger_or_insert(&self, asset_id: &AssetId) -> Result<Arc<Mutex<AssetLedger>>> {
        if let Some(ledger) = self.ledger(asset_id)? {
            return Ok(ledger);
        }
        let mut ledgers = self
            .ledgers
            .write()
            .map_err(|_| TelemetryError::LockPoisoned)?;
        Ok(Arc::clone(ledgers.entry(asset_id.clone()).or_default()))
    }
}

impl TelemetryStore for MemoryTelemetryStore {
    fn register_asset(&self, asset_id: &AssetId, asset_value: Option<f64>) -> Result<Reading> {
        let ledger = self.ledger_or_insert(asset_id)?;
        let mut ledger = ledger.lock().map_err(|_| TelemetryError::LockPoisoned)?;

        if ledger.registered || !ledger.readings.is_empty() {
            return Err(TelemetryError::AlreadyRegistered(asset_id.clone()));
        }

        let placeholder = Reading {
            id: self.allocate_id(),
            asset_id: asset_id.clone(),
            engine_temperature: None,
            speed: None,
            timestamp: None,
        };
        ledger.registered = true;
        ledger.asset_value = asset_value;
        ledger.readings.push(placeholder.clone());

        debug!("registered asset {} (value {:?})", asset_id, asset_value);
        Ok(placeholder)
    }

    fn append_reading_at(
        &self,
        asset_id: &AssetId,
        engine_temperature: Option<f64>,
        speed: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Result<Reading> {
        let ledger = self.ledger_or_insert(asset_id)?;
        let mut ledger = ledger.lock().map_err(|_| TelemetryError::LockPoisoned)?;

        if let Some(index) = ledger.sole_placeholder() {
            let reading = &mut ledger.readings[index];
            reading.engine_temperature = engine_temperature;
            reading.speed = speed;
            reading.timestamp = Some(timestamp);
            debug!("asset {}: placeholder reading {} populated", asset_id, reading.id);
            return Ok(reading.clone());
        }

        let reading = Reading {
            id: self.allocate_id(),
            asset_id: asset_id.clone(),
            engine_temperature,
            speed,
            timestamp: Some(timestamp),
        };
        ledger.readings.push(reading.clone());
        debug!(
            "asset {}: appended reading {} ({} total)",
            asset_id,
            reading.id,
            ledger.readings.len()
        );
        Ok(reading)
    }

    fn latest_readings(&self, asset_id: &AssetId, limit: usize) -> Result<Vec<Reading>> {
        let ledger = self
            .ledger(asset_id)?
            .ok_or_else(|| TelemetryError::NotFound(asset_id.clone()))?;
        let ledger = ledger.lock().map_err(|_| TelemetryError::LockPoisoned)?;

        if ledger.readings.is_empty() {
            return Err(TelemetryError::NotFound(asset_id.clone()));
        }
        Ok(ledger.newest_first(limit))
    }

    fn reading_count(&self, asset_id: &AssetId) -> Result<usize> {
        match self.ledger(asset_id)? {
            Some(ledger) => Ok(ledger
                .lock()
                .map_err(|_| TelemetryError::LockPoisoned)?
                .readings
                .len()),
            None => Ok(0),
        }
    }

    fn assets(&self) -> Vec<AssetId> {
        let mut ids: Vec<AssetId> = match self.ledgers.read() {
            Ok(ledgers) => ledgers.keys().cloned().collect(),
            Err(_) => return Vec::new(),
        };
        ids.sort();
        ids
    }

    fn fleet_summary(&self) -> FleetSummary {
        let ledgers: Vec<(AssetId, Arc<Mutex<AssetLedger>>)> = match self.ledgers.read() {
            Ok(ledgers) => ledgers
                .iter()
                .map(|(id, l)| (id.clone(), Arc::clone(l)))
                .collect(),
            Err(_) => return FleetSummary::default(),
        };

        let mut assets: Vec<AssetRecord> = ledgers
            .into_iter()
            .filter_map(|(asset_id, ledger)| {
                let ledger = ledger.lock().ok()?;
                Some(AssetRecord {
                    asset_id,
                    asset_value: ledger.asset_value,
                })
            })
            .collect();
        assets.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));

        let total_value = assets.iter().filter_map(|a| a.asset_value).sum();
        FleetSummary {
            asset_count: assets.len(),
            total_value,
            assets,
        }
    }
}
