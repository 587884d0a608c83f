// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Position sources
//!
//! Sessions poll a [`PositionSource`] for the best-known location of an
//! asset. Sources never push.

use std::collections::{HashMap, VecDeque};

use assetwatch::{AssetId, GeoPoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::SourceError;

/// Supplies the current location of an asset
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self, asset_id: &AssetId) -> Result<GeoPoint, SourceError>;
}

/// A GPS fix reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub position: GeoPoint,
    pub reported_at: DateTime<Utc>,
}

/// Fixes kept per asset by [`LatestFixSource::new`]
pub const DEFAULT_FIX_HISTORY: usize = 100;

/// Keeps the recent fixes each device reported
///
/// The newest fix answers [`PositionSource::current_position`]; older ones
/// are kept up to the history capacity for location trails.
#[derive(Debug)]
pub struct LatestFixSource {
    history: usize,
    fixes: RwLock<HashMap<AssetId, VecDeque<PositionFix>>>,
}

impl Default for LatestFixSource {
    fn default() -> Self {
        Self::with_history(DEFAULT_FIX_HISTORY)
    }
}

impl LatestFixSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `history` fixes per asset (minimum 1)
    pub fn with_history(history: usize) -> Self {
        Self {
            history: history.max(1),
            fixes: RwLock::new(HashMap::new()),
        }
    }

    pub fn history_capacity(&self) -> usize {
        self.history
    }

    /// Record a fix taken now
    pub async fn report(
        &self,
        asset_id: &AssetId,
        position: GeoPoint,
    ) -> Result<PositionFix, SourceError> {
        self.report_at(asset_id, position, Utc::now()).await
    }

    /// Record a fix taken at `reported_at`
    pub async fn report_at(
        &self,
        asset_id: &AssetId,
        position: GeoPoint,
        reported_at: DateTime<Utc>,
    ) -> Result<PositionFix, SourceError> {
        if !position.is_valid() {
            return Err(SourceError::InvalidFix(position));
        }
        let fix = PositionFix {
            position,
            reported_at,
        };
        let mut fixes = self.fixes.write().await;
        let trail = fixes.entry(asset_id.clone()).or_default();
        if trail.len() == self.history {
            trail.pop_front();
        }
        trail.push_back(fix);
        trace!(asset = %asset_id, %position, "position fix reported");
        Ok(fix)
    }

    /// Last fix for the asset, if any
    pub async fn latest(&self, asset_id: &AssetId) -> Option<PositionFix> {
        self.fixes
            .read()
            .await
            .get(asset_id)
            .and_then(|trail| trail.back().copied())
    }

    /// Retained fixes for the asset, newest first, at most `limit`
    pub async fn trail(&self, asset_id: &AssetId, limit: usize) -> Vec<PositionFix> {
        self.fixes
            .read()
            .await
            .get(asset_id)
            .map(|trail| trail.iter().rev().take(limit).copied().collect())
            .unwrap_or_default()
    }

    /// Number of assets with a fix
    pub async fn len(&self) -> usize {
        self.fixes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.fixes.read().await.is_empty()
    }
}

#[async_trait]
impl PositionSource for LatestFixSource {
    async fn current_position(&self, asset_id: &AssetId) -> Result<GeoPoint, SourceError> {
        self.latest(asset_id)
            .await
            .map(|fix| fix.position)
            .ok_or_else(|| SourceError::NoFix(asset_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_asset_has_no_fix() {
        let source = LatestFixSource::new();
        let err = source
            .current_position(&AssetId::from("Car-1"))
            .await
            .unwrap_err();
        assert_eq!(err, SourceError::NoFix(AssetId::from("Car-1")));
    }

    #[tokio::test]
    async fn test_latest_fix_wins() {
        let source = LatestFixSource::new();
        let car = AssetId::from("Car-1");
        source.report(&car, GeoPoint::new(9.03, 38.74)).await.unwrap();
        source.report(&car, GeoPoint::new(9.10, 38.90)).await.unwrap();

        assert_eq!(
            source.current_position(&car).await.unwrap(),
            GeoPoint::new(9.10, 38.90)
        );
        assert_eq!(source.len().await, 1);
    }

    #[tokio::test]
    async fn test_trail_newest_first_and_bounded() {
        let source = LatestFixSource::with_history(3);
        let car = AssetId::from("Car-1");
        let base = Utc::now();
        let latitudes = [9.00, 9.01, 9.02, 9.03, 9.04];
        for (i, lat) in latitudes.iter().enumerate() {
            source
                .report_at(
                    &car,
                    GeoPoint::new(*lat, 38.74),
                    base + chrono::Duration::seconds(i as i64),
                )
                .await
                .unwrap();
        }

        let trail = source.trail(&car, 10).await;
        assert_eq!(trail.len(), 3);
        assert_eq!(trail[0].position, GeoPoint::new(9.04, 38.74));
        assert_eq!(trail[2].position, GeoPoint::new(9.02, 38.74));
        assert_eq!(source.trail(&car, 1).await.len(), 1);
        assert_eq!(
            source.current_position(&car).await.unwrap(),
            GeoPoint::new(9.04, 38.74)
        );
        assert!(source.trail(&AssetId::from("Car-2"), 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_fix_rejected() {
        let source = LatestFixSource::new();
        let car = AssetId::from("Car-1");
        let err = source
            .report(&car, GeoPoint::new(120.0, 38.74))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidFix(_)));
        assert!(source.is_empty().await);
    }
}
