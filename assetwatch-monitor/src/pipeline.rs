// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Anomaly pipeline: latest readings, mean features, classifier verdict.

use std::sync::Arc;

use assetwatch::{
    AggregateError, AggregatedFeatures, AnomalyResult, AssetId, AssetwatchError,
    ReadingAggregator, TelemetryStore,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::Result;
use crate::predictor::AnomalyPredictor;

/// Outcome of one anomaly assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub asset_id: AssetId,
    /// Features sent to the classifier; absent when it was never invoked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<AggregatedFeatures>,
    pub result: AnomalyResult,
    pub assessed_at: DateTime<Utc>,
}

impl AnomalyReport {
    fn new(asset_id: &AssetId, features: Option<AggregatedFeatures>, result: AnomalyResult) -> Self {
        Self {
            asset_id: asset_id.clone(),
            features,
            result,
            assessed_at: Utc::now(),
        }
    }
}

/// Store → aggregator → predictor
#[derive(Clone)]
pub struct AnomalyPipeline {
    store: Arc<dyn TelemetryStore>,
    aggregator: ReadingAggregator,
    predictor: Arc<AnomalyPredictor>,
}

impl AnomalyPipeline {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        aggregator: ReadingAggregator,
        predictor: Arc<AnomalyPredictor>,
    ) -> Self {
        Self {
            store,
            aggregator,
            predictor,
        }
    }

    pub fn predictor(&self) -> &AnomalyPredictor {
        &self.predictor
    }

    /// Assess the latest readings of an asset.
    ///
    /// Fails only when the asset has no readings at all. Every other
    /// outcome, including store faults, is a report.
    pub async fn assess(&self, asset_id: &AssetId) -> Result<AnomalyReport> {
        let features = match self
            .aggregator
            .latest_features(self.store.as_ref(), asset_id)
        {
            Ok(features) => features,
            Err(AssetwatchError::Telemetry(e)) if e.is_not_found() => return Err(e.into()),
            Err(AssetwatchError::Aggregate(AggregateError::InsufficientData)) => {
                debug!(asset = %asset_id, "insufficient data");
                return Ok(AnomalyReport::new(
                    asset_id,
                    None,
                    AnomalyResult::insufficient_data(),
                ));
            }
            Err(e) => {
                error!(asset = %asset_id, error = %e, "telemetry lookup failed");
                return Ok(AnomalyReport::new(
                    asset_id,
                    None,
                    AnomalyResult::system_error(e.to_string()),
                ));
            }
        };

        let result = self
            .predictor
            .predict(features.avg_temperature, features.avg_speed)
            .await;
        debug!(
            asset = %asset_id,
            kind = result.kind.as_str(),
            samples = features.sample_count,
            "anomaly assessed"
        );
        Ok(AnomalyReport::new(asset_id, Some(features), result))
    }
}
