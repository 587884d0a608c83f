// AssetWatch - Asset tracking core
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Anomaly result types and input validation.
//!
//! Every prediction outcome, including failures, is an [`AnomalyResult`].
//! Anomaly output is advisory: callers render it, they never branch on it
//! for control flow.

use serde::{Deserialize, Serialize};

/// Closed set of prediction outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// The classifier produced a label
    Classified,
    /// No reading carried both temperature and speed
    InsufficientData,
    /// Features were missing, non-finite or out of range
    InvalidData,
    /// Scoring process exited non-zero or timed out
    AnalysisFailed,
    /// Scoring process output could not be parsed
    AnalysisError,
    /// Unexpected orchestration fault
    SystemError,
}

impl AnomalyKind {
    /// All kinds, in declaration order
    pub const ALL: [AnomalyKind; 6] = [
        AnomalyKind::Classified,
        AnomalyKind::InsufficientData,
        AnomalyKind::InvalidData,
        AnomalyKind::AnalysisFailed,
        AnomalyKind::AnalysisError,
        AnomalyKind::SystemError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::Classified => "CLASSIFIED",
            AnomalyKind::InsufficientData => "INSUFFICIENT_DATA",
            AnomalyKind::InvalidData => "INVALID_DATA",
            AnomalyKind::AnalysisFailed => "ANALYSIS_FAILED",
            AnomalyKind::AnalysisError => "ANALYSIS_ERROR",
            AnomalyKind::SystemError => "SYSTEM_ERROR",
        }
    }

    /// Advisory text shown in place of a recommendation
    pub fn user_message(&self) -> &'static str {
        match self {
            AnomalyKind::Classified => "Analysis complete.",
            AnomalyKind::InsufficientData => {
                "Not enough complete readings yet to analyse engine health."
            }
            AnomalyKind::InvalidData => {
                "Latest readings are not valid numbers; analysis was skipped."
            }
            AnomalyKind::AnalysisFailed => "Engine analysis failed. Please try again.",
            AnomalyKind::AnalysisError => {
                "Engine analysis returned an unreadable result. Please try again."
            }
            AnomalyKind::SystemError => "Engine analysis is temporarily unavailable.",
        }
    }

    /// True for failure outcomes
    pub fn is_failure(&self) -> bool {
        !matches!(self, AnomalyKind::Classified)
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one anomaly prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub kind: AnomalyKind,
    /// Classifier label, passed through untouched. Only set when classified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<String>,
    /// Classifier recommendation, or the advisory message for failures
    pub recommendation: String,
    /// Diagnostic detail for failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AnomalyResult {
    /// Successful classification
    pub fn classified(anomaly: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self {
            kind: AnomalyKind::Classified,
            anomaly: Some(anomaly.into()),
            recommendation: recommendation.into(),
            detail: None,
        }
    }

    /// Failure outcome with the kind's advisory message
    pub fn failure(kind: AnomalyKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            anomaly: None,
            recommendation: kind.user_message().to_string(),
            detail: Some(detail.into()),
        }
    }

    pub fn insufficient_data() -> Self {
        Self::failure(
            AnomalyKind::InsufficientData,
            "no reading with both temperature and speed",
        )
    }

    pub fn invalid_data(detail: impl Into<String>) -> Self {
        Self::failure(AnomalyKind::InvalidData, detail)
    }

    pub fn analysis_failed(detail: impl Into<String>) -> Self {
        Self::failure(AnomalyKind::AnalysisFailed, detail)
    }

    pub fn analysis_error(detail: impl Into<String>) -> Self {
        Self::failure(AnomalyKind::AnalysisError, detail)
    }

    pub fn system_error(detail: impl Into<String>) -> Self {
        Self::failure(AnomalyKind::SystemError, detail)
    }
}

/// Accepted operating envelope for classifier inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureLimits {
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub min_speed: f64,
    pub max_speed: f64,
}

impl Default for FeatureLimits {
    /// Running-engine envelope: 50-120 C, 0-160 km/h
    fn default() -> Self {
        Self {
            min_temperature: 50.0,
            max_temperature: 120.0,
            min_speed: 0.0,
            max_speed: 160.0,
        }
    }
}

/// Check classifier inputs.
///
/// Both values must be finite; when `limits` is given they must also lie
/// inside the envelope. The error lists every violation.
pub fn validate_features(
    temperature: f64,
    speed: f64,
    limits: Option<&FeatureLimits>,
) -> Result<(), String> {
    if !temperature.is_finite() || !speed.is_finite() {
        return Err(format!(
            "temperature and speed must be finite numbers (got {temperature}, {speed})"
        ));
    }

    let Some(limits) = limits else {
        return Ok(());
    };

    let mut errors = Vec::new();
    if temperature < limits.min_temperature {
        errors.push(format!(
            "engine temperature {temperature} is below {}",
            limits.min_temperature
        ));
    }
    if temperature > limits.max_temperature {
        errors.push(format!(
            "engine temperature {temperature} exceeds {}",
            limits.max_temperature
        ));
    }
    if speed < limits.min_speed {
        errors.push(format!("speed {speed} is below {}", limits.min_speed));
    }
    if speed > limits.max_speed {
        errors.push(format!("speed {speed} exceeds {}", limits.max_speed));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}
