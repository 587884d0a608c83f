// AssetWatch Monitor - Geofence sessions and anomaly orchestration
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Anomaly predictor
//!
//! Runs one short-lived scoring process per request:
//!
//! ```text
//! <program> [script] --temp <avg_temperature> --speed <avg_speed>
//! ```
//!
//! The process receives the artifact paths through the
//! `ASSETWATCH_MODEL_PATH` and `ASSETWATCH_ENCODER_PATH` environment
//! variables and must print a single JSON object on stdout:
//!
//! ```json
//! {"anomaly": "overheating", "recommendation": "Check the coolant level."}
//! ```
//!
//! Every outcome maps to an [`AnomalyResult`]; [`AnomalyPredictor::predict`]
//! never returns an error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use assetwatch::{validate_features, AnomalyResult, FeatureLimits};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::PredictorConfig;
use crate::error::ArtifactError;

/// Environment variable carrying the model path to the scoring process
pub const MODEL_PATH_ENV: &str = "ASSETWATCH_MODEL_PATH";

/// Environment variable carrying the label encoder path
pub const ENCODER_PATH_ENV: &str = "ASSETWATCH_ENCODER_PATH";

/// Maximum stderr bytes kept in a failure detail
const STDERR_TAIL: usize = 512;

/// Resolved classifier files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierArtifacts {
    pub program: PathBuf,
    pub script: Option<PathBuf>,
    pub model_path: PathBuf,
    pub encoder_path: PathBuf,
}

impl ClassifierArtifacts {
    /// Check that every configured file exists.
    ///
    /// A bare program name (no directory part) is looked up on `PATH` at
    /// spawn time and is not checked here.
    pub fn resolve(config: &PredictorConfig) -> Result<Self, ArtifactError> {
        let model_path = config.model_path();
        if !model_path.is_file() {
            return Err(ArtifactError::MissingModel(model_path));
        }

        let encoder_path = config.encoder_path();
        if !encoder_path.is_file() {
            return Err(ArtifactError::MissingEncoder(encoder_path));
        }

        if is_explicit_path(&config.program) && !config.program.is_file() {
            return Err(ArtifactError::MissingProgram(config.program.clone()));
        }

        if let Some(script) = &config.script {
            if !script.is_file() {
                return Err(ArtifactError::MissingProgram(script.clone()));
            }
        }

        Ok(Self {
            program: config.program.clone(),
            script: config.script.clone(),
            model_path,
            encoder_path,
        })
    }
}

fn is_explicit_path(program: &Path) -> bool {
    program.components().count() > 1 || program.is_absolute()
}

/// Expected stdout of the scoring process
#[derive(Debug, Deserialize)]
struct ClassifierOutput {
    anomaly: String,
    recommendation: String,
}

/// Parse the whole of stdout as one classifier verdict
fn parse_output(stdout: &[u8]) -> Result<ClassifierOutput, String> {
    let text = std::str::from_utf8(stdout).map_err(|e| format!("stdout is not UTF-8: {e}"))?;
    let text = text.trim();
    if text.is_empty() {
        return Err("classifier produced no output".to_string());
    }
    serde_json::from_str(text).map_err(|e| format!("unparsable classifier output: {e}"))
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| text.len() - i <= STDERR_TAIL)
        .unwrap_or(text.len());
    text[start..].to_string()
}

/// Supervises the external classifier
#[derive(Debug, Clone)]
pub struct AnomalyPredictor {
    artifacts: ClassifierArtifacts,
    timeout: Duration,
    limits: Option<FeatureLimits>,
}

impl AnomalyPredictor {
    /// Resolve artifacts and build a ready predictor
    pub fn from_config(config: &PredictorConfig) -> Result<Self, ArtifactError> {
        let artifacts = ClassifierArtifacts::resolve(config).map_err(|e| {
            error!(error = %e, "classifier artifacts unavailable, anomaly prediction disabled");
            e
        })?;
        info!(
            program = %artifacts.program.display(),
            model = %artifacts.model_path.display(),
            "anomaly predictor ready"
        );
        Ok(Self {
            artifacts,
            timeout: config.timeout(),
            limits: config.limits,
        })
    }

    /// Build a predictor from already resolved artifacts
    pub fn new(artifacts: ClassifierArtifacts, timeout: Duration) -> Self {
        Self {
            artifacts,
            timeout,
            limits: None,
        }
    }

    /// Reject features outside `limits` before spawning
    pub fn with_limits(mut self, limits: FeatureLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn artifacts(&self) -> &ClassifierArtifacts {
        &self.artifacts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, avg_temperature: f64, avg_speed: f64) -> Command {
        let mut cmd = Command::new(&self.artifacts.program);
        if let Some(script) = &self.artifacts.script {
            cmd.arg(script);
        }
        cmd.arg("--temp")
            .arg(avg_temperature.to_string())
            .arg("--speed")
            .arg(avg_speed.to_string())
            .env(MODEL_PATH_ENV, &self.artifacts.model_path)
            .env(ENCODER_PATH_ENV, &self.artifacts.encoder_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Classify one pair of aggregated features
    pub async fn predict(&self, avg_temperature: f64, avg_speed: f64) -> AnomalyResult {
        if let Err(reason) = validate_features(avg_temperature, avg_speed, self.limits.as_ref()) {
            debug!(%reason, "features rejected");
            return AnomalyResult::invalid_data(reason);
        }

        let child = match self.command(avg_temperature, avg_speed).spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(
                    program = %self.artifacts.program.display(),
                    error = %e,
                    "failed to start classifier"
                );
                return AnomalyResult::system_error(format!("failed to start classifier: {e}"));
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!(error = %e, "failed to collect classifier output");
                return AnomalyResult::system_error(format!("failed to collect output: {e}"));
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "classifier timed out and was killed");
                return AnomalyResult::analysis_failed(format!(
                    "classifier timed out after {:?}",
                    self.timeout
                ));
            }
        };

        if !output.status.success() {
            let stderr = stderr_tail(&output.stderr);
            warn!(status = %output.status, %stderr, "classifier failed");
            return AnomalyResult::analysis_failed(format!(
                "classifier exited with {}: {}",
                output.status, stderr
            ));
        }

        match parse_output(&output.stdout) {
            Ok(verdict) => {
                debug!(anomaly = %verdict.anomaly, "classifier verdict");
                AnomalyResult::classified(verdict.anomaly, verdict.recommendation)
            }
            Err(reason) => {
                warn!(%reason, "classifier output rejected");
                AnomalyResult::analysis_error(reason)
            }
        }
    }
}
