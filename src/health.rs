//! Component health for AssetWatch
//!
//! Tracks which parts of the system are usable. Geofencing is the critical
//! path; losing anomaly prediction only degrades the system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Component is healthy
    Healthy,
    /// Component is degraded but functional
    Degraded,
    /// Component is unusable
    Unhealthy,
    /// Component status is unknown
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Check if the status is operational (healthy or degraded)
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Monitored parts of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Position polling and boundary alerts
    Geofencing,
    /// Reading storage
    Telemetry,
    /// Classifier process and artifacts
    AnomalyPrediction,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Geofencing => "geofencing",
            Component::Telemetry => "telemetry",
            Component::AnomalyPrediction => "anomaly_prediction",
        }
    }

    /// A critical component failing makes the whole system unhealthy
    pub fn is_critical(&self) -> bool {
        !matches!(self, Component::AnomalyPrediction)
    }
}

/// Health check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub component: Component,
    pub status: HealthStatus,
    /// Details message
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheck {
    /// Create a healthy check result
    pub fn healthy(component: Component) -> Self {
        Self {
            component,
            status: HealthStatus::Healthy,
            message: "OK".to_string(),
            checked_at: Utc::now(),
        }
    }

    /// Create an unhealthy check result
    pub fn unhealthy(component: Component, message: impl Into<String>) -> Self {
        Self {
            component,
            status: HealthStatus::Unhealthy,
            message: message.into(),
            checked_at: Utc::now(),
        }
    }

    /// Create a degraded check result
    pub fn degraded(component: Component, message: impl Into<String>) -> Self {
        Self {
            component,
            status: HealthStatus::Degraded,
            message: message.into(),
            checked_at: Utc::now(),
        }
    }
}

/// Aggregated health of all components
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthMonitor {
    checks: Vec<HealthCheck>,
    status: HealthStatus,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a check, replacing the previous one for the same component
    pub fn add_check(&mut self, check: HealthCheck) {
        self.checks.retain(|c| c.component != check.component);
        self.checks.push(check);
        self.update_status();
    }

    fn update_status(&mut self) {
        if self.checks.is_empty() {
            self.status = HealthStatus::Unknown;
            return;
        }

        let critical_down = self
            .checks
            .iter()
            .any(|c| c.component.is_critical() && c.status == HealthStatus::Unhealthy);
        let impaired = self
            .checks
            .iter()
            .any(|c| c.status != HealthStatus::Healthy);

        self.status = if critical_down {
            HealthStatus::Unhealthy
        } else if impaired {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
    }

    /// Overall system status
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn checks(&self) -> &[HealthCheck] {
        &self.checks
    }

    /// Latest check for a component
    pub fn get_check(&self, component: Component) -> Option<&HealthCheck> {
        self.checks.iter().find(|c| c.component == component)
    }

    /// True when the component's last check was operational
    pub fn is_available(&self, component: Component) -> bool {
        self.get_check(component)
            .map(|c| c.status.is_ok())
            .unwrap_or(false)
    }

    /// Check if system is operational
    pub fn is_operational(&self) -> bool {
        self.status.is_ok()
    }

    /// Generate health report
    pub fn report(&self) -> String {
        let mut report = format!("System Status: {:?}\n\n", self.status);
        for check in &self.checks {
            report.push_str(&format!(
                "[{:?}] {} - {}\n",
                check.status,
                check.component.as_str(),
                check.message
            ));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_is_ok() {
        assert!(HealthStatus::Healthy.is_ok());
        assert!(HealthStatus::Degraded.is_ok());
        assert!(!HealthStatus::Unhealthy.is_ok());
        assert!(!HealthStatus::Unknown.is_ok());
    }

    #[test]
    fn test_empty_monitor_unknown() {
        let monitor = HealthMonitor::new();
        assert_eq!(monitor.status(), HealthStatus::Unknown);
        assert!(!monitor.is_available(Component::Geofencing));
    }

    #[test]
    fn test_predictor_failure_only_degrades() {
        let mut monitor = HealthMonitor::new();
        monitor.add_check(HealthCheck::healthy(Component::Geofencing));
        monitor.add_check(HealthCheck::healthy(Component::Telemetry));
        monitor.add_check(HealthCheck::unhealthy(
            Component::AnomalyPrediction,
            "classifier artifacts missing",
        ));

        assert_eq!(monitor.status(), HealthStatus::Degraded);
        assert!(monitor.is_operational());
        assert!(monitor.is_available(Component::Geofencing));
        assert!(!monitor.is_available(Component::AnomalyPrediction));
    }

    #[test]
    fn test_critical_failure_is_unhealthy() {
        let mut monitor = HealthMonitor::new();
        monitor.add_check(HealthCheck::unhealthy(Component::Telemetry, "lock poisoned"));
        assert_eq!(monitor.status(), HealthStatus::Unhealthy);
        assert!(!monitor.is_operational());
    }

    #[test]
    fn test_add_check_replaces() {
        let mut monitor = HealthMonitor::new();
        monitor.add_check(HealthCheck::degraded(Component::Geofencing, "slow source"));
        monitor.add_check(HealthCheck::healthy(Component::Geofencing));
        assert_eq!(monitor.checks().len(), 1);
        assert_eq!(monitor.status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_report() {
        let mut monitor = HealthMonitor::new();
        monitor.add_check(HealthCheck::healthy(Component::Geofencing));
        monitor.add_check(HealthCheck::unhealthy(
            Component::AnomalyPrediction,
            "model file missing",
        ));
        let report = monitor.report();
        assert!(report.contains("System Status: Degraded"));
        assert!(report.contains("anomaly_prediction - model file missing"));
    }
}
