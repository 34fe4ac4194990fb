//! Health Checks
//!
//! Liveness, readiness and storage probes for the chunk node.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::BackendInfo;

/// Service name reported by health endpoints
pub const SERVICE_NAME: &str = "chunkserver";

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Service is healthy
    Healthy,
    /// Serving reads but unable to accept writes
    Degraded,
    /// Service is unhealthy
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// Check if status is healthy
    pub fn is_healthy(&self) -> bool {
        *self == HealthStatus::Healthy
    }

    fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Degraded => write!(f, "Degraded"),
            HealthStatus::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Check name
    pub name: String,
    /// Status
    pub status: HealthStatus,
    /// Message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheckResult {
    /// Create a healthy result
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            message: None,
        }
    }

    /// Create a degraded result
    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
        }
    }

    /// Create an unhealthy result
    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
        }
    }

    /// Storage probe derived from the backend description
    pub fn storage(provisioned: bool, info: &BackendInfo) -> Self {
        if !provisioned {
            Self::unhealthy("storage", "storage root is missing")
        } else if !info.writable {
            Self::degraded("storage", "storage root is not writable")
        } else {
            Self::healthy("storage")
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall status (worst of all checks)
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Node identifier
    pub node_id: String,
    /// Individual check results
    pub checks: Vec<HealthCheckResult>,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// When the checks ran
    pub checked_at: DateTime<Utc>,
}

impl HealthResponse {
    /// Create a new health response
    pub fn new(
        node_id: impl Into<String>,
        checks: Vec<HealthCheckResult>,
        uptime: Duration,
    ) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .max_by_key(HealthStatus::severity)
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            service: SERVICE_NAME.to_string(),
            node_id: node_id.into(),
            checks,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime.as_secs(),
            checked_at: Utc::now(),
        }
    }
}

/// Health check manager
pub struct HealthCheck {
    /// Start time
    start_time: Instant,
    /// Liveness flag
    live: AtomicBool,
    /// Readiness flag (store open and listener bound)
    ready: AtomicBool,
}

impl HealthCheck {
    /// Create a new health check manager
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            live: AtomicBool::new(true),
            ready: AtomicBool::new(false),
        }
    }

    /// Get uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check liveness
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    /// Check readiness
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// Set liveness
    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::Relaxed);
    }

    /// Set readiness
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    /// Get liveness response
    pub fn liveness_check(&self) -> HealthCheckResult {
        if self.is_live() {
            HealthCheckResult::healthy("liveness")
        } else {
            HealthCheckResult::unhealthy("liveness", "Service is shutting down")
        }
    }

    /// Get readiness response
    pub fn readiness_check(&self) -> HealthCheckResult {
        if self.is_ready() {
            HealthCheckResult::healthy("readiness")
        } else {
            HealthCheckResult::unhealthy("readiness", "Service not ready")
        }
    }

    /// Run all health checks, including the supplied storage probe
    pub fn check_all(&self, node_id: &str, storage: HealthCheckResult) -> HealthResponse {
        let checks = vec![self.liveness_check(), self.readiness_check(), storage];
        HealthResponse::new(node_id, checks, self.uptime())
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BackendKind;

    fn info(writable: bool) -> BackendInfo {
        BackendInfo {
            kind: BackendKind::Disk,
            path: None,
            capacity: None,
            writable,
        }
    }

    #[test]
    fn test_health_status() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(HealthStatus::Healthy.is_operational());
        assert!(!HealthStatus::Degraded.is_healthy());
        assert!(HealthStatus::Degraded.is_operational());
        assert!(!HealthStatus::Unhealthy.is_operational());
    }

    #[test]
    fn test_storage_probe() {
        assert_eq!(
            HealthCheckResult::storage(true, &info(true)).status,
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthCheckResult::storage(true, &info(false)).status,
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthCheckResult::storage(false, &info(true)).status,
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_health_check_manager() {
        let health = HealthCheck::new();

        assert!(health.is_live());
        assert!(!health.is_ready());
        assert_eq!(health.readiness_check().status, HealthStatus::Unhealthy);

        health.set_ready(true);
        assert_eq!(health.readiness_check().status, HealthStatus::Healthy);

        health.set_live(false);
        assert_eq!(health.liveness_check().status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_check_all_takes_worst_status() {
        let health = HealthCheck::new();
        health.set_ready(true);

        let response = health.check_all("node-1", HealthCheckResult::storage(true, &info(false)));
        assert_eq!(response.status, HealthStatus::Degraded);
        assert_eq!(response.checks.len(), 3);
        assert_eq!(response.node_id, "node-1");
        assert_eq!(response.service, SERVICE_NAME);
    }

    #[test]
    fn test_serialization() {
        let health = HealthCheck::new();
        let response = health.check_all("node-1", HealthCheckResult::healthy("storage"));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["nodeId"], "node-1");
        assert_eq!(json["status"], "Unhealthy");
        assert!(json["uptimeSeconds"].is_u64());
    }
}
