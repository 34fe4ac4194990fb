//! Observability
//!
//! Prometheus metrics for chunk operations and liveness/readiness/storage
//! health probes.

mod health;
mod metrics;

pub use health::{HealthCheck, HealthCheckResult, HealthResponse, HealthStatus, SERVICE_NAME};
pub use metrics::{Operation, Outcome, StoreMetrics};
