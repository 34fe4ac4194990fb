//! Store Metrics
//!
//! Prometheus counters and latency histograms for chunk operations.
//! Each store owns its own registry, so tests and multiple stores in one
//! process never collide on metric names.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::{Error, Result};

/// Chunk store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Write,
    Read,
    Delete,
    DeleteAll,
    Exists,
    Stats,
}

impl Operation {
    /// Label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Write => "write",
            Operation::Read => "read",
            Operation::Delete => "delete",
            Operation::DeleteAll => "delete_all",
            Operation::Exists => "exists",
            Operation::Stats => "stats",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Completed successfully
    Ok,
    /// Key absent
    NotFound,
    /// Rejected caller input
    Invalid,
    /// Backend fault
    Error,
}

impl Outcome {
    /// Classify a result
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Outcome::Ok,
            Err(e) if e.is_not_found() => Outcome::NotFound,
            Err(e) if e.is_client_error() => Outcome::Invalid,
            Err(_) => Outcome::Error,
        }
    }

    /// Label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::NotFound => "not_found",
            Outcome::Invalid => "invalid",
            Outcome::Error => "error",
        }
    }
}

/// Prometheus metrics for one chunk store
pub struct StoreMetrics {
    registry: Registry,
    operations: IntCounterVec,
    durations: HistogramVec,
    bytes_written: IntCounter,
    bytes_read: IntCounter,
    bulk_deleted: IntCounter,
}

impl StoreMetrics {
    /// Create and register all metrics in a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let operations = IntCounterVec::new(
            Opts::new(
                "chunkserver_operations_total",
                "Chunk store operations by outcome",
            ),
            &["operation", "outcome"],
        )?;
        let durations = HistogramVec::new(
            HistogramOpts::new(
                "chunkserver_operation_duration_seconds",
                "Chunk store operation latency",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0,
            ]),
            &["operation"],
        )?;
        let bytes_written = IntCounter::new(
            "chunkserver_bytes_written_total",
            "Payload bytes accepted by write",
        )?;
        let bytes_read = IntCounter::new(
            "chunkserver_bytes_read_total",
            "Payload bytes returned by read",
        )?;
        let bulk_deleted = IntCounter::new(
            "chunkserver_bulk_deleted_total",
            "Chunks removed by delete-all",
        )?;

        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(durations.clone()))?;
        registry.register(Box::new(bytes_written.clone()))?;
        registry.register(Box::new(bytes_read.clone()))?;
        registry.register(Box::new(bulk_deleted.clone()))?;

        Ok(Self {
            registry,
            operations,
            durations,
            bytes_written,
            bytes_read,
            bulk_deleted,
        })
    }

    /// Record one finished operation
    pub fn observe(&self, operation: Operation, outcome: Outcome, elapsed: Duration) {
        self.operations
            .with_label_values(&[operation.as_str(), outcome.as_str()])
            .inc();
        self.durations
            .with_label_values(&[operation.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    /// Count payload bytes written
    pub fn add_bytes_written(&self, n: u64) {
        self.bytes_written.inc_by(n);
    }

    /// Count payload bytes read
    pub fn add_bytes_read(&self, n: u64) {
        self.bytes_read.inc_by(n);
    }

    /// Count chunks removed by a bulk delete
    pub fn add_bulk_deleted(&self, n: u64) {
        self.bulk_deleted.inc_by(n);
    }

    /// Current count for an operation/outcome pair
    pub fn operation_count(&self, operation: Operation, outcome: Outcome) -> u64 {
        self.operations
            .with_label_values(&[operation.as_str(), outcome.as_str()])
            .get()
    }

    /// Total payload bytes written
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.get()
    }

    /// Total payload bytes read
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.get()
    }

    /// Render the text exposition format, returning `(content_type, body)`
    pub fn encode(&self) -> Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(Error::Metrics)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_counts() {
        let metrics = StoreMetrics::new().unwrap();

        metrics.observe(Operation::Write, Outcome::Ok, Duration::from_micros(50));
        metrics.observe(Operation::Write, Outcome::Ok, Duration::from_micros(70));
        metrics.observe(Operation::Read, Outcome::NotFound, Duration::from_micros(5));

        assert_eq!(metrics.operation_count(Operation::Write, Outcome::Ok), 2);
        assert_eq!(metrics.operation_count(Operation::Read, Outcome::NotFound), 1);
        assert_eq!(metrics.operation_count(Operation::Read, Outcome::Ok), 0);
    }

    #[test]
    fn test_outcome_classification() {
        let ok: Result<()> = Ok(());
        assert_eq!(Outcome::of(&ok), Outcome::Ok);

        let missing: Result<()> = Err(Error::ChunkNotFound {
            key: "a/0".to_string(),
        });
        assert_eq!(Outcome::of(&missing), Outcome::NotFound);

        let invalid: Result<()> = Err(Error::Validation("bad".to_string()));
        assert_eq!(Outcome::of(&invalid), Outcome::Invalid);

        let fault: Result<()> = Err(Error::Internal("boom".to_string()));
        assert_eq!(Outcome::of(&fault), Outcome::Error);
    }

    #[test]
    fn test_encode_exposition() {
        let metrics = StoreMetrics::new().unwrap();
        metrics.observe(Operation::DeleteAll, Outcome::Ok, Duration::from_millis(1));
        metrics.add_bytes_written(128);

        let (content_type, body) = metrics.encode().unwrap();
        let text = String::from_utf8(body).unwrap();

        assert!(content_type.starts_with("text/plain"));
        assert!(text.contains("chunkserver_operations_total"));
        assert!(text.contains("operation=\"delete_all\""));
        assert!(text.contains("chunkserver_bytes_written_total 128"));
    }

    #[test]
    fn test_independent_registries() {
        let a = StoreMetrics::new().unwrap();
        let b = StoreMetrics::new().unwrap();
        a.add_bytes_read(10);
        assert_eq!(a.bytes_read(), 10);
        assert_eq!(b.bytes_read(), 0);
    }
}
