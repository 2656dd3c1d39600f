//! # Metrics
//!
//! Prometheus metrics for monitoring the sync runner.
//!
//! ## Metrics Exposed
//!
//! - `idpscim_sync_runs_total` - Total number of sync cycles started
//! - `idpscim_sync_errors_total` - Total number of sync cycles that failed
//! - `idpscim_sync_skipped_total` - Cycles skipped because nothing changed upstream
//! - `idpscim_sync_duration_seconds` - Duration of sync cycles
//! - `idpscim_last_success_timestamp_seconds` - Unix time of the last successful cycle
//! - `idpscim_partition_size` - Size of each partition in the last cycle, by resource
//! - `idpscim_scim_operations_total` - SCIM calls by resource and operation
//! - `idpscim_scim_operation_errors_total` - Failed SCIM calls by resource and operation
//! - `idpscim_scim_retries_total` - SCIM calls retried after throttling or server errors

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Registry};
use std::sync::LazyLock;

use crate::reconciler::PartitionSummary;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static SYNC_RUNS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("idpscim_sync_runs_total", "Total number of sync cycles")
        .expect("Failed to create SYNC_RUNS_TOTAL metric - this should never happen")
});

static SYNC_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "idpscim_sync_errors_total",
        "Total number of failed sync cycles",
    )
    .expect("Failed to create SYNC_ERRORS_TOTAL metric - this should never happen")
});

static SYNC_SKIPPED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "idpscim_sync_skipped_total",
        "Total number of sync cycles skipped because the snapshot hash was unchanged",
    )
    .expect("Failed to create SYNC_SKIPPED_TOTAL metric - this should never happen")
});

static SYNC_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "idpscim_sync_duration_seconds",
            "Duration of sync cycles in seconds",
        )
        .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .expect("Failed to create SYNC_DURATION metric - this should never happen")
});

static LAST_SUCCESS_TIMESTAMP: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "idpscim_last_success_timestamp_seconds",
        "Unix timestamp of the last successful sync cycle",
    )
    .expect("Failed to create LAST_SUCCESS_TIMESTAMP metric - this should never happen")
});

static PARTITION_SIZE: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        prometheus::Opts::new(
            "idpscim_partition_size",
            "Number of records per partition in the last reconciliation",
        ),
        &["resource", "partition"],
    )
    .expect("Failed to create PARTITION_SIZE metric - this should never happen")
});

static SCIM_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "idpscim_scim_operations_total",
            "Total number of SCIM operations by resource and operation",
        ),
        &["resource", "operation"],
    )
    .expect("Failed to create SCIM_OPERATIONS_TOTAL metric - this should never happen")
});

static SCIM_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "idpscim_scim_operation_errors_total",
            "Total number of failed SCIM operations by resource and operation",
        ),
        &["resource", "operation"],
    )
    .expect("Failed to create SCIM_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static SCIM_RETRIES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "idpscim_scim_retries_total",
        "Total number of retried SCIM requests",
    )
    .expect("Failed to create SCIM_RETRIES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when a metric is registered twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(SYNC_RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_SKIPPED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_DURATION.clone()))?;
    REGISTRY.register(Box::new(LAST_SUCCESS_TIMESTAMP.clone()))?;
    REGISTRY.register(Box::new(PARTITION_SIZE.clone()))?;
    REGISTRY.register(Box::new(SCIM_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SCIM_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SCIM_RETRIES_TOTAL.clone()))?;

    Ok(())
}

/// Snapshot of every registered metric family
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_sync_runs() {
    SYNC_RUNS_TOTAL.inc();
}

pub fn increment_sync_errors() {
    SYNC_ERRORS_TOTAL.inc();
}

pub fn increment_sync_skipped() {
    SYNC_SKIPPED_TOTAL.inc();
}

pub fn observe_sync_duration(duration: f64) {
    SYNC_DURATION.observe(duration);
}

pub fn set_last_success_timestamp(unix_seconds: i64) {
    LAST_SUCCESS_TIMESTAMP.set(unix_seconds);
}

/// Publish the partition sizes of one resource kind
pub fn set_partition_sizes(resource: &str, summary: &PartitionSummary) {
    let sizes = [
        ("create", summary.create),
        ("update", summary.update),
        ("equal", summary.equal),
        ("delete", summary.delete),
    ];
    for (partition, size) in sizes {
        PARTITION_SIZE
            .with_label_values(&[resource, partition])
            .set(i64::try_from(size).unwrap_or(i64::MAX));
    }
}

/// Count `count` SCIM operations
pub fn record_scim_operations(resource: &str, operation: &str, count: usize) {
    SCIM_OPERATIONS_TOTAL
        .with_label_values(&[resource, operation])
        .inc_by(count as u64);
}

pub fn increment_scim_operation_errors(resource: &str, operation: &str) {
    SCIM_OPERATION_ERRORS_TOTAL
        .with_label_values(&[resource, operation])
        .inc();
}

pub fn increment_scim_retries() {
    SCIM_RETRIES_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // This should not panic - metrics should register successfully
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_increment_sync_runs() {
        let before = SYNC_RUNS_TOTAL.get();
        increment_sync_runs();
        assert_eq!(SYNC_RUNS_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_increment_sync_errors() {
        let before = SYNC_ERRORS_TOTAL.get();
        increment_sync_errors();
        assert_eq!(SYNC_ERRORS_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_increment_sync_skipped() {
        let before = SYNC_SKIPPED_TOTAL.get();
        increment_sync_skipped();
        assert_eq!(SYNC_SKIPPED_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_observe_sync_duration() {
        let before = SYNC_DURATION.get_sample_count();
        observe_sync_duration(1.5);
        assert_eq!(SYNC_DURATION.get_sample_count(), before + 1);
    }

    #[test]
    fn test_set_partition_sizes() {
        let summary = PartitionSummary {
            create: 3,
            update: 2,
            equal: 10,
            delete: 1,
        };
        set_partition_sizes("test_resource", &summary);

        let gauge = |partition: &str| {
            PARTITION_SIZE
                .with_label_values(&["test_resource", partition])
                .get()
        };
        assert_eq!(gauge("create"), 3);
        assert_eq!(gauge("update"), 2);
        assert_eq!(gauge("equal"), 10);
        assert_eq!(gauge("delete"), 1);
    }

    #[test]
    fn test_record_scim_operations() {
        let before = SCIM_OPERATIONS_TOTAL
            .with_label_values(&["group", "create"])
            .get();
        record_scim_operations("group", "create", 4);
        let after = SCIM_OPERATIONS_TOTAL
            .with_label_values(&["group", "create"])
            .get();
        assert_eq!(after, before + 4u64);
    }

    #[test]
    fn test_increment_scim_operation_errors() {
        let before = SCIM_OPERATION_ERRORS_TOTAL
            .with_label_values(&["user", "delete"])
            .get();
        increment_scim_operation_errors("user", "delete");
        let after = SCIM_OPERATION_ERRORS_TOTAL
            .with_label_values(&["user", "delete"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_scim_retries() {
        let before = SCIM_RETRIES_TOTAL.get();
        increment_scim_retries();
        assert_eq!(SCIM_RETRIES_TOTAL.get(), before + 1u64);
    }
}
