//! Prometheus metrics for the stock watcher
//!
//! This module provides metrics tracking for:
//! - Vendor checks by store and outcome
//! - Alerts sent per store
//! - Cycle outcomes, duration and per-store found/tracked counts
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

pub mod server;

use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram, CounterVec,
    Encoder, Gauge, GaugeVec, Histogram, TextEncoder,
};
use std::sync::OnceLock;

use crate::models::{CycleReport, StoreType};

// ============================================================================
// Metrics Storage
// ============================================================================

struct WatcherMetrics {
    checks: CounterVec,
    alerts: CounterVec,
    cycles: CounterVec,
    cycle_duration: Histogram,
    last_cycle_timestamp: Gauge,
    products_tracked: GaugeVec,
    products_found: GaugeVec,
}

static WATCHER_METRICS: OnceLock<WatcherMetrics> = OnceLock::new();

/// Outcome of the one-time registration
static METRICS_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Outcome label for a single vendor check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Available,
    Unavailable,
    Unconfigured,
    Error,
}

impl CheckOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Unconfigured => "unconfigured",
            Self::Error => "error",
        }
    }
}

/// Outcome label for a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Completed,
    Skipped,
    Failed,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once and from several threads; registration
/// runs once and later calls return its result.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    METRICS_INIT
        .get_or_init(|| register_metrics().map_err(|e| e.to_string()))
        .clone()
        .map_err(Into::into)
}

fn register_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let metrics = WatcherMetrics {
        checks: register_counter_vec!(
            "stockwatch_checks_total",
            "Vendor availability checks by store and outcome",
            &["store", "outcome"]
        )?,
        alerts: register_counter_vec!(
            "stockwatch_alerts_total",
            "Stock alerts by store and delivery result",
            &["store", "delivered"]
        )?,
        cycles: register_counter_vec!(
            "stockwatch_cycles_total",
            "Check cycles by outcome",
            &["outcome"]
        )?,
        cycle_duration: register_histogram!(
            "stockwatch_cycle_duration_seconds",
            "Wall-clock duration of a completed cycle in seconds",
            vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]
        )?,
        last_cycle_timestamp: register_gauge!(
            "stockwatch_last_cycle_timestamp_seconds",
            "Unix time at which the last cycle finished"
        )?,
        products_tracked: register_gauge_vec!(
            "stockwatch_products_tracked",
            "Products tracked per store in the last completed cycle",
            &["store"]
        )?,
        products_found: register_gauge_vec!(
            "stockwatch_products_found",
            "Products found available per store in the last completed cycle",
            &["store"]
        )?,
    };

    WATCHER_METRICS
        .set(metrics)
        .map_err(|_| "Watcher metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Whether registration succeeded; reported by `/health`
pub fn metrics_initialized() -> bool {
    WATCHER_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record one vendor check
pub fn record_check(store: StoreType, outcome: CheckOutcome) {
    if let Some(m) = WATCHER_METRICS.get() {
        m.checks
            .with_label_values(&[store.as_str(), outcome.as_str()])
            .inc();
    }
}

/// Record an alert delivery attempt
pub fn record_alert(store: StoreType, delivered: bool) {
    if let Some(m) = WATCHER_METRICS.get() {
        let delivered = if delivered { "true" } else { "false" };
        m.alerts
            .with_label_values(&[store.as_str(), delivered])
            .inc();
    }
}

/// Record a cycle that did not complete
pub fn record_cycle_status(status: CycleStatus) {
    let Some(m) = WATCHER_METRICS.get() else {
        return;
    };

    m.cycles.with_label_values(&[status.as_str()]).inc();
    m.last_cycle_timestamp
        .set(chrono::Utc::now().timestamp() as f64);
}

/// Record a completed cycle and its per-store results
pub fn record_cycle(report: &CycleReport) {
    let Some(m) = WATCHER_METRICS.get() else {
        return;
    };

    record_cycle_status(CycleStatus::Completed);
    m.cycle_duration.observe(report.duration.as_secs_f64());

    for (store, result) in &report.stores {
        m.products_tracked
            .with_label_values(&[store.as_str()])
            .set(result.total as f64);
        m.products_found
            .with_label_values(&[store.as_str()])
            .set(result.found as f64);
    }
}

// ============================================================================
// Tests
// ============================================================================
