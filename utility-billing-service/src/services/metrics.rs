//! Metrics module for utility-billing-service.
//! Provides Prometheus metrics for bill generation, readings and payments.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_counter_vec, register_histogram_vec, register_int_counter,
    register_int_counter_vec, CounterVec, Encoder, HistogramVec, IntCounter, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "billing_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Generation runs by outcome
pub static GENERATION_RUNS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Bills persisted
pub static BILLS_CREATED_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Billed amount by charge type (rent, water, ...)
pub static BILLED_AMOUNT_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Meter readings recorded by utility
pub static METER_READINGS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Bills marked paid
pub static BILLS_PAID_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    GENERATION_RUNS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "bill_generation_runs_total",
                "Total bill generation runs by outcome"
            ),
            &["status"]
        )
        .expect("Failed to register GENERATION_RUNS_TOTAL")
    });

    BILLS_CREATED_TOTAL.get_or_init(|| {
        register_int_counter!(opts!("bills_created_total", "Total bills created"))
            .expect("Failed to register BILLS_CREATED_TOTAL")
    });

    BILLED_AMOUNT_TOTAL.get_or_init(|| {
        register_counter_vec!(
            opts!(
                "billed_amount_total",
                "Total amount billed by charge type"
            ),
            &["charge_type"]
        )
        .expect("Failed to register BILLED_AMOUNT_TOTAL")
    });

    METER_READINGS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("meter_readings_total", "Total meter readings recorded"),
            &["utility"]
        )
        .expect("Failed to register METER_READINGS_TOTAL")
    });

    BILLS_PAID_TOTAL.get_or_init(|| {
        register_int_counter!(opts!("bills_paid_total", "Total bills marked paid"))
            .expect("Failed to register BILLS_PAID_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("billing_errors_total", "Total errors by type for alerting"),
            &["error_type", "operation"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record the outcome of a generation run.
pub fn record_generation_run(status: &str) {
    if let Some(counter) = GENERATION_RUNS_TOTAL.get() {
        counter.with_label_values(&[status]).inc();
    }
}

/// Record persisted bills.
pub fn record_bills_created(count: usize) {
    if let Some(counter) = BILLS_CREATED_TOTAL.get() {
        counter.inc_by(count as u64);
    }
}

/// Record a billed amount for financial tracking.
pub fn record_billed_amount(charge_type: &str, amount: f64) {
    if let Some(counter) = BILLED_AMOUNT_TOTAL.get() {
        counter
            .with_label_values(&[charge_type])
            .inc_by(amount.abs());
    }
}

/// Record a meter reading.
pub fn record_meter_reading(utility: &str) {
    if let Some(counter) = METER_READINGS_TOTAL.get() {
        counter.with_label_values(&[utility]).inc();
    }
}

/// Record a bill payment.
pub fn record_bill_paid() {
    if let Some(counter) = BILLS_PAID_TOTAL.get() {
        counter.inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type, operation]).inc();
    }
}
