// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a
//! no-op.

use std::time::Duration;

use metrics::{describe_counter, describe_histogram};

pub const DISPATCH_TOTAL: &str = "beacon_sms_dispatch_total";
pub const REJECTED_TOTAL: &str = "beacon_sms_rejected_total";
pub const CALLBACKS_TOTAL: &str = "beacon_sms_callbacks_total";
pub const RETRIES_TOTAL: &str = "beacon_sms_retries_total";
pub const PROVIDER_LATENCY: &str = "beacon_sms_provider_latency_seconds";

/// Register all Beacon metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(DISPATCH_TOTAL, "SMS dispatch calls by kind and outcome");
    describe_counter!(REJECTED_TOTAL, "Sends refused before a record was created");
    describe_counter!(CALLBACKS_TOTAL, "Provider status callbacks by result");
    describe_counter!(RETRIES_TOTAL, "Retry attempts scheduled after transient failures");
    describe_histogram!(PROVIDER_LATENCY, "SMS provider send latency in seconds");
}

/// Record the outcome of one dispatch call.
pub fn record_dispatch(kind: &str, outcome: &'static str) {
    metrics::counter!(DISPATCH_TOTAL, "kind" => kind.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Record a pre-creation rejection.
pub fn record_rejection(reason: &'static str) {
    metrics::counter!(REJECTED_TOTAL, "reason" => reason).increment(1);
}

/// Record a processed provider callback.
pub fn record_callback(result: &'static str) {
    metrics::counter!(CALLBACKS_TOTAL, "result" => result).increment(1);
}

/// Record a scheduled retry.
pub fn record_retry(kind: &str) {
    metrics::counter!(RETRIES_TOTAL, "kind" => kind.to_string()).increment(1);
}

/// Record provider call latency.
pub fn record_provider_latency(elapsed: Duration) {
    metrics::histogram!(PROVIDER_LATENCY).record(elapsed.as_secs_f64());
}
