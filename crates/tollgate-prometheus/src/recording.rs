// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. With no recorder installed every call is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use tollgate_core::{GuardStage, TokenUsage};

/// Register all Tollgate metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("tollgate_requests_total", "Requests handled, by outcome");
    describe_counter!("tollgate_escalations_total", "Low-confidence escalations");
    describe_counter!("tollgate_blocks_total", "Requests blocked, by guard stage");
    describe_counter!("tollgate_fallbacks_total", "Local fallbacks, by cause");
    describe_counter!("tollgate_provider_failures_total", "Failed provider attempts");
    describe_counter!("tollgate_budget_warnings_total", "Soft budget threshold crossings");
    describe_counter!("tollgate_tokens_total", "Tokens consumed");
    describe_counter!("tollgate_cost_usd_total", "Spend in USD");
    describe_gauge!("tollgate_budget_used_ratio", "Fraction of the tenant's daily budget used");
    describe_histogram!(
        "tollgate_request_latency_seconds",
        "End-to-end request latency in seconds"
    );
}

/// Record a finished request. `outcome` is `returned`, `escalated`, `fallback`
/// or `blocked`.
pub fn record_request(outcome: &'static str) {
    metrics::counter!("tollgate_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_escalation(from: &str, to: &str) {
    metrics::counter!("tollgate_escalations_total", "from" => from.to_string(), "to" => to.to_string())
        .increment(1);
}

/// Record a block by the given guard stage.
pub fn record_block(stage: GuardStage) {
    metrics::counter!("tollgate_blocks_total", "stage" => stage.to_string()).increment(1);
}

/// Record a local fallback. `cause` is `budget` or `providers_failed`.
pub fn record_fallback(cause: &'static str) {
    metrics::counter!("tollgate_fallbacks_total", "cause" => cause).increment(1);
}

pub fn record_provider_failure(provider: &str) {
    metrics::counter!("tollgate_provider_failures_total", "provider" => provider.to_string())
        .increment(1);
}

pub fn record_budget_warning(tenant: &str) {
    metrics::counter!("tollgate_budget_warnings_total", "tenant" => tenant.to_string()).increment(1);
}

/// Record token consumption.
pub fn record_tokens(provider: &str, usage: &TokenUsage) {
    metrics::counter!("tollgate_tokens_total", "provider" => provider.to_string(), "type" => "prompt")
        .increment(usage.prompt_tokens as u64);
    metrics::counter!("tollgate_tokens_total", "provider" => provider.to_string(), "type" => "completion")
        .increment(usage.completion_tokens as u64);
}

/// Record spend. Counters are integral, so cost is recorded in micro-dollars.
pub fn record_cost(tenant: &str, usd: f64) {
    if usd.is_finite() && usd > 0.0 {
        let micros = (usd * 1_000_000.0).round() as u64;
        metrics::counter!("tollgate_cost_usd_total", "tenant" => tenant.to_string(), "unit" => "micro_usd")
            .increment(micros);
    }
}

/// Set the tenant's budget utilization (highest of token and USD ratios).
pub fn set_budget_used(tenant: &str, ratio: f64) {
    metrics::gauge!("tollgate_budget_used_ratio", "tenant" => tenant.to_string()).set(ratio);
}

/// Record end-to-end latency.
pub fn record_latency(seconds: f64) {
    metrics::histogram!("tollgate_request_latency_seconds").record(seconds);
}
