// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the Tollgate model router.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via [`PrometheusExporter::render`],
//! which is exposed through the gateway's `/metrics` endpoint.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tollgate_core::TollgateError;

pub use recording::{
    record_block, record_budget_warning, record_cost, record_escalation, record_fallback,
    record_latency, record_provider_failure, record_request, record_tokens, register_metrics,
    set_budget_used,
};

/// Installed Prometheus recorder.
#[derive(Clone)]
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Install the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process. Returns an error if a
    /// recorder is already installed.
    pub fn install() -> Result<Self, TollgateError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            TollgateError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::{GuardStage, TokenUsage};

    fn render_with_local_recorder(f: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, f);
        handle.render()
    }

    #[test]
    fn counters_carry_labels() {
        let out = render_with_local_recorder(|| {
            record_request("returned");
            record_request("returned");
            record_block(GuardStage::PostGuard);
            record_fallback("budget");
        });
        assert!(out.contains("tollgate_requests_total{outcome=\"returned\"} 2"), "{out}");
        assert!(out.contains("tollgate_blocks_total{stage=\"post_guard\"} 1"), "{out}");
        assert!(out.contains("tollgate_fallbacks_total{cause=\"budget\"} 1"), "{out}");
    }

    #[test]
    fn tokens_split_by_type() {
        let out = render_with_local_recorder(|| {
            record_tokens(
                "fast-a",
                &TokenUsage {
                    prompt_tokens: 7,
                    completion_tokens: 3,
                },
            );
        });
        assert!(out.contains("type=\"prompt\""), "{out}");
        assert!(out.contains("type=\"completion\""), "{out}");
    }

    #[test]
    fn cost_ignores_non_positive_values() {
        let out = render_with_local_recorder(|| {
            record_cost("acme", 0.0);
            record_cost("acme", f64::NAN);
        });
        assert!(!out.contains("tollgate_cost_usd_total"), "{out}");
    }
}
