// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling-window circuit breaker for every provider.
//!
//! Each provider keeps its last `window_size` call outcomes. The derived
//! status is purely observational: the router consults it when ordering
//! candidates and skips `Unhealthy` providers. Recovery is driven by probes:
//!
//! ```text
//! Healthy/Degraded --(rate or failures past the cap)--> Unhealthy
//! Unhealthy --(cool-down elapsed, probe ok)--> HalfOpen
//! HalfOpen --(probe or call ok)--> Healthy (fresh window)
//! HalfOpen --(probe or call failed)--> Unhealthy (cool-down restarted)
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::time::Instant;
use tollgate_config::model::HealthConfig;
use tollgate_core::{HealthStatus, ProviderHealth};
use tracing::{debug, info, warn};

/// Breaker thresholds, taken from `[health]`.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    pub window_size: usize,
    pub min_calls: usize,
    pub degraded_failure_rate: f32,
    pub unhealthy_failure_rate: f32,
    pub consecutive_failure_cap: u32,
    pub cooldown: Duration,
}

impl From<&HealthConfig> for BreakerSettings {
    fn from(config: &HealthConfig) -> Self {
        Self {
            window_size: config.window_size.max(1),
            min_calls: config.min_calls,
            degraded_failure_rate: config.degraded_failure_rate,
            unhealthy_failure_rate: config.unhealthy_failure_rate,
            consecutive_failure_cap: config.consecutive_failure_cap,
            cooldown: Duration::from_millis(config.cooldown_ms),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    ok: bool,
    latency_ms: Option<u64>,
}

#[derive(Debug)]
struct BreakerState {
    status: HealthStatus,
    window: VecDeque<Sample>,
    consecutive_failures: u32,
    last_latency_ms: Option<u64>,
    last_checked_at: Option<DateTime<Utc>>,
    opened_at: Option<Instant>,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            status: HealthStatus::Healthy,
            window: VecDeque::new(),
            consecutive_failures: 0,
            last_latency_ms: None,
            last_checked_at: None,
            opened_at: None,
        }
    }

    fn push(&mut self, sample: Sample, window_size: usize) {
        self.window.push_back(sample);
        while self.window.len() > window_size {
            self.window.pop_front();
        }
        if let Some(latency) = sample.latency_ms {
            self.last_latency_ms = Some(latency);
        }
        self.last_checked_at = Some(Utc::now());
    }

    fn failure_rate(&self) -> f32 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|s| !s.ok).count();
        failures as f32 / self.window.len() as f32
    }

    fn avg_latency_ms(&self) -> Option<f64> {
        let latencies: Vec<u64> = self.window.iter().filter_map(|s| s.latency_ms).collect();
        if latencies.is_empty() {
            None
        } else {
            Some(latencies.iter().sum::<u64>() as f64 / latencies.len() as f64)
        }
    }

    /// Status implied by the window alone.
    ///
    /// The unhealthy rate applies from the first sample. `min_calls` only
    /// gates the degraded band.
    fn derived_status(&self, settings: &BreakerSettings) -> HealthStatus {
        if self.consecutive_failures > settings.consecutive_failure_cap {
            return HealthStatus::Unhealthy;
        }
        let rate = self.failure_rate();
        if !self.window.is_empty() && rate >= settings.unhealthy_failure_rate {
            HealthStatus::Unhealthy
        } else if self.window.len() >= settings.min_calls
            && rate >= settings.degraded_failure_rate
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Health state for all providers, shared across request tasks.
#[derive(Debug)]
pub struct HealthMonitor {
    settings: BreakerSettings,
    providers: DashMap<String, BreakerState>,
}

impl HealthMonitor {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            providers: DashMap::new(),
        }
    }

    /// Start tracking a provider as healthy. Re-registering keeps existing state.
    pub fn register(&self, name: &str) {
        self.providers
            .entry(name.to_string())
            .or_insert_with(BreakerState::new);
    }

    /// Record a successful call.
    pub fn record_success(&self, name: &str, latency_ms: u64) {
        let mut state = self
            .providers
            .entry(name.to_string())
            .or_insert_with(BreakerState::new);
        state.consecutive_failures = 0;

        match state.status {
            HealthStatus::HalfOpen => {
                state.window.clear();
                state.push(
                    Sample {
                        ok: true,
                        latency_ms: Some(latency_ms),
                    },
                    self.settings.window_size,
                );
                state.status = HealthStatus::Healthy;
                state.opened_at = None;
                info!(provider = name, "provider recovered");
            }
            HealthStatus::Unhealthy => {
                // A late in-flight success does not close an open breaker.
                state.push(
                    Sample {
                        ok: true,
                        latency_ms: Some(latency_ms),
                    },
                    self.settings.window_size,
                );
            }
            HealthStatus::Healthy | HealthStatus::Degraded => {
                state.push(
                    Sample {
                        ok: true,
                        latency_ms: Some(latency_ms),
                    },
                    self.settings.window_size,
                );
                let next = state.derived_status(&self.settings);
                self.transition(name, &mut state, next);
            }
        }
    }

    /// Record a failed or timed-out call.
    pub fn record_failure(&self, name: &str) {
        let mut state = self
            .providers
            .entry(name.to_string())
            .or_insert_with(BreakerState::new);
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.push(
            Sample {
                ok: false,
                latency_ms: None,
            },
            self.settings.window_size,
        );

        match state.status {
            HealthStatus::HalfOpen => {
                self.transition(name, &mut state, HealthStatus::Unhealthy);
            }
            HealthStatus::Unhealthy => {}
            HealthStatus::Healthy | HealthStatus::Degraded => {
                let next = state.derived_status(&self.settings);
                self.transition(name, &mut state, next);
            }
        }
    }

    /// Record the outcome of a health probe.
    pub fn record_probe(&self, name: &str, ok: bool) {
        let mut state = self
            .providers
            .entry(name.to_string())
            .or_insert_with(BreakerState::new);
        state.last_checked_at = Some(Utc::now());

        match (state.status, ok) {
            (HealthStatus::Unhealthy, true) => {
                state.consecutive_failures = 0;
                self.transition(name, &mut state, HealthStatus::HalfOpen);
            }
            (HealthStatus::HalfOpen, true) => {
                state.consecutive_failures = 0;
                state.window.clear();
                state.status = HealthStatus::Healthy;
                state.opened_at = None;
                info!(provider = name, "provider recovered after probe");
            }
            (HealthStatus::Unhealthy | HealthStatus::HalfOpen, false) => {
                state.status = HealthStatus::Unhealthy;
                state.opened_at = Some(Instant::now());
                debug!(provider = name, "probe failed, cool-down restarted");
            }
            (HealthStatus::Healthy | HealthStatus::Degraded, _) => {}
        }
    }

    fn transition(&self, name: &str, state: &mut BreakerState, next: HealthStatus) {
        if state.status == next {
            return;
        }
        let previous = state.status;
        state.status = next;
        if next == HealthStatus::Unhealthy {
            state.opened_at = Some(Instant::now());
            warn!(
                provider = name,
                from = %previous,
                failure_rate = state.failure_rate(),
                consecutive_failures = state.consecutive_failures,
                "provider marked unhealthy"
            );
        } else {
            info!(provider = name, from = %previous, to = %next, "provider health changed");
        }
    }

    /// Current status. Unknown providers read as healthy.
    pub fn status(&self, name: &str) -> HealthStatus {
        self.providers
            .get(name)
            .map(|s| s.status)
            .unwrap_or(HealthStatus::Healthy)
    }

    /// Whether the router may send calls to `name`.
    pub fn is_selectable(&self, name: &str) -> bool {
        self.status(name) != HealthStatus::Unhealthy
    }

    /// Rolling average latency used as a tie-break between equal candidates.
    pub fn avg_latency_ms(&self, name: &str) -> Option<f64> {
        self.providers.get(name).and_then(|s| s.avg_latency_ms())
    }

    /// Providers the prober should check now: unhealthy past the cool-down,
    /// and half-open.
    pub fn probe_due(&self) -> Vec<String> {
        let now = Instant::now();
        let mut due: Vec<String> = self
            .providers
            .iter()
            .filter(|entry| match entry.status {
                HealthStatus::HalfOpen => true,
                HealthStatus::Unhealthy => entry
                    .opened_at
                    .is_none_or(|opened| now.duration_since(opened) >= self.settings.cooldown),
                _ => false,
            })
            .map(|entry| entry.key().clone())
            .collect();
        due.sort();
        due
    }

    pub fn snapshot(&self, name: &str) -> Option<ProviderHealth> {
        self.providers.get(name).map(|s| ProviderHealth {
            name: name.to_string(),
            status: s.status,
            consecutive_failures: s.consecutive_failures,
            failure_rate: s.failure_rate(),
            last_latency_ms: s.last_latency_ms,
            avg_latency_ms: s.avg_latency_ms(),
            last_checked_at: s.last_checked_at,
        })
    }

    /// Snapshots of every tracked provider, sorted by name.
    pub fn snapshot_all(&self) -> Vec<ProviderHealth> {
        let mut names: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names.iter().filter_map(|name| self.snapshot(name)).collect()
    }

    /// Force a provider open. Used by tests and operators to drain a backend.
    pub fn force_unhealthy(&self, name: &str) {
        let mut state = self
            .providers
            .entry(name.to_string())
            .or_insert_with(BreakerState::new);
        self.transition(name, &mut state, HealthStatus::Unhealthy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> BreakerSettings {
        BreakerSettings::from(&HealthConfig::default())
    }

    fn monitor() -> HealthMonitor {
        let m = HealthMonitor::new(settings());
        m.register("p");
        m
    }

    #[test]
    fn new_provider_is_healthy() {
        let m = monitor();
        assert_eq!(m.status("p"), HealthStatus::Healthy);
        assert!(m.is_selectable("p"));
        assert_eq!(m.status("unknown"), HealthStatus::Healthy);
    }

    #[test]
    fn consecutive_failures_past_cap_open_breaker() {
        let m = monitor();
        for _ in 0..20 {
            m.record_success("p", 10);
        }
        // At the cap the window rate is 0.25: still healthy.
        for _ in 0..5 {
            m.record_failure("p");
        }
        assert_eq!(m.status("p"), HealthStatus::Healthy);
        m.record_failure("p");
        assert_eq!(m.status("p"), HealthStatus::Unhealthy);
        assert!(!m.is_selectable("p"));
    }

    #[test]
    fn only_failures_is_unhealthy_before_min_calls() {
        let m = monitor();
        m.record_failure("p");
        assert_eq!(m.status("p"), HealthStatus::Unhealthy);
        let snap = m.snapshot("p").unwrap();
        assert_eq!(snap.consecutive_failures, 1);
    }

    #[test]
    fn failure_rate_degrades_after_min_calls() {
        let m = monitor();
        // 0.5 after four samples is below min_calls, 0.6 after five is not.
        m.record_success("p", 10);
        m.record_failure("p");
        m.record_success("p", 10);
        m.record_failure("p");
        assert_eq!(m.status("p"), HealthStatus::Healthy);
        m.record_failure("p");
        assert_eq!(m.status("p"), HealthStatus::Degraded);
    }

    #[test]
    fn high_failure_rate_is_unhealthy() {
        let m = monitor();
        m.record_success("p", 10);
        for _ in 0..4 {
            m.record_failure("p");
        }
        // 4 of 5 failed: 0.8.
        assert_eq!(m.status("p"), HealthStatus::Unhealthy);
    }

    #[test]
    fn degraded_recovers_as_window_clears() {
        let m = monitor();
        m.record_success("p", 5);
        m.record_failure("p");
        m.record_success("p", 5);
        m.record_failure("p");
        m.record_failure("p");
        assert_eq!(m.status("p"), HealthStatus::Degraded);
        for _ in 0..10 {
            m.record_success("p", 5);
        }
        assert_eq!(m.status("p"), HealthStatus::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_cycle_half_open_then_healthy() {
        let m = monitor();
        m.force_unhealthy("p");
        assert!(m.probe_due().is_empty());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(m.probe_due(), vec!["p".to_string()]);

        m.record_probe("p", true);
        assert_eq!(m.status("p"), HealthStatus::HalfOpen);
        assert!(m.is_selectable("p"));

        m.record_success("p", 12);
        assert_eq!(m.status("p"), HealthStatus::Healthy);
        let snap = m.snapshot("p").unwrap();
        assert_eq!(snap.failure_rate, 0.0);
        assert_eq!(snap.last_latency_ms, Some(12));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_restarts_cooldown() {
        let m = monitor();
        m.force_unhealthy("p");
        tokio::time::advance(Duration::from_secs(31)).await;
        m.record_probe("p", false);
        assert_eq!(m.status("p"), HealthStatus::Unhealthy);
        assert!(m.probe_due().is_empty());
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(m.probe_due().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_while_half_open_reopens() {
        let m = monitor();
        m.force_unhealthy("p");
        tokio::time::advance(Duration::from_secs(31)).await;
        m.record_probe("p", true);
        m.record_failure("p");
        assert_eq!(m.status("p"), HealthStatus::Unhealthy);
        assert!(m.probe_due().is_empty());
    }

    #[test]
    fn late_success_does_not_close_open_breaker() {
        let m = monitor();
        m.force_unhealthy("p");
        m.record_success("p", 3);
        assert_eq!(m.status("p"), HealthStatus::Unhealthy);
    }

    #[test]
    fn average_latency_over_window() {
        let m = monitor();
        m.record_success("p", 10);
        m.record_success("p", 30);
        assert_eq!(m.avg_latency_ms("p"), Some(20.0));
        assert_eq!(m.avg_latency_ms("missing"), None);
    }

    #[test]
    fn window_is_bounded() {
        let m = HealthMonitor::new(BreakerSettings {
            window_size: 3,
            min_calls: 3,
            ..settings()
        });
        for _ in 0..3 {
            m.record_failure("p");
        }
        // window now [F, F, F] -> unhealthy by rate.
        assert_eq!(m.status("p"), HealthStatus::Unhealthy);
        let snap = m.snapshot("p").unwrap();
        assert_eq!(snap.consecutive_failures, 3);
        assert!((snap.failure_rate - 1.0).abs() < f32::EPSILON);
    }
}
