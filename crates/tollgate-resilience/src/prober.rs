// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background task that probes open and half-open providers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tollgate_core::ProviderAdapter;
use tracing::{debug, info};

use crate::monitor::HealthMonitor;

/// Periodically calls `health_check()` on providers the monitor marks as due.
pub struct HealthProber {
    monitor: Arc<HealthMonitor>,
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    interval: Duration,
    probe_timeout: Duration,
}

impl HealthProber {
    pub fn new(
        monitor: Arc<HealthMonitor>,
        providers: &[Arc<dyn ProviderAdapter>],
        interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            monitor,
            providers: providers
                .iter()
                .map(|p| (p.name().to_string(), Arc::clone(p)))
                .collect(),
            interval,
            probe_timeout,
        }
    }

    /// Probe every due provider once. Returns the names that were probed.
    pub async fn probe_once(&self) -> Vec<String> {
        let due = self.monitor.probe_due();
        for name in &due {
            let Some(provider) = self.providers.get(name) else {
                continue;
            };
            let ok = matches!(
                tokio::time::timeout(self.probe_timeout, provider.health_check()).await,
                Ok(Ok(()))
            );
            debug!(provider = %name, ok, "health probe");
            self.monitor.record_probe(name, ok);
        }
        due
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "health prober started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("health prober stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
            }
        }
    }
}
