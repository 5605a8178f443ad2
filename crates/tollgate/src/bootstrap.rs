// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires configuration into a running router.
//!
//! Shared by `tollgate serve` and `tollgate route` so both paths build the
//! same provider set, budget store and health monitor.

use std::sync::Arc;
use std::time::Duration;

use tollgate_config::TollgateConfig;
use tollgate_core::{ProviderAdapter, TollgateError};
use tollgate_cost::{BudgetTracker, open_store};
use tollgate_provider::build_providers;
use tollgate_resilience::{BreakerSettings, HealthMonitor, HealthProber};
use tollgate_router::Router;
use tracing::info;

/// Everything a request path needs, built once at startup.
pub struct Services {
    pub router: Arc<Router>,
    pub budget: Arc<BudgetTracker>,
    pub health: Arc<HealthMonitor>,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    probe_interval: Duration,
    probe_timeout: Duration,
}

impl Services {
    /// Build providers, open the budget store and assemble the router.
    pub async fn build(config: &TollgateConfig) -> Result<Self, TollgateError> {
        let entries = build_providers(&config.providers);
        let adapters: Vec<Arc<dyn ProviderAdapter>> =
            entries.iter().map(|e| Arc::clone(&e.adapter)).collect();

        let store = open_store(&config.budget).await?;
        info!(
            store = ?config.budget.store,
            enforcement = %config.budget.enforcement,
            "budget store opened"
        );
        let budget = Arc::new(BudgetTracker::new(&config.budget, store));
        let health = Arc::new(HealthMonitor::new(BreakerSettings::from(&config.health)));
        let router = Arc::new(Router::new(
            config,
            entries,
            Arc::clone(&budget),
            Arc::clone(&health),
        )?);

        info!(
            providers = adapters.len(),
            router_active = router.router_active(),
            "router ready"
        );

        Ok(Self {
            router,
            budget,
            health,
            adapters,
            probe_interval: Duration::from_millis(config.health.probe_interval_ms),
            probe_timeout: Duration::from_millis(config.router.provider_timeout_ms),
        })
    }

    /// Names of every registered provider, fallback included.
    pub fn provider_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Background prober for providers the health monitor marks as due.
    pub fn prober(&self) -> HealthProber {
        HealthProber::new(
            Arc::clone(&self.health),
            &self.adapters,
            self.probe_interval,
            self.probe_timeout,
        )
    }
}
