// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end router testing.
//!
//! `TestHarness` assembles a complete router with mock providers, an
//! in-memory budget store, a health monitor and a fixed clock. Provides
//! `ask()` to drive the full pipeline in tests.

use std::sync::Arc;

use chrono::NaiveDate;
use tollgate_config::TollgateConfig;
use tollgate_core::{ProviderAdapter, ProviderTier, Request, TenantId, TollgateError};
use tollgate_cost::{BudgetTracker, Clock, InMemoryBudgetStore};
use tollgate_provider::{LocalProvider, ProviderEntry};
use tollgate_resilience::{BreakerSettings, HealthMonitor};
use tollgate_router::{ChatOutcome, Router};

use crate::mock_provider::MockProvider;

/// Clock pinned to one day unless moved.
#[derive(Debug)]
pub struct FixedClock {
    day: std::sync::Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: std::sync::Mutex::new(day),
        }
    }

    /// Move to another day.
    pub fn set(&self, day: NaiveDate) {
        if let Ok(mut guard) = self.day.lock() {
            *guard = day;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        match self.day.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: TollgateConfig,
    providers: Vec<(Arc<dyn ProviderAdapter>, u32)>,
    mocks: Vec<Arc<MockProvider>>,
    day: NaiveDate,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: TollgateConfig::default(),
            providers: Vec::new(),
            mocks: Vec::new(),
            day: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
        }
    }

    /// Add a mock provider with the default priority.
    pub fn with_provider(self, mock: Arc<MockProvider>) -> Self {
        self.with_provider_priority(mock, 100)
    }

    /// Add a mock provider with an explicit priority.
    pub fn with_provider_priority(mut self, mock: Arc<MockProvider>, priority: u32) -> Self {
        self.providers
            .push((Arc::clone(&mock) as Arc<dyn ProviderAdapter>, priority));
        self.mocks.push(mock);
        self
    }

    /// Adjust the configuration before the router is built.
    pub fn with_config(mut self, edit: impl FnOnce(&mut TollgateConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Day reported by the harness clock.
    pub fn on_day(mut self, day: NaiveDate) -> Self {
        self.day = day;
        self
    }

    /// Build the harness. A default local provider is added when no
    /// local-tier mock was supplied.
    pub fn build(self) -> Result<TestHarness, TollgateError> {
        let mut entries: Vec<ProviderEntry> = self
            .providers
            .into_iter()
            .map(|(adapter, priority)| ProviderEntry {
                adapter,
                priority,
                max_tokens: 1024,
            })
            .collect();
        if !entries
            .iter()
            .any(|e| e.adapter.tier() == ProviderTier::Local)
        {
            entries.push(ProviderEntry {
                adapter: Arc::new(LocalProvider::default()),
                priority: u32::MAX,
                max_tokens: 1024,
            });
        }

        let clock = Arc::new(FixedClock::new(self.day));
        let budget = Arc::new(BudgetTracker::with_clock(
            &self.config.budget,
            Arc::new(InMemoryBudgetStore::new()),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let health = Arc::new(HealthMonitor::new(BreakerSettings::from(&self.config.health)));
        let router = Arc::new(Router::new(
            &self.config,
            entries,
            Arc::clone(&budget),
            Arc::clone(&health),
        )?);

        Ok(TestHarness {
            router,
            budget,
            health,
            clock,
            mocks: self.mocks,
            config: self.config,
        })
    }
}

/// A complete router with mock providers and in-memory state.
pub struct TestHarness {
    /// The router under test.
    pub router: Arc<Router>,
    /// Budget tracker shared with the router.
    pub budget: Arc<BudgetTracker>,
    /// Health monitor shared with the router.
    pub health: Arc<HealthMonitor>,
    /// Clock driving the budget day.
    pub clock: Arc<FixedClock>,
    /// Mock providers in the order they were added.
    pub mocks: Vec<Arc<MockProvider>>,
    /// Configuration the router was built from.
    pub config: TollgateConfig,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Send a query as the default tenant.
    pub async fn ask(&self, text: &str) -> ChatOutcome {
        self.ask_as(TenantId::DEFAULT, text).await
    }

    /// Send a query as `tenant`.
    pub async fn ask_as(&self, tenant: &str, text: &str) -> ChatOutcome {
        self.router
            .handle(Request::new(TenantId::from(tenant), text))
            .await
    }
}
