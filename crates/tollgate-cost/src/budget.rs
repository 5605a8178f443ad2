// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant daily budget enforcement.
//!
//! Counters are keyed by tenant and UTC day, so a new day starts from zero
//! without an explicit reset. The tracker emits a `tracing::warn` once a
//! tenant crosses 80% of a limit in hard mode, and reports `HardExceeded`
//! at or above a limit so the router can force the local fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tollgate_config::model::{BudgetConfig, TenantBudgetConfig};
use tollgate_core::{
    BudgetCounters, BudgetState, BudgetStatus, BudgetStore, EnforcementMode, ResetScope,
    TenantId, TollgateError,
};
use tracing::{info, warn};

/// Fraction of a limit at which hard mode starts warning.
pub const SOFT_LIMIT_RATIO: f64 = 0.8;

/// Source of the current UTC day. Injected so tests can cross midnight.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock UTC day.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Effective limits for one tenant after applying overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetLimits {
    pub max_tokens_per_day: Option<u64>,
    pub max_usd_per_day: Option<f64>,
    pub enforcement: EnforcementMode,
}

/// Tenant-wide defaults plus overrides, reported by the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetSettings {
    pub defaults: BudgetLimits,
    pub tenants: BTreeMap<String, BudgetLimits>,
}

/// Daily budget tracker over a swappable counter store.
pub struct BudgetTracker {
    store: Arc<dyn BudgetStore>,
    defaults: BudgetLimits,
    overrides: BTreeMap<String, TenantBudgetConfig>,
    clock: Arc<dyn Clock>,
}

impl BudgetTracker {
    pub fn new(config: &BudgetConfig, store: Arc<dyn BudgetStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &BudgetConfig,
        store: Arc<dyn BudgetStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            defaults: BudgetLimits {
                max_tokens_per_day: config.max_tokens_per_day,
                max_usd_per_day: config.max_usd_per_day,
                enforcement: config.enforcement,
            },
            overrides: config.tenants.clone(),
            clock,
        }
    }

    /// Limits that apply to `tenant`.
    pub fn limits(&self, tenant: &TenantId) -> BudgetLimits {
        match self.overrides.get(tenant.as_str()) {
            Some(o) => BudgetLimits {
                max_tokens_per_day: o.max_tokens_per_day.or(self.defaults.max_tokens_per_day),
                max_usd_per_day: o.max_usd_per_day.or(self.defaults.max_usd_per_day),
                enforcement: o.enforcement.unwrap_or(self.defaults.enforcement),
            },
            None => self.defaults,
        }
    }

    /// Defaults and every configured override.
    pub fn settings(&self) -> BudgetSettings {
        BudgetSettings {
            defaults: self.defaults,
            tenants: self
                .overrides
                .keys()
                .map(|name| (name.clone(), self.limits(&TenantId(name.clone()))))
                .collect(),
        }
    }

    /// Whether `tenant` may use remote providers today.
    pub async fn check(&self, tenant: &TenantId) -> Result<BudgetStatus, TollgateError> {
        let counters = self.store.get(tenant, self.clock.today()).await?;
        let limits = self.limits(tenant);
        let status = evaluate(&counters, &limits);
        match status {
            BudgetStatus::HardExceeded => {
                warn!(tenant = %tenant, tokens_used = counters.tokens_used,
                    usd_used = counters.usd_used, "daily budget exhausted");
            }
            BudgetStatus::SoftExceeded => {
                warn!(tenant = %tenant, tokens_used = counters.tokens_used,
                    usd_used = counters.usd_used, enforcement = %limits.enforcement,
                    "daily budget limit reached or approaching");
            }
            BudgetStatus::Ok => {}
        }
        Ok(status)
    }

    /// Add consumed usage to today's counters and return the new state.
    pub async fn commit(
        &self,
        tenant: &TenantId,
        tokens: u64,
        usd: f64,
    ) -> Result<BudgetState, TollgateError> {
        let day = self.clock.today();
        let usd = if usd.is_finite() { usd.max(0.0) } else { 0.0 };
        let counters = self.store.increment(tenant, day, tokens, usd).await?;
        Ok(self.to_state(tenant, day, counters))
    }

    /// Clear counters for one tenant or all tenants. Idempotent.
    pub async fn reset(&self, scope: &ResetScope) -> Result<(), TollgateError> {
        self.store.reset(scope).await?;
        match scope {
            ResetScope::Tenant(tenant) => info!(tenant = %tenant, "budget counters reset"),
            ResetScope::All => info!("budget counters reset for all tenants"),
        }
        Ok(())
    }

    /// Today's counters and limits for `tenant`.
    pub async fn state(&self, tenant: &TenantId) -> Result<BudgetState, TollgateError> {
        let day = self.clock.today();
        let counters = self.store.get(tenant, day).await?;
        Ok(self.to_state(tenant, day, counters))
    }

    fn to_state(&self, tenant: &TenantId, day: NaiveDate, counters: BudgetCounters) -> BudgetState {
        let limits = self.limits(tenant);
        BudgetState {
            tenant: tenant.clone(),
            day,
            tokens_used: counters.tokens_used,
            usd_used: counters.usd_used,
            limit_tokens: limits.max_tokens_per_day,
            limit_usd: limits.max_usd_per_day,
            enforcement_mode: limits.enforcement,
        }
    }
}

/// Map counters against limits to a status.
fn evaluate(counters: &BudgetCounters, limits: &BudgetLimits) -> BudgetStatus {
    let token_ratio = limits
        .max_tokens_per_day
        .map(|limit| ratio(counters.tokens_used as f64, limit as f64));
    let usd_ratio = limits
        .max_usd_per_day
        .map(|limit| ratio(counters.usd_used, limit));
    let worst = token_ratio.into_iter().chain(usd_ratio).fold(0.0, f64::max);

    match limits.enforcement {
        EnforcementMode::Hard if worst >= 1.0 => BudgetStatus::HardExceeded,
        EnforcementMode::Hard if worst >= SOFT_LIMIT_RATIO => BudgetStatus::SoftExceeded,
        EnforcementMode::Warn if worst >= 1.0 => BudgetStatus::SoftExceeded,
        _ => BudgetStatus::Ok,
    }
}

/// A zero limit is exhausted immediately.
fn ratio(used: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        f64::INFINITY
    } else {
        used / limit
    }
}
