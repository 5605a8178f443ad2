// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily counter store behind the budget tracker.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::TollgateError;
use crate::types::{ResetScope, TenantId};

/// Usage counters for one tenant on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BudgetCounters {
    pub tokens_used: u64,
    pub usd_used: f64,
}

/// Storage for per-tenant, per-day usage counters.
///
/// Increments for a single `(tenant, day)` key must be linearizable: two
/// concurrent `increment` calls both land and neither is lost.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Adds usage and returns the counters after the increment.
    async fn increment(
        &self,
        tenant: &TenantId,
        day: NaiveDate,
        tokens: u64,
        usd: f64,
    ) -> Result<BudgetCounters, TollgateError>;

    /// Current counters. Missing keys read as zero.
    async fn get(&self, tenant: &TenantId, day: NaiveDate)
    -> Result<BudgetCounters, TollgateError>;

    /// Clears counters for one tenant (all days) or every tenant.
    async fn reset(&self, scope: &ResetScope) -> Result<(), TollgateError>;
}
