// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local counter store.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tollgate_core::{BudgetCounters, BudgetStore, ResetScope, TenantId, TollgateError};

/// Counters held in a sharded concurrent map.
///
/// Each increment holds the shard lock for its key, so concurrent commits for
/// one tenant are applied one after another.
#[derive(Debug, Default)]
pub struct InMemoryBudgetStore {
    counters: DashMap<(TenantId, NaiveDate), BudgetCounters>,
}

impl InMemoryBudgetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BudgetStore for InMemoryBudgetStore {
    async fn increment(
        &self,
        tenant: &TenantId,
        day: NaiveDate,
        tokens: u64,
        usd: f64,
    ) -> Result<BudgetCounters, TollgateError> {
        let mut entry = self.counters.entry((tenant.clone(), day)).or_default();
        entry.tokens_used = entry.tokens_used.saturating_add(tokens);
        entry.usd_used += usd;
        Ok(*entry)
    }

    async fn get(
        &self,
        tenant: &TenantId,
        day: NaiveDate,
    ) -> Result<BudgetCounters, TollgateError> {
        Ok(self
            .counters
            .get(&(tenant.clone(), day))
            .map(|entry| *entry)
            .unwrap_or_default())
    }

    async fn reset(&self, scope: &ResetScope) -> Result<(), TollgateError> {
        match scope {
            ResetScope::Tenant(tenant) => self.counters.retain(|(t, _), _| t != tenant),
            ResetScope::All => self.counters.clear(),
        }
        Ok(())
    }
}
