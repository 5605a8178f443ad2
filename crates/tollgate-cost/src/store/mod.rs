// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Budget counter store implementations.

mod memory;
mod sqlite;

use std::sync::Arc;

use tollgate_config::model::{BudgetConfig, BudgetStoreKind};
use tollgate_core::{BudgetStore, TollgateError};

pub use memory::InMemoryBudgetStore;
pub use sqlite::SqliteBudgetStore;

/// Build the store selected by `budget.store`.
pub async fn open_store(config: &BudgetConfig) -> Result<Arc<dyn BudgetStore>, TollgateError> {
    match config.store {
        BudgetStoreKind::Memory => Ok(Arc::new(InMemoryBudgetStore::new())),
        BudgetStoreKind::Sqlite => Ok(Arc::new(
            SqliteBudgetStore::open(&config.database_path).await?,
        )),
    }
}
