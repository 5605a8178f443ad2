// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant daily budget tracking for the Tollgate model router.
//!
//! This crate provides:
//! - **Budget tracker**: hard/warn enforcement of daily token and USD limits
//! - **Counter stores**: an in-memory `DashMap` store and a SQLite store,
//!   both behind the `BudgetStore` trait from `tollgate-core`

pub mod budget;
pub mod store;

pub use budget::{BudgetLimits, BudgetSettings, BudgetTracker, Clock, SOFT_LIMIT_RATIO, SystemClock};
pub use store::{InMemoryBudgetStore, SqliteBudgetStore, open_store};
