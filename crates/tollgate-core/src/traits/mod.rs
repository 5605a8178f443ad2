// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams for swappable backends.
//!
//! Both traits use `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and injected into the router.

pub mod provider;
pub mod store;

pub use provider::ProviderAdapter;
pub use store::{BudgetCounters, BudgetStore};
