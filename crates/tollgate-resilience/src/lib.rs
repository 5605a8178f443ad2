// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circuit breaker and health probing for the Tollgate model router.
//!
//! [`HealthMonitor`] derives each provider's status from its recent call
//! outcomes; [`HealthProber`] drives recovery of open breakers.

pub mod monitor;
pub mod prober;

pub use monitor::{BreakerSettings, HealthMonitor};
pub use prober::HealthProber;
