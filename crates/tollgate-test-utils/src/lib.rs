// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tollgate integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted provider with replies, failures and delays
//! - [`TestHarness`] - Router wired to mocks, in-memory budget and a fixed clock

pub mod harness;
pub mod mock_provider;

pub use harness::{FixedClock, TestHarness, TestHarnessBuilder};
pub use mock_provider::{MockProvider, MockReply};
