// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup wiring for the `tollgate` binary.

pub mod bootstrap;
pub mod shutdown;

pub use bootstrap::Services;
