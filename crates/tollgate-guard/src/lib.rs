// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Safety gates for the Tollgate model router.
//!
//! [`PreGuard`] screens every inbound request before any provider sees it;
//! [`PostGuard`] screens every generated response before it is returned.

pub mod post;
pub mod pre;

pub use post::{PostGuard, REFUSAL_TEMPLATE, REMOVED_ANNOTATION, UNVERIFIED_CAVEAT};
pub use pre::{PreGuard, RedactionAudit};
