// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapters for the Tollgate model router.
//!
//! Three [`ProviderAdapter`](tollgate_core::ProviderAdapter) variants are
//! selected by `kind` in configuration:
//! - [`RemoteProvider`]: OpenAI-compatible chat completions over HTTP
//! - [`LocalProvider`]: deterministic in-process fallback, always available
//! - [`StubProvider`]: canned text for development

pub mod factory;
pub mod local;
pub mod pricing;
pub mod remote;
pub mod stub;
pub mod tokens;

pub use factory::{ProviderEntry, build_provider, build_providers};
pub use local::LocalProvider;
pub use pricing::{ModelPricing, calculate_cost};
pub use remote::RemoteProvider;
pub use stub::StubProvider;
pub use tokens::count_tokens;
