// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for language-model backends (remote, local, stub).

use async_trait::async_trait;

use crate::error::TollgateError;
use crate::types::{GenerateRequest, GenerationResult, ProviderKind, ProviderTier};

/// Adapter for one backend language-model service.
///
/// Implementations receive only sanitized text and must map every transport
/// or protocol failure to [`TollgateError::ProviderUnavailable`]. Timeouts are
/// enforced by the caller.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Unique provider name, used in attempt chains and health reports.
    fn name(&self) -> &str;

    /// Capability tier this provider serves.
    fn tier(&self) -> ProviderTier;

    /// Implementation variant.
    fn kind(&self) -> ProviderKind;

    /// Produces a response for the sanitized request.
    async fn generate(&self, request: GenerateRequest)
    -> Result<GenerationResult, TollgateError>;

    /// Cheap liveness probe used by the health prober.
    async fn health_check(&self) -> Result<(), TollgateError>;
}
