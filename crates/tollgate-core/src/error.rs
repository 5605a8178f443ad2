// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tollgate model router.

use thiserror::Error;

/// The primary error type used across Tollgate crates.
///
/// Only the provider layer and the admin surface ever see these as values.
/// The router converts every provider-layer failure into a fallback or an
/// apology before anything reaches a caller.
#[derive(Debug, Error)]
pub enum TollgateError {
    /// Pre-Guard refused the input (injection, malformed input, hard-deny topic).
    #[error("input rejected: {reason}")]
    InputRejected { reason: String },

    /// A backend could not produce a response (network, non-2xx, bad body).
    #[error("provider {provider} unavailable: {message}")]
    ProviderUnavailable {
        provider: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A backend call exceeded its timeout.
    #[error("provider {provider} timed out after {duration:?}")]
    Timeout {
        provider: String,
        duration: std::time::Duration,
    },

    /// A tenant's daily budget is exhausted in hard enforcement mode.
    #[error("budget exceeded for tenant {tenant}")]
    BudgetExceeded { tenant: String },

    /// Post-Guard blocked a generated response.
    #[error("response blocked by safety policy: {category}")]
    SafetyBlocked { category: String },

    /// Configuration errors (missing credentials, invalid thresholds).
    #[error("configuration error: {0}")]
    Config(String),

    /// Budget counter store errors.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Admin operation attempted without a valid admin credential.
    #[error("unauthorized")]
    Unauthorized,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TollgateError {
    /// Convenience constructor for provider failures without an underlying source.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        TollgateError::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error came from the provider layer (and is therefore retryable
    /// against a different provider).
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            TollgateError::ProviderUnavailable { .. } | TollgateError::Timeout { .. }
        )
    }
}
