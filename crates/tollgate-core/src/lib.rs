// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tollgate model router.
//!
//! This crate provides the error type, the shared request/response types and
//! the two trait seams (provider adapters and budget counter stores) used
//! throughout the workspace.

pub mod error;
pub mod traits;
pub mod types;

pub use error::TollgateError;
pub use traits::{BudgetCounters, BudgetStore, ProviderAdapter};
pub use types::{
    BlockReason, BudgetState, BudgetStatus, ComplexityClass, ConfidenceScore, EnforcementMode,
    GenerateRequest, GenerationResult, GroundingContext, GuardStage, HealthStatus, PiiKind,
    ProviderHealth, ProviderKind, ProviderTier, Redaction, Request, ResetScope, RiskCategory,
    RoutingDecision, SafetyVerdict, SanitizedRequest, TenantId, TokenUsage, ViolationCategory,
};
