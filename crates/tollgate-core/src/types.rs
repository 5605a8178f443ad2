// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the guards, the router, and the adapters.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifies the tenant a request is billed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    /// Tenant used when a caller does not name one.
    pub const DEFAULT: &'static str = "default";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        TenantId(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        TenantId(value.to_string())
    }
}

/// Capability tier of a backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderTier {
    /// Cheap, low-latency remote models.
    Fast,
    /// Slower, higher-capability remote models.
    Reasoning,
    /// Always-available in-process compute used as the last resort.
    Local,
}

impl ProviderTier {
    /// Ordering used for escalation. Higher is more capable.
    pub fn rank(self) -> u8 {
        match self {
            ProviderTier::Local => 0,
            ProviderTier::Fast => 1,
            ProviderTier::Reasoning => 2,
        }
    }

    pub fn is_remote(self) -> bool {
        !matches!(self, ProviderTier::Local)
    }
}

/// How a provider is implemented. Selected by configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible HTTP endpoint.
    Remote,
    /// In-process deterministic responder.
    Local,
    /// Canned responses for development.
    Stub,
}

/// Advisory complexity class of a query.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComplexityClass {
    Simple,
    Complex,
}

impl ComplexityClass {
    /// Tier a request of this class starts on.
    pub fn initial_tier(self) -> ProviderTier {
        match self {
            ComplexityClass::Simple => ProviderTier::Fast,
            ComplexityClass::Complex => ProviderTier::Reasoning,
        }
    }
}

/// Kinds of personally identifiable information the Pre-Guard redacts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiKind {
    Email,
    Phone,
    Ssn,
    Card,
}

impl PiiKind {
    /// Placeholder substituted for a match, e.g. `<REDACTED:EMAIL>`.
    pub fn placeholder(self) -> String {
        format!("<REDACTED:{self}>")
    }
}

/// Topic categories tagged on inbound text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Illegal,
    SelfHarm,
    Weapons,
    Extremism,
}

/// Why the Pre-Guard blocked a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "category")]
pub enum BlockReason {
    PromptInjection,
    MalformedInput,
    HardDeny(RiskCategory),
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::PromptInjection => f.write_str("prompt_injection"),
            BlockReason::MalformedInput => f.write_str("malformed_input"),
            BlockReason::HardDeny(category) => write!(f, "hard_deny:{category}"),
        }
    }
}

/// Output policy violations detected by the Post-Guard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    /// Step-by-step instructions for serious harm.
    HarmfulInstructions,
    /// Explicitly disallowed content.
    DisallowedContent,
    /// Severity-weighted toxic language.
    Toxicity,
    /// Claims not supported by the supplied grounding context.
    UnverifiedClaims,
}

impl ViolationCategory {
    /// Hard violations always block.
    pub fn is_hard(self) -> bool {
        matches!(
            self,
            ViolationCategory::HarmfulInstructions | ViolationCategory::DisallowedContent
        )
    }
}

/// The guard stage that changed what the caller receives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GuardStage {
    PreGuard,
    PostGuard,
}

/// Health of one provider as seen by the circuit breaker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    /// Recovering: one probe succeeded, one more success closes the breaker.
    HalfOpen,
}

impl HealthStatus {
    /// Sort key for candidate ordering. Lower is preferred.
    pub fn selection_rank(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::HalfOpen => 1,
            HealthStatus::Degraded => 2,
            HealthStatus::Unhealthy => 3,
        }
    }
}

/// Budget enforcement policy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Exhausted tenants are forced onto the local fallback.
    #[default]
    Hard,
    /// Limits only produce warnings.
    Warn,
}

/// Result of a budget check.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Ok,
    SoftExceeded,
    HardExceeded,
}

/// Upstream retrieval context used by the citation check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingContext {
    /// Retrieved passages the answer should be grounded in.
    pub passages: Vec<String>,
    /// Whether the caller requires the answer to be grounded.
    pub required: bool,
}

/// An inbound natural-language request. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    id: String,
    raw_text: String,
    tenant_id: TenantId,
    created_at: DateTime<Utc>,
    grounding: Option<GroundingContext>,
}

impl Request {
    pub fn new(tenant_id: TenantId, raw_text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            raw_text: raw_text.into(),
            tenant_id,
            created_at: Utc::now(),
            grounding: None,
        }
    }

    /// Build a request from undecoded bytes. Invalid UTF-8 is decoded lossily
    /// so the Pre-Guard sees the replacement characters and blocks the input.
    pub fn from_bytes(tenant_id: TenantId, raw: &[u8]) -> Self {
        Self::new(tenant_id, String::from_utf8_lossy(raw).into_owned())
    }

    /// Attach grounding context from a retrieval collaborator.
    pub fn with_grounding(mut self, grounding: GroundingContext) -> Self {
        self.grounding = Some(grounding);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn grounding(&self) -> Option<&GroundingContext> {
        self.grounding.as_ref()
    }
}

/// Location of a placeholder in sanitized text. Never carries the original value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redaction {
    pub kind: PiiKind,
    /// Byte offset of the placeholder in the sanitized text.
    pub start: usize,
    /// Byte offset one past the placeholder.
    pub end: usize,
}

/// A request after Pre-Guard screening. Produced once, never mutated.
#[derive(Debug, Clone)]
pub struct SanitizedRequest {
    request: Request,
    text: String,
    redactions: Vec<Redaction>,
    risk_flags: BTreeSet<RiskCategory>,
    block_reason: Option<BlockReason>,
}

impl SanitizedRequest {
    pub fn new(
        request: Request,
        text: String,
        redactions: Vec<Redaction>,
        risk_flags: BTreeSet<RiskCategory>,
        block_reason: Option<BlockReason>,
    ) -> Self {
        Self {
            request,
            text,
            redactions,
            risk_flags,
            block_reason,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The text forwarded to providers (PII replaced by placeholders).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn redactions(&self) -> &[Redaction] {
        &self.redactions
    }

    pub fn risk_flags(&self) -> &BTreeSet<RiskCategory> {
        &self.risk_flags
    }

    pub fn blocked(&self) -> bool {
        self.block_reason.is_some()
    }

    pub fn block_reason(&self) -> Option<BlockReason> {
        self.block_reason
    }
}

/// Token counts reported for one generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens as u64 + self.completion_tokens as u64
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(rhs.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(rhs.completion_tokens);
    }
}

/// What the router hands a provider adapter.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub request_id: String,
    /// Sanitized text. Raw input never reaches an adapter.
    pub text: String,
    pub max_tokens: u32,
    /// Chain-of-thought budget for reasoning-tier backends.
    pub reasoning_tokens: Option<u32>,
}

/// A response produced by one provider.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub provider_name: String,
    pub text: String,
    pub token_usage: TokenUsage,
    pub latency_ms: u64,
    /// Backend-reported confidence, when the backend offers one.
    pub raw_confidence: Option<f32>,
    pub cost_usd: f64,
}

/// Post-hoc confidence in a generated response, clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct ConfidenceScore(f32);

impl ConfidenceScore {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

/// Post-Guard outcome.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyVerdict {
    pub passed: bool,
    pub violations: BTreeSet<ViolationCategory>,
    /// Text safe to return: the refusal template when blocked.
    pub sanitized_text: String,
    pub toxicity_score: f32,
    /// An unverifiable-claim caveat was appended.
    pub caveat_appended: bool,
    /// The text differs from the input (stripped spans, caveat, refusal).
    pub altered: bool,
}

/// How the router settled a request.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    pub provider_name: String,
    pub reason: String,
    pub complexity_class: ComplexityClass,
    pub escalated: bool,
    /// Every provider attempted, in order, including failures.
    pub attempt_chain: Vec<String>,
}

/// Snapshot of one provider's circuit-breaker state.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub failure_rate: f32,
    pub last_latency_ms: Option<u64>,
    pub avg_latency_ms: Option<f64>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Budget counters for one tenant on one UTC day.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetState {
    pub tenant: TenantId,
    pub day: NaiveDate,
    pub tokens_used: u64,
    pub usd_used: f64,
    pub limit_tokens: Option<u64>,
    pub limit_usd: Option<f64>,
    pub enforcement_mode: EnforcementMode,
}

/// Which budget counters `reset` clears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetScope {
    Tenant(TenantId),
    All,
}
