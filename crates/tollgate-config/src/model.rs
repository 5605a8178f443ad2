// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tollgate model router.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tollgate_core::{EnforcementMode, ProviderKind, ProviderTier, RiskCategory};

/// Top-level Tollgate configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TollgateConfig {
    /// Backend providers, one `[[providers]]` table each.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Routing thresholds and retry policy.
    #[serde(default)]
    pub router: RouterConfig,

    /// Per-tenant daily budget limits.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Circuit breaker tuning.
    #[serde(default)]
    pub health: HealthConfig,

    /// Pre-Guard and Post-Guard policy.
    #[serde(default)]
    pub guard: GuardConfig,

    /// HTTP surface settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging and metrics settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// One backend provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique provider name.
    pub name: String,

    /// Implementation variant: `remote`, `local` or `stub`.
    pub kind: ProviderKind,

    /// Capability tier: `fast`, `reasoning` or `local`.
    pub tier: ProviderTier,

    /// Lower values are tried first within a tier.
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Base URL of an OpenAI-compatible API (remote only).
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model identifier sent to the remote API.
    #[serde(default)]
    pub model: Option<String>,

    /// Completion token cap per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Bearer credential. Prefer `api_key_env` outside of development.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Name of an environment variable holding the bearer credential.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Price per 1000 prompt tokens in USD.
    #[serde(default)]
    pub usd_per_1k_prompt: f64,

    /// Price per 1000 completion tokens in USD.
    #[serde(default)]
    pub usd_per_1k_completion: f64,

    /// Fixed response text (stub only).
    #[serde(default)]
    pub canned_response: Option<String>,
}

fn default_priority() -> u32 {
    100
}

fn default_max_tokens() -> u32 {
    1024
}

/// Routing thresholds and retry policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Confidence below this triggers one escalation hop.
    #[serde(default = "default_conf_threshold")]
    pub conf_threshold: f32,

    /// Minimum token overlap for a claim to count as supported.
    #[serde(default = "default_support_threshold")]
    pub support_threshold: f32,

    /// Chain-of-thought budget passed to reasoning-tier providers.
    #[serde(default = "default_max_cot_tokens")]
    pub max_cot_tokens: u32,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Extra attempts after the first failed provider.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Queries longer than this many characters are classified complex.
    #[serde(default = "default_complexity_length_threshold")]
    pub complexity_length_threshold: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            conf_threshold: default_conf_threshold(),
            support_threshold: default_support_threshold(),
            max_cot_tokens: default_max_cot_tokens(),
            provider_timeout_ms: default_provider_timeout_ms(),
            retry_budget: default_retry_budget(),
            complexity_length_threshold: default_complexity_length_threshold(),
        }
    }
}

fn default_conf_threshold() -> f32 {
    0.62
}

fn default_support_threshold() -> f32 {
    0.55
}

fn default_max_cot_tokens() -> u32 {
    2048
}

fn default_provider_timeout_ms() -> u64 {
    15_000
}

fn default_retry_budget() -> u32 {
    2
}

fn default_complexity_length_threshold() -> usize {
    400
}

/// Backend for the daily budget counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStoreKind {
    /// Process-local counters, lost on restart.
    #[default]
    Memory,
    /// SQLite file at `budget.database_path`.
    Sqlite,
}

/// Per-tenant daily budget settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    /// Daily token limit. `None` means unlimited.
    #[serde(default)]
    pub max_tokens_per_day: Option<u64>,

    /// Daily spend limit in USD. `None` means unlimited.
    #[serde(default)]
    pub max_usd_per_day: Option<f64>,

    /// `hard` forces exhausted tenants onto the local fallback, `warn` only logs.
    #[serde(default)]
    pub enforcement: EnforcementMode,

    /// Counter store backend.
    #[serde(default)]
    pub store: BudgetStoreKind,

    /// SQLite database path when `store = "sqlite"`.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Per-tenant overrides keyed by tenant id.
    #[serde(default)]
    pub tenants: BTreeMap<String, TenantBudgetConfig>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_day: None,
            max_usd_per_day: None,
            enforcement: EnforcementMode::default(),
            store: BudgetStoreKind::default(),
            database_path: default_database_path(),
            tenants: BTreeMap::new(),
        }
    }
}

fn default_database_path() -> String {
    "tollgate-budget.db".to_string()
}

/// Budget override for one tenant. Unset fields inherit from `[budget]`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantBudgetConfig {
    #[serde(default)]
    pub max_tokens_per_day: Option<u64>,

    #[serde(default)]
    pub max_usd_per_day: Option<f64>,

    #[serde(default)]
    pub enforcement: Option<EnforcementMode>,
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Number of recent call outcomes kept per provider.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Samples required before the degraded failure rate applies.
    #[serde(default = "default_min_calls")]
    pub min_calls: usize,

    /// Failure rate at which a provider becomes degraded.
    #[serde(default = "default_degraded_failure_rate")]
    pub degraded_failure_rate: f32,

    /// Failure rate at which a provider becomes unhealthy.
    #[serde(default = "default_unhealthy_failure_rate")]
    pub unhealthy_failure_rate: f32,

    /// Consecutive failures tolerated before the breaker opens.
    #[serde(default = "default_consecutive_failure_cap")]
    pub consecutive_failure_cap: u32,

    /// Time an unhealthy provider waits before it is probed.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// How often the background prober wakes up.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            min_calls: default_min_calls(),
            degraded_failure_rate: default_degraded_failure_rate(),
            unhealthy_failure_rate: default_unhealthy_failure_rate(),
            consecutive_failure_cap: default_consecutive_failure_cap(),
            cooldown_ms: default_cooldown_ms(),
            probe_interval_ms: default_probe_interval_ms(),
        }
    }
}

fn default_window_size() -> usize {
    20
}

fn default_min_calls() -> usize {
    5
}

fn default_degraded_failure_rate() -> f32 {
    0.5
}

fn default_unhealthy_failure_rate() -> f32 {
    0.8
}

fn default_consecutive_failure_cap() -> u32 {
    5
}

fn default_cooldown_ms() -> u64 {
    30_000
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

/// Pre-Guard and Post-Guard policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Phrases added to the built-in prompt-injection list.
    #[serde(default)]
    pub extra_injection_phrases: Vec<String>,

    /// Phrases added to the built-in hard-violation list for outputs.
    #[serde(default)]
    pub extra_hard_violation_phrases: Vec<String>,

    /// Risk categories that block the request outright.
    #[serde(default = "default_hard_deny")]
    pub hard_deny: Vec<RiskCategory>,

    /// Toxicity score at which offending spans are stripped.
    #[serde(default = "default_toxicity_soft_threshold")]
    pub toxicity_soft_threshold: f32,

    /// Toxicity score at which the response is blocked.
    #[serde(default = "default_toxicity_hard_threshold")]
    pub toxicity_hard_threshold: f32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            extra_injection_phrases: Vec::new(),
            extra_hard_violation_phrases: Vec::new(),
            hard_deny: default_hard_deny(),
            toxicity_soft_threshold: default_toxicity_soft_threshold(),
            toxicity_hard_threshold: default_toxicity_hard_threshold(),
        }
    }
}

fn default_hard_deny() -> Vec<RiskCategory> {
    vec![RiskCategory::Weapons]
}

fn default_toxicity_soft_threshold() -> f32 {
    0.3
}

fn default_toxicity_hard_threshold() -> f32 {
    1.0
}

/// HTTP surface settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for `/admin`. `None` rejects every admin request.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Allowed CORS origins. Empty disables cross-origin access.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_token: None,
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Logging and metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_prometheus")]
    pub prometheus: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus: default_prometheus(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_prometheus() -> bool {
    true
}
