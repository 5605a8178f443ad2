// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request orchestration: guard, budget check, provider selection with retry,
//! escalation, local fallback and budget commit.
//!
//! Pipeline states: `init -> pre_guarded -> routed -> generated ->
//! post_guarded -> {returned | escalated | fallback | blocked}`. Every
//! transition is logged at debug level. [`Router::handle`] never fails: every
//! provider-layer error degrades to a retry, the local fallback or a fixed
//! apology.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tollgate_config::TollgateConfig;
use tollgate_core::{
    BudgetState, BudgetStatus, ConfidenceScore, GenerateRequest,
    GenerationResult, GuardStage, HealthStatus, ProviderTier, Request, RoutingDecision,
    SanitizedRequest, TenantId, TokenUsage, TollgateError, ViolationCategory,
};
use tollgate_cost::BudgetTracker;
use tollgate_guard::{PostGuard, PreGuard};
use tollgate_provider::ProviderEntry;
use tollgate_resilience::HealthMonitor;
use tracing::{debug, info, warn};

use crate::classifier::ComplexityClassifier;
use crate::confidence::ConfidenceEstimator;
use crate::thresholds::{RouterThresholds, SharedThresholds};

/// Returned when the Pre-Guard blocks a request.
pub const POLICY_BLOCK_MESSAGE: &str =
    "This request can't be processed because it conflicts with the usage policy.";

/// Returned when no provider, including the local fallback, produced an answer.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, no assistant is available to answer right now. Please try again shortly.";

/// Provider name recorded when no provider answered.
pub const NO_PROVIDER: &str = "none";

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid think-block pattern"));

/// Remove chain-of-thought blocks. An unclosed `<think>` drops everything after it.
pub fn strip_reasoning(text: &str) -> String {
    let stripped = THINK_BLOCK.replace_all(text, "");
    let lower = stripped.to_ascii_lowercase();
    let kept = match lower.find("<think>") {
        Some(idx) => &stripped[..idx],
        None => &stripped[..],
    };
    kept.trim().to_string()
}

/// What the router hands back for one request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub request_id: String,
    /// Post-Guard output, the policy message, or the apology.
    pub answer: String,
    pub decision: RoutingDecision,
    pub confidence: ConfidenceScore,
    pub blocked: bool,
    /// `prompt_injection`, `hard_deny:weapons`, or a Post-Guard category.
    pub block_reason: Option<String>,
    pub altered_by: Option<GuardStage>,
    pub violations: BTreeSet<ViolationCategory>,
    /// Sum over every successful attempt.
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub budget_status: BudgetStatus,
}

impl ChatOutcome {
    /// Why the request was not answered by a remote provider, as an error value.
    ///
    /// Guard blocks take precedence over a hard budget fallback. Provider
    /// failures are not reported here: they end in the fallback or the apology.
    pub fn refusal(&self, tenant: &TenantId) -> Option<TollgateError> {
        let reason = self.block_reason.clone().unwrap_or_default();
        match (self.blocked, self.altered_by) {
            (true, Some(GuardStage::PreGuard)) => Some(TollgateError::InputRejected { reason }),
            (true, _) => Some(TollgateError::SafetyBlocked { category: reason }),
            (false, _) if self.budget_status == BudgetStatus::HardExceeded => {
                Some(TollgateError::BudgetExceeded {
                    tenant: tenant.to_string(),
                })
            }
            (false, _) => None,
        }
    }
}

/// Provider attempts made for one request.
#[derive(Debug, Default)]
struct Ledger {
    attempt_chain: Vec<String>,
    usage: TokenUsage,
    cost_usd: f64,
}

/// The orchestrator. Stateless per request; share it behind an `Arc`.
pub struct Router {
    pre_guard: PreGuard,
    post_guard: PostGuard,
    classifier: ComplexityClassifier,
    estimator: ConfidenceEstimator,
    providers: Vec<ProviderEntry>,
    budget: Arc<BudgetTracker>,
    health: Arc<HealthMonitor>,
    thresholds: Arc<SharedThresholds>,
    provider_timeout: Duration,
    retry_budget: u32,
}

impl Router {
    /// Build a router over already constructed providers and shared state.
    ///
    /// Every provider is registered with the health monitor.
    pub fn new(
        config: &TollgateConfig,
        providers: Vec<ProviderEntry>,
        budget: Arc<BudgetTracker>,
        health: Arc<HealthMonitor>,
    ) -> Result<Self, TollgateError> {
        let thresholds = SharedThresholds::new(RouterThresholds::from(&config.router))?;
        for entry in &providers {
            health.register(entry.adapter.name());
        }
        Ok(Self {
            pre_guard: PreGuard::new(&config.guard),
            post_guard: PostGuard::new(&config.guard),
            classifier: ComplexityClassifier::new(config.router.complexity_length_threshold),
            estimator: ConfidenceEstimator,
            providers,
            budget,
            health,
            thresholds: Arc::new(thresholds),
            provider_timeout: Duration::from_millis(config.router.provider_timeout_ms),
            retry_budget: config.router.retry_budget,
        })
    }

    pub fn providers(&self) -> &[ProviderEntry] {
        &self.providers
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn budget(&self) -> &Arc<BudgetTracker> {
        &self.budget
    }

    pub fn thresholds(&self) -> &Arc<SharedThresholds> {
        &self.thresholds
    }

    /// True when at least one remote-tier provider is selectable.
    pub fn router_active(&self) -> bool {
        self.providers
            .iter()
            .filter(|e| e.adapter.tier().is_remote())
            .any(|e| self.health.is_selectable(e.adapter.name()))
    }

    /// Remote candidates for a request starting on `initial`, best first.
    ///
    /// Order: initial tier before the other remote tier, then health
    /// (healthy, half-open, degraded), configured priority and rolling
    /// average latency. Unhealthy providers are excluded. Providers with no
    /// latency samples sort as fastest so they get traffic.
    pub fn candidate_chain(&self, initial: ProviderTier) -> Vec<&ProviderEntry> {
        let mut candidates: Vec<(&ProviderEntry, HealthStatus, f64)> = self
            .providers
            .iter()
            .filter(|e| e.adapter.tier().is_remote())
            .map(|e| {
                let name = e.adapter.name();
                (
                    e,
                    self.health.status(name),
                    self.health.avg_latency_ms(name).unwrap_or(0.0),
                )
            })
            .filter(|(_, status, _)| *status != HealthStatus::Unhealthy)
            .collect();

        candidates.sort_by(|(a, sa, la), (b, sb, lb)| {
            (a.adapter.tier() != initial)
                .cmp(&(b.adapter.tier() != initial))
                .then(sa.selection_rank().cmp(&sb.selection_rank()))
                .then(a.priority.cmp(&b.priority))
                .then(la.total_cmp(lb))
        });
        candidates.into_iter().map(|(e, _, _)| e).collect()
    }

    /// Run the pipeline, or return `None` if `cancel` fires first.
    ///
    /// A cancelled request drops its in-flight provider call and commits no usage.
    pub async fn handle_cancellable(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Option<ChatOutcome> {
        let request_id = request.id().to_string();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(request_id = %request_id, "request cancelled");
                None
            }
            outcome = self.handle(request) => Some(outcome),
        }
    }

    /// Run the full pipeline for one request.
    pub async fn handle(&self, request: Request) -> ChatOutcome {
        let started = Instant::now();
        let thresholds = *self.thresholds.load();
        let request_id = request.id().to_string();
        let tenant = request.tenant_id().clone();
        debug!(request_id = %request_id, tenant = %tenant, state = "init", "request received");

        let (sanitized, audit) = self.pre_guard.screen_with_audit(request);
        debug!(request_id = %request_id, state = "pre_guarded", audit = ?audit,
            risk_flags = ?sanitized.risk_flags(), "pre-guard complete");
        drop(audit);

        let classification = self.classifier.classify(sanitized.text());

        if let Some(reason) = sanitized.block_reason() {
            debug!(request_id = %request_id, state = "blocked", reason = %reason, "pre-guard blocked request");
            let outcome = ChatOutcome {
                request_id,
                answer: POLICY_BLOCK_MESSAGE.to_string(),
                decision: RoutingDecision {
                    provider_name: NO_PROVIDER.to_string(),
                    reason: format!("blocked: {reason}"),
                    complexity_class: classification.class,
                    escalated: false,
                    attempt_chain: Vec::new(),
                },
                confidence: ConfidenceScore::default(),
                blocked: true,
                block_reason: Some(reason.to_string()),
                altered_by: Some(GuardStage::PreGuard),
                violations: BTreeSet::new(),
                usage: TokenUsage::default(),
                cost_usd: 0.0,
                latency_ms: elapsed_ms(started),
                budget_status: BudgetStatus::Ok,
            };
            tollgate_prometheus::record_block(GuardStage::PreGuard);
            self.emit(&outcome, &tenant, "blocked");
            return outcome;
        }

        let budget_status = match self.budget.check(&tenant).await {
            Ok(status) => status,
            Err(e) => {
                warn!(tenant = %tenant, error = %e, "budget check failed, treating as within budget");
                BudgetStatus::Ok
            }
        };
        if budget_status == BudgetStatus::SoftExceeded {
            tollgate_prometheus::record_budget_warning(tenant.as_str());
        }

        let class = classification.class;
        let mut reason = format!("{class}: {}", classification.reason);
        let mut ledger = Ledger::default();
        let mut label = "returned";
        let mut escalated = false;

        let remote = if budget_status == BudgetStatus::HardExceeded {
            reason.push_str("; fallback: budget exhausted");
            tollgate_prometheus::record_fallback("budget");
            None
        } else {
            let answered = self
                .try_chain(&sanitized, class.initial_tier(), &thresholds, &mut ledger)
                .await;
            if answered.is_none() {
                reason.push_str("; fallback: remote providers unavailable");
                tollgate_prometheus::record_fallback("providers_failed");
            }
            answered
        };

        let settled = match remote {
            Some(answer) => Some(answer),
            None => {
                label = "fallback";
                debug!(request_id = %request_id, state = "fallback", "routing to local fallback");
                self.fallback(&sanitized, &thresholds, &mut ledger).await
            }
        };

        let (text, provider_name, confidence) = match settled {
            Some((mut result, tier)) => {
                result.text = strip_reasoning(&result.text);
                let mut confidence = self.estimator.score(class, tier, &result);
                debug!(request_id = %request_id, state = "generated", provider = %result.provider_name,
                    confidence = confidence.value(), "generation complete");

                if label != "fallback" && confidence.value() < thresholds.conf_threshold {
                    match self
                        .escalate(&sanitized, tier, &thresholds, &mut ledger)
                        .await
                    {
                        Some((mut better, better_tier)) => {
                            better.text = strip_reasoning(&better.text);
                            tollgate_prometheus::record_escalation(&result.provider_name, &better.provider_name);
                            reason.push_str(&format!(
                                "; escalated: confidence {:.2} below {:.2}",
                                confidence.value(),
                                thresholds.conf_threshold
                            ));
                            confidence = self.estimator.score(class, better_tier, &better);
                            result = better;
                            escalated = true;
                            label = "escalated";
                            debug!(request_id = %request_id, state = "escalated", provider = %result.provider_name,
                                confidence = confidence.value(), "escalation complete");
                        }
                        None if tier == ProviderTier::Reasoning => {
                            reason.push_str("; low confidence on top tier");
                        }
                        None => reason.push_str("; escalation unavailable, kept original"),
                    }
                }
                (result.text, result.provider_name, confidence)
            }
            None => {
                warn!(request_id = %request_id, "local fallback failed, returning apology");
                reason.push_str("; apology: fallback failed");
                (APOLOGY_MESSAGE.to_string(), NO_PROVIDER.to_string(), ConfidenceScore::default())
            }
        };

        let verdict = self.post_guard.verify(
            &text,
            sanitized.risk_flags(),
            sanitized.request().grounding(),
            thresholds.support_threshold,
        );
        debug!(request_id = %request_id, state = "post_guarded", passed = verdict.passed,
            violations = ?verdict.violations, "post-guard complete");

        let altered_by = if !verdict.passed || verdict.altered {
            Some(GuardStage::PostGuard)
        } else if !sanitized.redactions().is_empty() {
            Some(GuardStage::PreGuard)
        } else {
            None
        };
        let block_reason = if verdict.passed {
            None
        } else {
            tollgate_prometheus::record_block(GuardStage::PostGuard);
            label = "blocked";
            verdict
                .violations
                .iter()
                .find(|v| v.is_hard())
                .or_else(|| verdict.violations.first())
                .map(ToString::to_string)
        };

        self.commit(&tenant, &ledger).await;

        let outcome = ChatOutcome {
            request_id,
            answer: verdict.sanitized_text,
            decision: RoutingDecision {
                provider_name,
                reason,
                complexity_class: class,
                escalated,
                attempt_chain: ledger.attempt_chain,
            },
            confidence,
            blocked: !verdict.passed,
            block_reason,
            altered_by,
            violations: verdict.violations,
            usage: ledger.usage,
            cost_usd: ledger.cost_usd,
            latency_ms: elapsed_ms(started),
            budget_status,
        };
        self.emit(&outcome, &tenant, label);
        outcome
    }

    /// Try remote candidates in order, spending at most `1 + retry_budget` attempts.
    async fn try_chain(
        &self,
        sanitized: &SanitizedRequest,
        initial: ProviderTier,
        thresholds: &RouterThresholds,
        ledger: &mut Ledger,
    ) -> Option<(GenerationResult, ProviderTier)> {
        let max_attempts = 1 + self.retry_budget as usize;
        for entry in self.candidate_chain(initial).into_iter().take(max_attempts) {
            debug!(request_id = %sanitized.request().id(), state = "routed",
                provider = %entry.adapter.name(), "calling provider");
            if let Ok(result) = self.call(entry, sanitized, thresholds, ledger).await {
                return Some((result, entry.adapter.tier()));
            }
        }
        None
    }

    /// One attempt on the best available provider of the next-higher tier.
    async fn escalate(
        &self,
        sanitized: &SanitizedRequest,
        from: ProviderTier,
        thresholds: &RouterThresholds,
        ledger: &mut Ledger,
    ) -> Option<(GenerationResult, ProviderTier)> {
        let target_tier = match from {
            ProviderTier::Fast => ProviderTier::Reasoning,
            ProviderTier::Reasoning | ProviderTier::Local => return None,
        };
        let target = self
            .candidate_chain(target_tier)
            .into_iter()
            .find(|e| e.adapter.tier() == target_tier)?;
        self.call(target, sanitized, thresholds, ledger)
            .await
            .ok()
            .map(|result| (result, target_tier))
    }

    /// Local providers in priority order until one answers.
    async fn fallback(
        &self,
        sanitized: &SanitizedRequest,
        thresholds: &RouterThresholds,
        ledger: &mut Ledger,
    ) -> Option<(GenerationResult, ProviderTier)> {
        let mut locals: Vec<&ProviderEntry> = self
            .providers
            .iter()
            .filter(|e| e.adapter.tier() == ProviderTier::Local)
            .collect();
        locals.sort_by_key(|e| e.priority);
        for entry in locals {
            if let Ok(result) = self.call(entry, sanitized, thresholds, ledger).await {
                return Some((result, ProviderTier::Local));
            }
        }
        None
    }

    /// Call one provider under the per-call timeout and record the outcome.
    async fn call(
        &self,
        entry: &ProviderEntry,
        sanitized: &SanitizedRequest,
        thresholds: &RouterThresholds,
        ledger: &mut Ledger,
    ) -> Result<GenerationResult, TollgateError> {
        let name = entry.adapter.name();
        ledger.attempt_chain.push(name.to_string());

        let tier = entry.adapter.tier();
        let request = GenerateRequest {
            request_id: sanitized.request().id().to_string(),
            text: sanitized.text().to_string(),
            max_tokens: entry.max_tokens,
            reasoning_tokens: (tier == ProviderTier::Reasoning).then_some(thresholds.max_cot_tokens),
        };

        let started = Instant::now();
        let outcome = match timeout(self.provider_timeout, entry.adapter.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(TollgateError::Timeout {
                provider: name.to_string(),
                duration: self.provider_timeout,
            }),
        };

        match outcome {
            Ok(result) => {
                self.health.record_success(name, elapsed_ms(started));
                tollgate_prometheus::record_tokens(name, &result.token_usage);
                ledger.usage += result.token_usage;
                if result.cost_usd.is_finite() && result.cost_usd > 0.0 {
                    ledger.cost_usd += result.cost_usd;
                }
                Ok(result)
            }
            Err(e) => {
                self.health.record_failure(name);
                tollgate_prometheus::record_provider_failure(name);
                warn!(request_id = %sanitized.request().id(), provider = %name, error = %e, "provider attempt failed");
                Err(e)
            }
        }
    }

    async fn commit(&self, tenant: &TenantId, ledger: &Ledger) {
        let tokens = ledger.usage.total();
        if tokens == 0 && ledger.cost_usd <= 0.0 {
            return;
        }
        match self.budget.commit(tenant, tokens, ledger.cost_usd).await {
            Ok(state) => {
                tollgate_prometheus::record_cost(tenant.as_str(), ledger.cost_usd);
                tollgate_prometheus::set_budget_used(tenant.as_str(), utilization(&state));
            }
            Err(e) => warn!(tenant = %tenant, error = %e, "failed to commit usage"),
        }
    }

    /// The per-request decision record plus request-level metrics.
    fn emit(&self, outcome: &ChatOutcome, tenant: &TenantId, label: &'static str) {
        info!(
            target: "tollgate::decision",
            request_id = %outcome.request_id,
            tenant = %tenant,
            provider = %outcome.decision.provider_name,
            complexity = %outcome.decision.complexity_class,
            confidence = outcome.confidence.value(),
            reason = %outcome.decision.reason,
            escalated = outcome.decision.escalated,
            attempt_chain = ?outcome.decision.attempt_chain,
            prompt_tokens = outcome.usage.prompt_tokens,
            completion_tokens = outcome.usage.completion_tokens,
            cost_usd = outcome.cost_usd,
            latency_ms = outcome.latency_ms,
            blocked = outcome.blocked,
            altered_by = ?outcome.altered_by,
            budget_status = %outcome.budget_status,
            outcome = label,
            "routing decision"
        );
        if let Some(refusal) = outcome.refusal(tenant) {
            info!(
                target: "tollgate::decision",
                request_id = %outcome.request_id,
                tenant = %tenant,
                error = %refusal,
                "request not served remotely"
            );
        }
        tollgate_prometheus::record_request(label);
        tollgate_prometheus::record_latency(outcome.latency_ms as f64 / 1000.0);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Highest fraction of any configured limit used today.
fn utilization(state: &BudgetState) -> f64 {
    let tokens = state
        .limit_tokens
        .filter(|l| *l > 0)
        .map(|l| state.tokens_used as f64 / l as f64);
    let usd = state
        .limit_usd
        .filter(|l| *l > 0.0)
        .map(|l| state.usd_used / l);
    tokens.into_iter().chain(usd).fold(0.0, f64::max)
}
