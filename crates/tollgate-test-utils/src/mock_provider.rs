// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured replies,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tollgate_core::{
    GenerateRequest, GenerationResult, ProviderAdapter, ProviderKind, ProviderTier, TokenUsage,
    TollgateError,
};

/// One scripted reaction to a `generate` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this text.
    Text(String),
    /// Fail with `ProviderUnavailable`.
    Fail(String),
    /// Never answer. Use with a short router timeout.
    Hang,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }
}

/// A mock provider that replays scripted replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty the default
/// reply (`"mock response"` unless changed) is used.
pub struct MockProvider {
    name: String,
    tier: ProviderTier,
    replies: Mutex<VecDeque<MockReply>>,
    default_reply: MockReply,
    delay: Duration,
    usage: TokenUsage,
    cost_usd: f64,
    raw_confidence: Option<f32>,
    healthy: AtomicBool,
    calls: AtomicUsize,
    probes: AtomicUsize,
    received: Mutex<Vec<GenerateRequest>>,
}

impl MockProvider {
    /// Create a mock provider for `tier` with an empty reply queue.
    pub fn new(name: impl Into<String>, tier: ProviderTier) -> Self {
        Self {
            name: name.into(),
            tier,
            replies: Mutex::new(VecDeque::new()),
            default_reply: MockReply::text("mock response"),
            delay: Duration::ZERO,
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
            },
            cost_usd: 0.0,
            raw_confidence: None,
            healthy: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Queue replies, consumed in order.
    pub fn with_replies(mut self, replies: Vec<MockReply>) -> Self {
        self.replies = Mutex::new(VecDeque::from(replies));
        self
    }

    /// Reply used once the queue is empty.
    pub fn with_default(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Always fail, and fail health checks.
    pub fn failing(self) -> Self {
        self.set_healthy(false);
        self.with_default(MockReply::Fail("scripted failure".into()))
    }

    /// Sleep this long before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_usage(mut self, prompt_tokens: u32, completion_tokens: u32) -> Self {
        self.usage = TokenUsage {
            prompt_tokens,
            completion_tokens,
        };
        self
    }

    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = cost_usd;
        self
    }

    pub fn with_confidence(mut self, raw: f32) -> Self {
        self.raw_confidence = Some(raw);
        self
    }

    /// Wrap in an `Arc` for sharing with a router.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Add a reply to the end of the queue.
    pub async fn push_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Result returned by subsequent health checks.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `health_check` calls so far.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Text of every request received, in order.
    pub async fn received_texts(&self) -> Vec<String> {
        self.received
            .lock()
            .await
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    /// Every request received, in order.
    pub async fn received(&self) -> Vec<GenerateRequest> {
        self.received.lock().await.clone()
    }

    async fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ProviderTier {
        self.tier
    }

    fn kind(&self) -> ProviderKind {
        match self.tier {
            ProviderTier::Local => ProviderKind::Local,
            ProviderTier::Fast | ProviderTier::Reasoning => ProviderKind::Remote,
        }
    }

    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerationResult, TollgateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().await.push(request);
        let reply = self.next_reply().await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match reply {
            MockReply::Text(text) => Ok(GenerationResult {
                provider_name: self.name.clone(),
                text,
                token_usage: self.usage,
                latency_ms: self.delay.as_millis() as u64,
                raw_confidence: self.raw_confidence,
                cost_usd: self.cost_usd,
            }),
            MockReply::Fail(message) => Err(TollgateError::provider(&self.name, message)),
            MockReply::Hang => std::future::pending().await,
        }
    }

    async fn health_check(&self) -> Result<(), TollgateError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TollgateError::provider(&self.name, "scripted health check failure"))
        }
    }
}
