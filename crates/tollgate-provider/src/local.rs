// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process fallback provider.
//!
//! [`LocalProvider`] never fails and never costs anything. It is the last
//! resort when every remote candidate is unavailable or the tenant's budget
//! is exhausted.

use std::time::Instant;

use async_trait::async_trait;
use tollgate_core::{
    GenerateRequest, GenerationResult, ProviderAdapter, ProviderKind, ProviderTier,
    TokenUsage, TollgateError,
};

use crate::tokens::count_tokens;

/// Name used for the local provider when configuration does not declare one.
pub const DEFAULT_LOCAL_NAME: &str = "local";

/// Longest excerpt of the query echoed back in a local answer.
const EXCERPT_CHARS: usize = 160;

/// Deterministic in-process responder.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    name: String,
}

impl LocalProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn respond(text: &str) -> String {
        let trimmed = text.trim();
        let mut excerpt: String = trimmed.chars().take(EXCERPT_CHARS).collect();
        if trimmed.chars().count() > EXCERPT_CHARS {
            excerpt.push_str("...");
        }
        format!(
            "The full assistant is unavailable right now, so this is a brief offline reply. \
             Your request was received: \"{excerpt}\". Please try again later for a complete answer."
        )
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_NAME)
    }
}

#[async_trait]
impl ProviderAdapter for LocalProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ProviderTier {
        ProviderTier::Local
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerationResult, TollgateError> {
        let started = Instant::now();
        let text = Self::respond(&request.text);
        let token_usage = TokenUsage {
            prompt_tokens: count_tokens(&request.text),
            completion_tokens: count_tokens(&text),
        };
        Ok(GenerationResult {
            provider_name: self.name.clone(),
            text,
            token_usage,
            latency_ms: started.elapsed().as_millis() as u64,
            raw_confidence: None,
            cost_usd: 0.0,
        })
    }

    async fn health_check(&self) -> Result<(), TollgateError> {
        Ok(())
    }
}
