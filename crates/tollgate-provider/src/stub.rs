// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned-response provider for development setups without a backend.

use async_trait::async_trait;
use tollgate_config::model::ProviderConfig;
use tollgate_core::{
    GenerateRequest, GenerationResult, ProviderAdapter, ProviderKind, ProviderTier,
    TokenUsage, TollgateError,
};

use crate::pricing::{ModelPricing, calculate_cost};
use crate::tokens::count_tokens;

const DEFAULT_CANNED_RESPONSE: &str = "This is a canned response from a development stub.";

/// Returns the same configured text for every request.
#[derive(Debug, Clone)]
pub struct StubProvider {
    name: String,
    tier: ProviderTier,
    response: String,
    pricing: ModelPricing,
}

impl StubProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            name: config.name.clone(),
            tier: config.tier,
            response: config
                .canned_response
                .clone()
                .unwrap_or_else(|| DEFAULT_CANNED_RESPONSE.to_string()),
            pricing: ModelPricing::from(config),
        }
    }
}

#[async_trait]
impl ProviderAdapter for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ProviderTier {
        self.tier
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Stub
    }

    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerationResult, TollgateError> {
        let token_usage = TokenUsage {
            prompt_tokens: count_tokens(&request.text),
            completion_tokens: count_tokens(&self.response),
        };
        Ok(GenerationResult {
            provider_name: self.name.clone(),
            text: self.response.clone(),
            cost_usd: calculate_cost(&token_usage, &self.pricing),
            token_usage,
            latency_ms: 0,
            raw_confidence: None,
        })
    }

    async fn health_check(&self) -> Result<(), TollgateError> {
        Ok(())
    }
}
