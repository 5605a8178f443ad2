// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-provider pricing and cost calculation.
//!
//! Prices come from configuration (`usd_per_1k_prompt`,
//! `usd_per_1k_completion`) rather than a built-in model table, since the
//! router fronts arbitrary OpenAI-compatible endpoints.

use tollgate_config::model::ProviderConfig;
use tollgate_core::TokenUsage;

/// Provider pricing in USD per thousand tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelPricing {
    /// Cost per thousand prompt tokens.
    pub prompt_per_1k: f64,
    /// Cost per thousand completion tokens.
    pub completion_per_1k: f64,
}

impl ModelPricing {
    /// Free pricing used by the local responder.
    pub const FREE: ModelPricing = ModelPricing {
        prompt_per_1k: 0.0,
        completion_per_1k: 0.0,
    };
}

impl From<&ProviderConfig> for ModelPricing {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            prompt_per_1k: config.usd_per_1k_prompt,
            completion_per_1k: config.usd_per_1k_completion,
        }
    }
}

/// Calculate cost in USD for a given token usage and pricing.
pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    let prompt = (usage.prompt_tokens as f64 / 1_000.0) * pricing.prompt_per_1k;
    let completion = (usage.completion_tokens as f64 / 1_000.0) * pricing.completion_per_1k;
    prompt + completion
}
