// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote provider speaking the OpenAI-compatible chat completions API.
//!
//! Provides [`RemoteProvider`] which handles request construction, bearer
//! authentication and response parsing. Every transport or protocol failure
//! maps to [`TollgateError::ProviderUnavailable`]; retries and timeouts belong
//! to the router.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tollgate_config::model::ProviderConfig;
use tollgate_core::{
    GenerateRequest, GenerationResult, ProviderAdapter, ProviderKind, ProviderTier,
    TokenUsage, TollgateError,
};
use tracing::debug;

use crate::pricing::{ModelPricing, calculate_cost};

/// Upper bound on any single HTTP exchange. The router applies the tighter
/// per-call timeout from `[router] provider_timeout_ms`.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Model sent when a remote provider does not configure one.
const DEFAULT_MODEL: &str = "default";

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<ReasoningBudget>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ReasoningBudget {
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    /// Non-standard field some backends use to report self-assessed confidence.
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI-compatible HTTP provider.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    name: String,
    tier: ProviderTier,
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    pricing: ModelPricing,
}

impl RemoteProvider {
    /// Creates a remote provider from its configuration.
    ///
    /// # Credential Resolution
    /// 1. `api_key` if set
    /// 2. the environment variable named by `api_key_env`
    /// 3. Returns a configuration error if neither yields a value
    pub fn new(config: &ProviderConfig) -> Result<Self, TollgateError> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            TollgateError::Config(format!("provider {}: remote provider needs an endpoint", config.name))
        })?;
        let parsed = reqwest::Url::parse(endpoint).map_err(|e| {
            TollgateError::Config(format!("provider {}: invalid endpoint {endpoint:?}: {e}", config.name))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TollgateError::Config(format!(
                "provider {}: endpoint must be http or https",
                config.name
            )));
        }

        let api_key = resolve_api_key(config)?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
            TollgateError::Config(format!("provider {}: invalid API key header value: {e}", config.name))
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| TollgateError::ProviderUnavailable {
                provider: config.name.clone(),
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            name: config.name.clone(),
            tier: config.tier,
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: config.max_tokens,
            pricing: ModelPricing::from(config),
        })
    }

    fn unavailable(&self, message: String, source: Option<reqwest::Error>) -> TollgateError {
        TollgateError::ProviderUnavailable {
            provider: self.name.clone(),
            message,
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }
}

/// Resolve the bearer credential from config or the named environment variable.
fn resolve_api_key(config: &ProviderConfig) -> Result<String, TollgateError> {
    if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    if let Some(var) = config.api_key_env.as_deref() {
        return match std::env::var(var) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(TollgateError::Config(format!(
                "provider {}: environment variable {var} is not set",
                config.name
            ))),
        };
    }
    Err(TollgateError::Config(format!(
        "provider {}: no API key configured (set api_key or api_key_env)",
        config.name
    )))
}

#[async_trait]
impl ProviderAdapter for RemoteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ProviderTier {
        self.tier
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Remote
    }

    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerationResult, TollgateError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.text,
            }],
            max_tokens: request.max_tokens.min(self.max_tokens),
            reasoning: request
                .reasoning_tokens
                .filter(|_| self.tier == ProviderTier::Reasoning)
                .map(|max_tokens| ReasoningBudget { max_tokens }),
        };

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.unavailable(format!("HTTP request failed: {e}"), Some(e)))?;

        let status = response.status();
        debug!(provider = %self.name, request_id = %request.request_id, status = %status, "completion response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("API error ({status}): {body}"), None));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("failed to parse response: {e}"), Some(e)))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.unavailable("response contained no message content".into(), None))?;

        let token_usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(GenerationResult {
            provider_name: self.name.clone(),
            text,
            cost_usd: calculate_cost(&token_usage, &self.pricing),
            token_usage,
            latency_ms,
            raw_confidence: parsed.confidence.filter(|c| c.is_finite()),
        })
    }

    async fn health_check(&self) -> Result<(), TollgateError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .send()
            .await
            .map_err(|e| self.unavailable(format!("health check failed: {e}"), Some(e)))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.unavailable(format!("health check returned {status}"), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_config(endpoint: &str, tier: ProviderTier) -> ProviderConfig {
        ProviderConfig {
            name: "remote-a".into(),
            kind: ProviderKind::Remote,
            tier,
            priority: 100,
            endpoint: Some(endpoint.to_string()),
            model: Some("gpt-test".into()),
            max_tokens: 256,
            api_key: Some("test-api-key".into()),
            api_key_env: None,
            usd_per_1k_prompt: 1.0,
            usd_per_1k_completion: 2.0,
            canned_response: None,
        }
    }

    fn generate_request(reasoning_tokens: Option<u32>) -> GenerateRequest {
        GenerateRequest {
            request_id: "req-1".into(),
            text: "Hello".into(),
            max_tokens: 1024,
            reasoning_tokens,
        }
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1000, "completion_tokens": 500, "total_tokens": 1500}
        })
    }

    #[tokio::test]
    async fn generate_parses_content_usage_and_cost() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hi there!")))
            .mount(&server)
            .await;

        let provider = RemoteProvider::new(&provider_config(&server.uri(), ProviderTier::Fast)).unwrap();
        let result = provider.generate(generate_request(None)).await.unwrap();

        assert_eq!(result.provider_name, "remote-a");
        assert_eq!(result.text, "Hi there!");
        assert_eq!(result.token_usage.prompt_tokens, 1000);
        assert_eq!(result.token_usage.completion_tokens, 500);
        assert!((result.cost_usd - 2.0).abs() < 1e-9, "got {}", result.cost_usd);
        assert!(result.raw_confidence.is_none());
    }

    #[tokio::test]
    async fn sends_bearer_and_clamps_max_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-test", "max_tokens": 256})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = RemoteProvider::new(&provider_config(&server.uri(), ProviderTier::Fast)).unwrap();
        provider.generate(generate_request(None)).await.unwrap();
    }

    #[tokio::test]
    async fn reasoning_tier_sends_reasoning_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"reasoning": {"max_tokens": 2048}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("proof")))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            RemoteProvider::new(&provider_config(&server.uri(), ProviderTier::Reasoning)).unwrap();
        let result = provider.generate(generate_request(Some(2048))).await.unwrap();
        assert_eq!(result.text, "proof");
    }

    #[tokio::test]
    async fn reported_confidence_is_passed_through() {
        let server = MockServer::start().await;
        let mut body = completion_body("sure");
        body["confidence"] = serde_json::json!(0.9);
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let provider = RemoteProvider::new(&provider_config(&server.uri(), ProviderTier::Fast)).unwrap();
        let result = provider.generate(generate_request(None)).await.unwrap();
        assert_eq!(result.raw_confidence, Some(0.9));
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = RemoteProvider::new(&provider_config(&server.uri(), ProviderTier::Fast)).unwrap();
        let err = provider.generate(generate_request(None)).await.unwrap_err();
        assert!(err.is_provider_failure());
        assert!(err.to_string().contains("overloaded"), "got: {err}");
    }

    #[tokio::test]
    async fn malformed_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = RemoteProvider::new(&provider_config(&server.uri(), ProviderTier::Fast)).unwrap();
        let err = provider.generate(generate_request(None)).await.unwrap_err();
        assert!(matches!(err, TollgateError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn empty_choices_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let provider = RemoteProvider::new(&provider_config(&server.uri(), ProviderTier::Fast)).unwrap();
        assert!(provider.generate(generate_request(None)).await.is_err());
    }

    #[tokio::test]
    async fn health_check_hits_models_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = RemoteProvider::new(&provider_config(&server.uri(), ProviderTier::Fast)).unwrap();
        provider.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn health_check_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = RemoteProvider::new(&provider_config(&server.uri(), ProviderTier::Fast)).unwrap();
        assert!(provider.health_check().await.is_err());
    }

    #[test]
    fn missing_credential_is_config_error() {
        let mut config = provider_config("http://localhost:1", ProviderTier::Fast);
        config.api_key = None;
        let err = RemoteProvider::new(&config).unwrap_err();
        assert!(matches!(err, TollgateError::Config(_)));
    }

    #[test]
    fn unset_env_credential_is_config_error() {
        let mut config = provider_config("http://localhost:1", ProviderTier::Fast);
        config.api_key = None;
        config.api_key_env = Some("TOLLGATE_TEST_SURELY_UNSET_KEY".into());
        let err = RemoteProvider::new(&config).unwrap_err();
        assert!(err.to_string().contains("TOLLGATE_TEST_SURELY_UNSET_KEY"));
    }

    #[test]
    fn bad_endpoint_is_config_error() {
        let config = provider_config("not a url", ProviderTier::Fast);
        assert!(matches!(
            RemoteProvider::new(&config).unwrap_err(),
            TollgateError::Config(_)
        ));

        let mut config = provider_config("http://x", ProviderTier::Fast);
        config.endpoint = None;
        assert!(RemoteProvider::new(&config).is_err());
    }
}
