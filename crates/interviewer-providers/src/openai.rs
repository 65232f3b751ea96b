//! OpenAI-compatible chat completions and embeddings.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use interviewer_core::error::GatewayError;
use interviewer_core::traits::{
    EmbeddingGateway, GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage,
};

use crate::http::{check_status, nested_error_message, send_error};
use crate::prompts::SYSTEM_PROMPT;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to build HTTP client")
}

/// OpenAI-compatible API provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, base_url: Option<String>, org_id: Option<String>) -> Self {
        Self::with_timeout(api_key, base_url, org_id, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            timeout_secs,
            client: build_client(timeout_secs),
        }
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");
        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }
        req
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OpenAiMessage<'a>>,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let body = OpenAiRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: request.system_prompt.as_deref().unwrap_or(SYSTEM_PROMPT),
                },
                OpenAiMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
        };

        let response = self
            .post("/v1/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs, &self.base_url))?;
        let response = check_status(response, &request.model, nested_error_message).await?;

        let api_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("failed to parse response: {e}")))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        // GPT-4.1 pricing: $2/$8 per 1M tokens
        let usage = &api_response.usage;
        let estimated_cost =
            (usage.prompt_tokens as f64 * 2.0 + usage.completion_tokens as f64 * 8.0) / 1_000_000.0;

        Ok(GenerateResponse {
            content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
                estimated_cost_usd: estimated_cost,
            },
            latency_ms,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4.1".into(),
                name: "GPT-4.1".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                cost_per_1k_input: 0.002,
                cost_per_1k_output: 0.008,
            },
            ModelInfo {
                id: "gpt-4.1-mini".into(),
                name: "GPT-4.1 Mini".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                cost_per_1k_input: 0.0004,
                cost_per_1k_output: 0.0016,
            },
        ]
    }
}

/// Embeddings through `/v1/embeddings`.
pub struct OpenAiEmbedder {
    provider: OpenAiProvider,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(provider: OpenAiProvider, model: Option<String>) -> Self {
        Self {
            provider,
            model: model.unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingGateway for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, text), fields(model = %self.model, chars = text.len()))]
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let p = &self.provider;
        let response = p
            .post("/v1/embeddings")
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| send_error(e, p.timeout_secs, &p.base_url))?;
        let response = check_status(response, &self.model, nested_error_message).await?;

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            GatewayError::MalformedResponse(format!("failed to parse embedding response: {e}"))
        })?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .unwrap_or_default();
        if vector.is_empty() {
            return Err(GatewayError::MalformedResponse("empty embedding".into()).into());
        }
        Ok(vector)
    }
}
