//! Ollama (local LLM) chat and embedding backend.

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

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 300; // Local models are slower
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Ollama local LLM provider.
pub struct OllamaProvider {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Self {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base.trim_end_matches('/').to_string(),
            timeout_secs,
            client,
        }
    }

    fn unreachable(&self, e: reqwest::Error) -> GatewayError {
        if e.is_connect() {
            GatewayError::NetworkError(format!(
                "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                self.base_url
            ))
        } else {
            send_error(e, self.timeout_secs, &self.base_url)
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelEntry>,
}

#[derive(Deserialize)]
struct OllamaModelEntry {
    name: String,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let body = OllamaRequest {
            model: &request.model,
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: request.system_prompt.as_deref().unwrap_or(SYSTEM_PROMPT),
                },
                OllamaMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let response = check_status(response, &request.model, nested_error_message)
            .await
            .map_err(|e| pull_hint(e, &request.model))?;

        let api_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("failed to parse response: {e}")))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let prompt_tokens = api_response.prompt_eval_count.unwrap_or(0);
        let completion_tokens = api_response.eval_count.unwrap_or(0);

        Ok(GenerateResponse {
            content: api_response.message.content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                estimated_cost_usd: 0.0, // Local models are free
            },
            latency_ms,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        // Installed models are only known at runtime; see `list_models_async`.
        vec![]
    }
}

fn pull_hint(err: GatewayError, model: &str) -> GatewayError {
    match err {
        GatewayError::ModelNotFound(_) => GatewayError::ModelNotFound(format!(
            "'{model}' not found locally. Pull it with: ollama pull {model}"
        )),
        other => other,
    }
}

impl OllamaProvider {
    /// Fetch the models installed in the Ollama instance.
    pub async fn list_models_async(&self) -> anyhow::Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let response = check_status(response, "", nested_error_message).await?;

        let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
            GatewayError::MalformedResponse(format!("failed to parse tags response: {e}"))
        })?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                provider: "ollama".into(),
                max_context: 0,
                cost_per_1k_input: 0.0,
                cost_per_1k_output: 0.0,
            })
            .collect())
    }
}

/// Embeddings through Ollama's `/api/embed`.
pub struct OllamaEmbedder {
    provider: OllamaProvider,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(provider: OllamaProvider, model: Option<String>) -> Self {
        Self {
            provider,
            model: model.unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingGateway for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, text), fields(model = %self.model, chars = text.len()))]
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let p = &self.provider;
        let response = p
            .client
            .post(format!("{}/api/embed", p.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| p.unreachable(e))?;
        let response = check_status(response, &self.model, nested_error_message)
            .await
            .map_err(|e| pull_hint(e, &self.model))?;

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            GatewayError::MalformedResponse(format!("failed to parse embed response: {e}"))
        })?;

        match parsed.embeddings.into_iter().next() {
            Some(vector) if !vector.is_empty() => Ok(vector),
            _ => Err(GatewayError::MalformedResponse("empty embedding".into()).into()),
        }
    }
}
