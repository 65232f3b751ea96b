//! Interviewer configuration and backend factories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use interviewer_core::service::ServiceConfig;
use interviewer_core::traits::{EmbeddingGateway, LanguageModelGateway, LlmProvider};

use crate::anthropic::AnthropicProvider;
use crate::embedding::{HashedEmbedder, DEFAULT_DIMENSION};
use crate::gateway::{PromptGateway, PromptSettings};
use crate::ollama::{OllamaEmbedder, OllamaProvider};
use crate::openai::{OpenAiEmbedder, OpenAiProvider};

/// Configuration for a single LLM provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Which backend turns answers into vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `"hashed"` for the offline embedder, otherwise a key into `providers`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Backend model; each backend has its own default.
    #[serde(default)]
    pub model: Option<String>,
    /// Bucket count for the hashed embedder.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_embedding_provider() -> String {
    "hashed".to_string()
}
fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dimension: default_dimension(),
        }
    }
}

/// Top-level interviewer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewerConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Retries per planning call on transient provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Max concurrent question generations while planning.
    #[serde(default = "default_parallelism")]
    pub planning_parallelism: usize,
    /// Budget for gap confirmation and follow-up generation.
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,
    /// Where summaries, reports and session snapshots are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_parallelism() -> usize {
    4
}
fn default_gateway_timeout() -> u64 {
    20
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./interviewer-results")
}

impl Default for InterviewerConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            embedding: EmbeddingConfig::default(),
            temperature: default_temperature(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            planning_parallelism: default_parallelism(),
            gateway_timeout_secs: default_gateway_timeout(),
            output_dir: default_output_dir(),
        }
    }
}

impl InterviewerConfig {
    /// Engine settings derived from this configuration.
    pub fn service_config(&self) -> ServiceConfig {
        let mut service = ServiceConfig::default();
        service.planner.parallelism = self.planning_parallelism.max(1);
        service.planner.max_retries = self.max_retries;
        service.planner.retry_delay = Duration::from_millis(self.retry_delay_ms);
        service.evaluator.secondary_call_timeout = Duration::from_secs(self.gateway_timeout_secs);
        service
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
            org_id: org_id.as_deref().map(resolve_env_vars),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `interviewer.toml` in the current directory
/// 2. `~/.config/interviewer/config.toml`
///
/// Environment variable overrides: `INTERVIEWER_OPENAI_KEY`, `INTERVIEWER_ANTHROPIC_KEY`.
pub fn load_config() -> Result<InterviewerConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<InterviewerConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("interviewer.toml");
            if local.exists() {
                Some(local)
            } else {
                config_dir()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<InterviewerConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => InterviewerConfig::default(),
    };

    apply_env_overrides(&mut config);

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

fn apply_env_overrides(config: &mut InterviewerConfig) {
    if let Ok(key) = std::env::var("INTERVIEWER_ANTHROPIC_KEY") {
        let entry = config
            .providers
            .entry("anthropic".into())
            .or_insert(ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Anthropic { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("INTERVIEWER_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("interviewer"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    match config {
        ProviderConfig::Anthropic { api_key, base_url } => {
            require_key(name, api_key)?;
            Ok(Box::new(AnthropicProvider::new(api_key, base_url.clone())))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            require_key(name, api_key)?;
            Ok(Box::new(OpenAiProvider::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
            )))
        }
        ProviderConfig::Ollama { base_url } => Ok(Box::new(OllamaProvider::new(base_url))),
    }
}

fn require_key(name: &str, api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        bail!("provider '{name}' has no API key configured");
    }
    Ok(())
}

/// Build the prompt-driven language model for `provider` (or the default provider).
pub fn create_language_model(
    config: &InterviewerConfig,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn LanguageModelGateway>> {
    let name = provider.unwrap_or(&config.default_provider);
    let provider_config = config
        .providers
        .get(name)
        .with_context(|| format!("provider '{name}' is not configured"))?;
    let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(name, provider_config)?);

    let mut settings = PromptSettings::new(model.unwrap_or(&config.default_model));
    settings.temperature = config.temperature;
    Ok(Arc::new(PromptGateway::new(provider, settings)))
}

/// Build the embedding backend named in `config.embedding`.
pub fn create_embedder(config: &InterviewerConfig) -> Result<Arc<dyn EmbeddingGateway>> {
    let embedding = &config.embedding;
    if embedding.provider == "hashed" {
        return Ok(Arc::new(HashedEmbedder::new(embedding.dimension)));
    }

    let provider_config = config.providers.get(&embedding.provider).with_context(|| {
        format!(
            "embedding provider '{}' is not configured",
            embedding.provider
        )
    })?;
    match provider_config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            require_key(&embedding.provider, api_key)?;
            let provider = OpenAiProvider::new(api_key, base_url.clone(), org_id.clone());
            Ok(Arc::new(OpenAiEmbedder::new(provider, embedding.model.clone())))
        }
        ProviderConfig::Ollama { base_url } => Ok(Arc::new(OllamaEmbedder::new(
            OllamaProvider::new(base_url),
            embedding.model.clone(),
        ))),
        ProviderConfig::Anthropic { .. } => bail!(
            "provider '{}' does not offer embeddings; use openai, ollama, or hashed",
            embedding.provider
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_INTERVIEWER_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_INTERVIEWER_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_INTERVIEWER_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${UNTERMINATED"), "${UNTERMINATED");
        std::env::remove_var("_INTERVIEWER_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = InterviewerConfig::default();
        assert_eq!(config.default_provider, "anthropic");
        assert_eq!(config.planning_parallelism, 4);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.embedding.provider, "hashed");
        assert_eq!(config.gateway_timeout_secs, 20);
    }

    #[test]
    fn parse_provider_config() {
        let toml_str = r#"
default_provider = "anthropic"
default_model = "claude-sonnet-4-20250514"
gateway_timeout_secs = 5

[providers.anthropic]
type = "anthropic"
api_key = "sk-test"

[providers.openai]
type = "openai"
api_key = "sk-openai"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

[embedding]
provider = "openai"
model = "text-embedding-3-large"
"#;
        let config: InterviewerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 3);
        assert!(matches!(
            config.providers.get("anthropic"),
            Some(ProviderConfig::Anthropic { .. })
        ));
        assert_eq!(config.embedding.model.as_deref(), Some("text-embedding-3-large"));
        assert_eq!(config.embedding.dimension, DEFAULT_DIMENSION);
        assert_eq!(config.gateway_timeout_secs, 5);
    }

    #[test]
    fn debug_masks_api_keys() {
        let config = ProviderConfig::Anthropic {
            api_key: "sk-secret".into(),
            base_url: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interviewer.toml");
        std::fs::write(
            &path,
            r#"
planning_parallelism = 2
retry_delay_ms = 250

[providers.local]
type = "ollama"
base_url = "${_INTERVIEWER_TEST_OLLAMA}"
"#,
        )
        .unwrap();
        std::env::set_var("_INTERVIEWER_TEST_OLLAMA", "http://gpu-box:11434");

        let config = load_config_from(Some(&path)).unwrap();
        match config.providers.get("local") {
            Some(ProviderConfig::Ollama { base_url }) => {
                assert_eq!(base_url, "http://gpu-box:11434")
            }
            other => panic!("unexpected provider: {other:?}"),
        }
        let service = config.service_config();
        assert_eq!(service.planner.parallelism, 2);
        assert_eq!(service.planner.retry_delay, Duration::from_millis(250));
        std::env::remove_var("_INTERVIEWER_TEST_OLLAMA");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/interviewer.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let config = ProviderConfig::OpenAI {
            api_key: "  ".into(),
            base_url: None,
            org_id: None,
        };
        let err = create_provider("openai", &config).err().unwrap();
        assert!(err.to_string().contains("no API key"));
    }

    #[test]
    fn embedder_factory() {
        let mut config = InterviewerConfig::default();
        assert_eq!(create_embedder(&config).unwrap().name(), "hashed");

        config.embedding.provider = "anthropic".into();
        config.providers.insert(
            "anthropic".into(),
            ProviderConfig::Anthropic {
                api_key: "k".into(),
                base_url: None,
            },
        );
        assert!(create_embedder(&config).is_err());

        config.embedding.provider = "local".into();
        config.providers.insert(
            "local".into(),
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".into(),
            },
        );
        assert_eq!(create_embedder(&config).unwrap().name(), "ollama");

        config.embedding.provider = "missing".into();
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn language_model_requires_configured_provider() {
        let config = InterviewerConfig::default();
        let err = create_language_model(&config, None, None).err().unwrap();
        assert!(err.to_string().contains("not configured"));
    }
}
