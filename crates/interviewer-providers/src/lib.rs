//! interviewer-providers: language model and embedding backends.
//!
//! Implements the raw `LlmProvider` trait for Anthropic, OpenAI, and Ollama,
//! the prompt-driven `LanguageModelGateway` on top of any provider, and the
//! `EmbeddingGateway` backends (OpenAI, Ollama, and an offline hashed embedder).

pub mod anthropic;
pub mod config;
pub mod embedding;
pub mod gateway;
mod http;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod prompts;

pub use config::{
    create_embedder, create_language_model, create_provider, load_config, load_config_from,
    InterviewerConfig, ProviderConfig,
};
pub use embedding::HashedEmbedder;
pub use gateway::{PromptGateway, PromptSettings};
