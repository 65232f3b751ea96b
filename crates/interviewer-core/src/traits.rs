//! Port definitions: language model, embeddings, raw LLM providers, and repositories.
//!
//! The engine only ever talks to the outside world through these async traits.
//! `interviewer-providers` implements the model ports; [`crate::store`] implements
//! the repositories in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    Answer, Difficulty, FollowUpQuestion, Interview, QualitativeEvaluation, Question,
    QuestionType, Severity,
};

// ---------------------------------------------------------------------------
// Language model gateway
// ---------------------------------------------------------------------------

/// High-level language-model operations the engine needs.
///
/// Every method is a latency-bearing, fallible network call.
#[async_trait]
pub trait LanguageModelGateway: Send + Sync {
    /// Write one interview question for a skill.
    async fn generate_question(&self, request: &QuestionRequest) -> anyhow::Result<String>;

    /// Write the exemplar answer later used as the similarity baseline.
    async fn generate_reference_answer(
        &self,
        question: &str,
        context: &str,
    ) -> anyhow::Result<String>;

    /// Explain why the question is worth asking.
    async fn generate_rationale(
        &self,
        question: &str,
        reference_answer: &str,
    ) -> anyhow::Result<String>;

    /// Confirm which lexical gaps are real conceptual gaps.
    async fn detect_concept_gaps(
        &self,
        request: &GapConfirmationRequest,
    ) -> anyhow::Result<ConceptGapReport>;

    /// Write a follow-up probing the missing concepts.
    async fn generate_follow_up_question(
        &self,
        request: &FollowUpRequest,
    ) -> anyhow::Result<String>;

    /// Grade an answer qualitatively (score on a 0-100 scale).
    async fn evaluate_answer_quality(
        &self,
        question: &str,
        answer: &str,
    ) -> anyhow::Result<QualitativeEvaluation>;

    /// Interview-level advice built from the aggregate outcome.
    async fn generate_interview_recommendations(
        &self,
        context: &AggregateContext,
    ) -> anyhow::Result<InterviewRecommendations>;
}

/// Input for generating one planned question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    /// Candidate/role context.
    pub context: String,
    pub skill: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
}

/// Input for semantic confirmation of keyword gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapConfirmationRequest {
    pub question: String,
    pub answer: String,
    pub reference_answer: String,
    /// Reference-only keywords from the lexical filter. Never empty.
    pub keyword_gaps: Vec<String>,
}

/// Language model verdict on candidate gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptGapReport {
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub severity: Severity,
}

/// Input for generating a follow-up question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpRequest {
    pub parent_question: String,
    pub answer: String,
    pub missing_concepts: Vec<String>,
    pub severity: Severity,
    /// 1-based order of the follow-up being generated.
    pub order: u8,
}

/// Aggregate outcome handed to the recommendation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateContext {
    pub candidate_id: String,
    pub aggregate_score: f64,
    pub theoretical_avg: f64,
    pub speaking_avg: f64,
    pub questions: Vec<QuestionDigest>,
}

/// Per-question slice of [`AggregateContext`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDigest {
    pub question: String,
    pub final_score: Option<f64>,
    pub follow_up_count: usize,
    pub gap_filled_count: usize,
    pub remaining_gaps: Vec<String>,
}

/// Interview-level recommendations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewRecommendations {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub study_topics: Vec<String>,
    #[serde(default)]
    pub technique_tips: Vec<String>,
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// Turns text into a dense vector for cosine similarity.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Human-readable backend name (e.g. "openai").
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

// ---------------------------------------------------------------------------
// Raw LLM provider
// ---------------------------------------------------------------------------

/// Trait for LLM backends that complete a prompt with text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Complete a prompt.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List available models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to complete a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "claude-sonnet-4-20250514").
    pub model: String,
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Response from a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting for one completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
    /// Cost per 1K input tokens in USD.
    pub cost_per_1k_input: f64,
    /// Cost per 1K output tokens in USD.
    pub cost_per_1k_output: f64,
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

#[async_trait]
pub trait InterviewRepository: Send + Sync {
    async fn save_interview(&self, interview: &Interview) -> anyhow::Result<()>;
    async fn find_interview(&self, id: Uuid) -> anyhow::Result<Option<Interview>>;
    async fn update_interview(&self, interview: &Interview) -> anyhow::Result<()>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn save_question(&self, question: &Question) -> anyhow::Result<()>;
    async fn find_question(&self, id: Uuid) -> anyhow::Result<Option<Question>>;
    async fn delete_question(&self, id: Uuid) -> anyhow::Result<()>;
    /// Questions belonging to an interview, in creation order.
    async fn list_questions(&self, interview_id: Uuid) -> anyhow::Result<Vec<Question>>;
}

#[async_trait]
pub trait AnswerRepository: Send + Sync {
    async fn save_answer(&self, answer: &Answer) -> anyhow::Result<()>;
    /// Answers belonging to an interview, in creation order.
    async fn list_answers(&self, interview_id: Uuid) -> anyhow::Result<Vec<Answer>>;
}

#[async_trait]
pub trait FollowUpRepository: Send + Sync {
    async fn save_follow_up(&self, follow_up: &FollowUpQuestion) -> anyhow::Result<()>;
    async fn find_follow_up(&self, id: Uuid) -> anyhow::Result<Option<FollowUpQuestion>>;
    /// Follow-ups belonging to an interview, in creation order.
    async fn list_follow_ups(&self, interview_id: Uuid) -> anyhow::Result<Vec<FollowUpQuestion>>;

    /// Follow-ups already generated for one main question.
    async fn count_follow_ups(
        &self,
        interview_id: Uuid,
        parent_question_id: Uuid,
    ) -> anyhow::Result<usize> {
        Ok(self
            .list_follow_ups(interview_id)
            .await?
            .iter()
            .filter(|f| f.parent_question_id == parent_question_id)
            .count())
    }
}
