//! [`LanguageModelGateway`] built on top of any raw [`LlmProvider`].
//!
//! Each operation renders a prompt from [`crate::prompts`], sends one completion,
//! and parses the reply. Structured replies are read as JSON (fenced or bare);
//! missing fields fall back to defaults and scores are clamped to 0-100.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use interviewer_core::error::GatewayError;
use interviewer_core::model::{QualitativeEvaluation, Severity};
use interviewer_core::traits::{
    AggregateContext, ConceptGapReport, FollowUpRequest, GapConfirmationRequest,
    GenerateRequest, InterviewRecommendations, LanguageModelGateway, LlmProvider,
    QuestionRequest,
};

use crate::prompts;

/// Sampling settings shared by every call the gateway makes.
#[derive(Debug, Clone)]
pub struct PromptSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl PromptSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

pub struct PromptGateway {
    provider: Arc<dyn LlmProvider>,
    settings: PromptSettings,
}

impl PromptGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: PromptSettings) -> Self {
        Self { provider, settings }
    }

    async fn complete(&self, prompt: String) -> anyhow::Result<String> {
        let request = GenerateRequest {
            model: self.settings.model.clone(),
            prompt,
            system_prompt: None,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let response = self.provider.generate(&request).await?;
        debug!(
            provider = self.provider.name(),
            latency_ms = response.latency_ms,
            tokens = response.token_usage.total_tokens,
            "completion received"
        );
        Ok(response.content)
    }

    async fn complete_text(&self, prompt: String, what: &str) -> anyhow::Result<String> {
        let text = prompts::clean_text(&self.complete(prompt).await?);
        if text.is_empty() {
            return Err(GatewayError::MalformedResponse(format!("empty {what}")).into());
        }
        Ok(text)
    }

    async fn complete_json<T: for<'de> Deserialize<'de>>(
        &self,
        prompt: String,
        what: &str,
    ) -> anyhow::Result<T> {
        let reply = self.complete(prompt).await?;
        let json = prompts::extract_json(&reply).ok_or_else(|| {
            GatewayError::MalformedResponse(format!("no JSON object in {what} reply"))
        })?;
        serde_json::from_str(json)
            .map_err(|e| GatewayError::MalformedResponse(format!("{what}: {e}")))
            .with_context(|| format!("failed to parse {what}"))
    }
}

#[derive(Deserialize)]
struct RawGapReport {
    #[serde(default)]
    concepts: Vec<String>,
    #[serde(default)]
    confirmed: Option<bool>,
    #[serde(default)]
    severity: Option<String>,
}

#[derive(Deserialize)]
struct RawEvaluation {
    #[serde(default)]
    score: Option<serde_json::Value>,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
}

/// Reads a finite score given as a number or a numeric string.
fn parse_score(value: Option<&serde_json::Value>) -> Option<f64> {
    let score: f64 = match value? {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok()?,
        _ => return None,
    };
    score.is_finite().then_some(score)
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl LanguageModelGateway for PromptGateway {
    #[instrument(skip(self, request), fields(skill = %request.skill))]
    async fn generate_question(&self, request: &QuestionRequest) -> anyhow::Result<String> {
        self.complete_text(prompts::question_prompt(request), "question")
            .await
    }

    #[instrument(skip_all)]
    async fn generate_reference_answer(
        &self,
        question: &str,
        context: &str,
    ) -> anyhow::Result<String> {
        self.complete_text(
            prompts::reference_answer_prompt(question, context),
            "reference answer",
        )
        .await
    }

    #[instrument(skip_all)]
    async fn generate_rationale(
        &self,
        question: &str,
        reference_answer: &str,
    ) -> anyhow::Result<String> {
        self.complete_text(
            prompts::rationale_prompt(question, reference_answer),
            "rationale",
        )
        .await
    }

    #[instrument(skip_all, fields(keyword_gaps = request.keyword_gaps.len()))]
    async fn detect_concept_gaps(
        &self,
        request: &GapConfirmationRequest,
    ) -> anyhow::Result<ConceptGapReport> {
        let raw: RawGapReport = self
            .complete_json(prompts::gap_confirmation_prompt(request), "gap report")
            .await?;
        let concepts = clean_list(raw.concepts);
        let confirmed = raw.confirmed.unwrap_or(!concepts.is_empty());
        let severity = raw
            .severity
            .and_then(|s| s.parse::<Severity>().ok())
            .unwrap_or(if confirmed {
                Severity::Moderate
            } else {
                Severity::None
            });
        Ok(ConceptGapReport {
            concepts,
            confirmed,
            severity,
        })
    }

    #[instrument(skip_all, fields(order = request.order))]
    async fn generate_follow_up_question(
        &self,
        request: &FollowUpRequest,
    ) -> anyhow::Result<String> {
        self.complete_text(prompts::follow_up_prompt(request), "follow-up question")
            .await
    }

    #[instrument(skip_all)]
    async fn evaluate_answer_quality(
        &self,
        question: &str,
        answer: &str,
    ) -> anyhow::Result<QualitativeEvaluation> {
        let raw: RawEvaluation = self
            .complete_json(prompts::evaluation_prompt(question, answer), "evaluation")
            .await?;
        let score = parse_score(raw.score.as_ref())
            .ok_or_else(|| {
                GatewayError::MalformedResponse("evaluation has no numeric score".into())
            })?;
        Ok(QualitativeEvaluation {
            score: score.clamp(0.0, 100.0),
            feedback: raw.feedback.trim().to_string(),
            strengths: clean_list(raw.strengths),
            weaknesses: clean_list(raw.weaknesses),
        })
    }

    #[instrument(skip_all, fields(candidate = %context.candidate_id))]
    async fn generate_interview_recommendations(
        &self,
        context: &AggregateContext,
    ) -> anyhow::Result<InterviewRecommendations> {
        let raw: InterviewRecommendations = self
            .complete_json(prompts::recommendations_prompt(context), "recommendations")
            .await?;
        Ok(InterviewRecommendations {
            strengths: clean_list(raw.strengths),
            weaknesses: clean_list(raw.weaknesses),
            study_topics: clean_list(raw.study_topics),
            technique_tips: clean_list(raw.technique_tips),
        })
    }
}
