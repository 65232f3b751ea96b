//! Fixed-output gateways for tests and offline runs.
//!
//! Both mocks are configured up front through builder methods and are then
//! shared behind an `Arc`; every call is counted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::model::{QualitativeEvaluation, Severity};
use crate::traits::{
    AggregateContext, ConceptGapReport, EmbeddingGateway, FollowUpRequest,
    GapConfirmationRequest, InterviewRecommendations, LanguageModelGateway, QuestionRequest,
};

/// How a mocked call behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    Succeed,
    /// Return an API error immediately.
    Fail,
    /// Sleep for the configured hang duration before answering.
    Hang,
}

/// Per-method call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub questions: u32,
    pub reference_answers: u32,
    pub rationales: u32,
    pub gap_confirmations: u32,
    pub follow_ups: u32,
    pub evaluations: u32,
    pub recommendations: u32,
}

#[derive(Debug, Default)]
struct Counters {
    questions: AtomicU32,
    reference_answers: AtomicU32,
    rationales: AtomicU32,
    gap_confirmations: AtomicU32,
    follow_ups: AtomicU32,
    evaluations: AtomicU32,
    recommendations: AtomicU32,
}

/// Deterministic [`LanguageModelGateway`].
#[derive(Debug)]
pub struct MockLanguageModel {
    reference_answer: String,
    failing_skill: Option<String>,
    gap_behavior: MockBehavior,
    confirm_gaps: bool,
    gap_severity: Severity,
    follow_up_behavior: MockBehavior,
    evaluation_behavior: MockBehavior,
    recommendation_behavior: MockBehavior,
    scores: Vec<f64>,
    hang_for: Duration,
    counters: Counters,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self {
            reference_answer: "A complete reference answer covering the core concepts.".into(),
            failing_skill: None,
            gap_behavior: MockBehavior::Succeed,
            confirm_gaps: true,
            gap_severity: Severity::Moderate,
            follow_up_behavior: MockBehavior::Succeed,
            evaluation_behavior: MockBehavior::Succeed,
            recommendation_behavior: MockBehavior::Succeed,
            scores: vec![60.0],
            hang_for: Duration::from_secs(3600),
            counters: Counters::default(),
        }
    }

    pub fn with_reference_answer(mut self, reference: &str) -> Self {
        self.reference_answer = reference.to_string();
        self
    }

    /// Fail question generation for slots targeting `skill`.
    pub fn failing_questions_for(mut self, skill: &str) -> Self {
        self.failing_skill = Some(skill.to_string());
        self
    }

    /// Whether gap confirmation confirms the keyword gaps it is shown.
    pub fn confirming_gaps(mut self, confirm: bool, severity: Severity) -> Self {
        self.confirm_gaps = confirm;
        self.gap_severity = severity;
        self
    }

    pub fn with_gap_behavior(mut self, behavior: MockBehavior) -> Self {
        self.gap_behavior = behavior;
        self
    }

    pub fn with_follow_up_behavior(mut self, behavior: MockBehavior) -> Self {
        self.follow_up_behavior = behavior;
        self
    }

    pub fn with_evaluation_behavior(mut self, behavior: MockBehavior) -> Self {
        self.evaluation_behavior = behavior;
        self
    }

    pub fn with_recommendation_behavior(mut self, behavior: MockBehavior) -> Self {
        self.recommendation_behavior = behavior;
        self
    }

    /// Qualitative scores returned in call order; the last one repeats.
    pub fn with_scores(mut self, scores: Vec<f64>) -> Self {
        if !scores.is_empty() {
            self.scores = scores;
        }
        self
    }

    pub fn with_hang_duration(mut self, hang_for: Duration) -> Self {
        self.hang_for = hang_for;
        self
    }

    pub fn calls(&self) -> MockCalls {
        let c = &self.counters;
        MockCalls {
            questions: c.questions.load(Ordering::Relaxed),
            reference_answers: c.reference_answers.load(Ordering::Relaxed),
            rationales: c.rationales.load(Ordering::Relaxed),
            gap_confirmations: c.gap_confirmations.load(Ordering::Relaxed),
            follow_ups: c.follow_ups.load(Ordering::Relaxed),
            evaluations: c.evaluations.load(Ordering::Relaxed),
            recommendations: c.recommendations.load(Ordering::Relaxed),
        }
    }

    async fn behave(&self, behavior: MockBehavior, operation: &str) -> anyhow::Result<()> {
        match behavior {
            MockBehavior::Succeed => Ok(()),
            MockBehavior::Fail => Err(GatewayError::ApiError {
                status: 500,
                message: format!("mock failure in {operation}"),
            }
            .into()),
            MockBehavior::Hang => {
                tokio::time::sleep(self.hang_for).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl LanguageModelGateway for MockLanguageModel {
    async fn generate_question(&self, request: &QuestionRequest) -> anyhow::Result<String> {
        self.counters.questions.fetch_add(1, Ordering::Relaxed);
        if self.failing_skill.as_deref() == Some(request.skill.as_str()) {
            return Err(GatewayError::ApiError {
                status: 500,
                message: format!("mock failure generating question for {}", request.skill),
            }
            .into());
        }
        Ok(format!(
            "[{} / {}] Tell me about {}.",
            request.question_type, request.difficulty, request.skill
        ))
    }

    async fn generate_reference_answer(
        &self,
        _question: &str,
        _context: &str,
    ) -> anyhow::Result<String> {
        self.counters.reference_answers.fetch_add(1, Ordering::Relaxed);
        Ok(self.reference_answer.clone())
    }

    async fn generate_rationale(
        &self,
        question: &str,
        _reference_answer: &str,
    ) -> anyhow::Result<String> {
        self.counters.rationales.fetch_add(1, Ordering::Relaxed);
        Ok(format!("Checks depth on: {question}"))
    }

    async fn detect_concept_gaps(
        &self,
        request: &GapConfirmationRequest,
    ) -> anyhow::Result<ConceptGapReport> {
        self.counters.gap_confirmations.fetch_add(1, Ordering::Relaxed);
        self.behave(self.gap_behavior, "detect_concept_gaps").await?;
        if self.confirm_gaps {
            Ok(ConceptGapReport {
                concepts: request.keyword_gaps.clone(),
                confirmed: true,
                severity: self.gap_severity,
            })
        } else {
            Ok(ConceptGapReport::default())
        }
    }

    async fn generate_follow_up_question(
        &self,
        request: &FollowUpRequest,
    ) -> anyhow::Result<String> {
        self.counters.follow_ups.fetch_add(1, Ordering::Relaxed);
        self.behave(self.follow_up_behavior, "generate_follow_up_question")
            .await?;
        Ok(format!(
            "Follow-up {}: can you expand on {}?",
            request.order,
            request.missing_concepts.join(", ")
        ))
    }

    async fn evaluate_answer_quality(
        &self,
        _question: &str,
        answer: &str,
    ) -> anyhow::Result<QualitativeEvaluation> {
        let n = self.counters.evaluations.fetch_add(1, Ordering::Relaxed) as usize;
        self.behave(self.evaluation_behavior, "evaluate_answer_quality")
            .await?;
        let score = self.scores[n.min(self.scores.len() - 1)];
        Ok(QualitativeEvaluation {
            score,
            feedback: format!("Answer of {} characters.", answer.chars().count()),
            strengths: vec!["clear structure".into()],
            weaknesses: vec!["could go deeper".into()],
        })
    }

    async fn generate_interview_recommendations(
        &self,
        context: &AggregateContext,
    ) -> anyhow::Result<InterviewRecommendations> {
        self.counters.recommendations.fetch_add(1, Ordering::Relaxed);
        self.behave(self.recommendation_behavior, "generate_interview_recommendations")
            .await?;
        let study_topics = context
            .questions
            .iter()
            .flat_map(|q| q.remaining_gaps.iter().cloned())
            .collect();
        Ok(InterviewRecommendations {
            strengths: vec!["communicates clearly".into()],
            weaknesses: vec![format!("aggregate score {:.1}", context.aggregate_score)],
            study_topics,
            technique_tips: vec!["structure answers as context, action, result".into()],
        })
    }
}

/// Deterministic [`EmbeddingGateway`] backed by an exact-text lookup table.
#[derive(Debug)]
pub struct MockEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    fail: bool,
    calls: AtomicU32,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedder {
    /// Every unknown text maps to the same unit vector (similarity 1.0).
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: vec![1.0, 0.0],
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = vector;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EmbeddingGateway for MockEmbedder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(GatewayError::NetworkError("mock embedder offline".into()).into());
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
