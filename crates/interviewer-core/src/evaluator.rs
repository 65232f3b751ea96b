//! Adaptive answer evaluation: similarity, hybrid gap detection, grading,
//! and the follow-up decision.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{InterviewError, InterviewResult};
use crate::keywords::{KeywordGapExtractor, DEFAULT_GAP_CAP};
use crate::lifecycle::EvaluationPhase;
use crate::model::{
    Answer, FollowUpQuestion, GapAnalysis, InterviewStatus, Question, Severity,
    MAX_FOLLOW_UPS_PER_QUESTION,
};
use crate::scoring::similarity_score;
use crate::store::Repositories;
use crate::traits::{
    EmbeddingGateway, FollowUpRequest, GapConfirmationRequest, LanguageModelGateway,
};

/// Similarity at or above which an answer is considered close enough.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Budget for gap confirmation and follow-up generation.
    pub secondary_call_timeout: Duration,
    pub keyword_gap_cap: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            secondary_call_timeout: Duration::from_secs(20),
            keyword_gap_cap: DEFAULT_GAP_CAP,
        }
    }
}

/// What happened to one answer.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub answer: Answer,
    /// Main question the answered deliverable belongs to.
    pub parent_question_id: Uuid,
    pub follow_up: Option<FollowUpQuestion>,
    pub phase: EvaluationPhase,
}

impl EvaluationResult {
    pub fn follow_up_generated(&self) -> bool {
        self.follow_up.is_some()
    }
}

/// Outcome of the follow-up policy for one evaluated answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpDecision {
    Generate,
    Satisfied,
    LimitReached,
}

impl FollowUpDecision {
    fn phase(self) -> EvaluationPhase {
        match self {
            FollowUpDecision::Generate => EvaluationPhase::FollowUpNeeded,
            FollowUpDecision::Satisfied => EvaluationPhase::Satisfied,
            FollowUpDecision::LimitReached => EvaluationPhase::FollowUpLimitReached,
        }
    }
}

/// Continue only while similarity is below threshold and a gap is confirmed.
///
/// A missing similarity score stops the loop.
pub fn decide_follow_up(
    existing_follow_ups: usize,
    similarity: Option<f64>,
    gaps_confirmed: bool,
) -> FollowUpDecision {
    if existing_follow_ups >= MAX_FOLLOW_UPS_PER_QUESTION as usize {
        return FollowUpDecision::LimitReached;
    }
    match similarity {
        Some(score) if score < SIMILARITY_THRESHOLD && gaps_confirmed => FollowUpDecision::Generate,
        _ => FollowUpDecision::Satisfied,
    }
}

/// The answered deliverable, resolved to its main question.
struct Target {
    deliverable_id: Uuid,
    parent: Question,
    reference: String,
}

impl Target {
    fn is_follow_up(&self) -> bool {
        self.deliverable_id != self.parent.id
    }
}

pub struct AdaptiveEvaluator {
    llm: Arc<dyn LanguageModelGateway>,
    embedder: Arc<dyn EmbeddingGateway>,
    repos: Repositories,
    keywords: KeywordGapExtractor,
    config: EvaluatorConfig,
}

impl AdaptiveEvaluator {
    pub fn new(
        llm: Arc<dyn LanguageModelGateway>,
        embedder: Arc<dyn EmbeddingGateway>,
        repos: Repositories,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            llm,
            embedder,
            repos,
            keywords: KeywordGapExtractor::new(config.keyword_gap_cap),
            config,
        }
    }

    /// Evaluate an answer to a main question or a follow-up.
    ///
    /// Only the qualitative grade is mandatory; similarity, gap confirmation,
    /// and follow-up generation degrade to "no signal" on failure.
    #[instrument(skip(self, answer_text))]
    pub async fn evaluate(
        &self,
        interview_id: Uuid,
        question_id: Uuid,
        answer_text: &str,
    ) -> InterviewResult<EvaluationResult> {
        let answer_text = answer_text.trim();
        if answer_text.is_empty() {
            return Err(InterviewError::InvalidInput("answer text is empty".into()));
        }

        let mut interview = self.repos.load_interview(interview_id).await?;
        interview.require_status(InterviewStatus::InProgress, InterviewStatus::InProgress)?;
        let target = self.resolve(interview_id, question_id).await?;
        let phase =
            EvaluationPhase::submitted(target.is_follow_up()).advance(EvaluationPhase::Evaluating);

        let (similarity, gaps, evaluation) = tokio::join!(
            self.similarity(answer_text, &target.reference),
            self.gap_analysis(&target, answer_text),
            self.llm
                .evaluate_answer_quality(&target.parent.text, answer_text),
        );
        let mut evaluation =
            evaluation.map_err(|e| InterviewError::gateway("evaluate_answer_quality", &e))?;
        if !evaluation.score.is_finite() {
            return Err(InterviewError::ExternalGateway {
                operation: "evaluate_answer_quality",
                message: format!("score {} is not a finite number", evaluation.score),
            });
        }
        evaluation.score = evaluation.score.clamp(0.0, 100.0);

        let answer = Answer {
            id: Uuid::new_v4(),
            question_id: target.deliverable_id,
            interview_id,
            text: answer_text.to_string(),
            similarity_score: similarity,
            gaps,
            evaluation,
            speaking_score: None,
            created_at: Utc::now(),
        };
        self.repos
            .answers
            .save_answer(&answer)
            .await
            .map_err(|e| InterviewError::storage(&e))?;

        let existing = self
            .repos
            .follow_ups
            .count_follow_ups(interview_id, target.parent.id)
            .await
            .map_err(|e| InterviewError::storage(&e))?;
        let decision = decide_follow_up(existing, answer.similarity_score, answer.gaps.confirmed);
        tracing::debug!(?decision, existing, similarity = ?answer.similarity_score, "follow-up decision");

        let follow_up = match decision {
            FollowUpDecision::Generate => {
                let order = u8::try_from(existing + 1).unwrap_or(MAX_FOLLOW_UPS_PER_QUESTION);
                self.generate_follow_up(&target, &answer, order).await
            }
            _ => None,
        };

        let outcome = match &follow_up {
            Some(follow_up) => {
                self.repos
                    .follow_ups
                    .save_follow_up(follow_up)
                    .await
                    .map_err(|e| InterviewError::storage(&e))?;
                interview.adaptive_follow_up_ids.push(follow_up.id);
                interview.updated_at = Utc::now();
                self.repos.store_interview(&interview).await?;
                EvaluationPhase::FollowUpNeeded
            }
            // Generation failed open: the loop stops for this question.
            None if decision == FollowUpDecision::Generate => EvaluationPhase::Satisfied,
            None => decision.phase(),
        };
        let phase = phase.advance(outcome);

        Ok(EvaluationResult {
            answer,
            parent_question_id: target.parent.id,
            follow_up,
            phase,
        })
    }

    async fn resolve(&self, interview_id: Uuid, question_id: Uuid) -> InterviewResult<Target> {
        let (deliverable_interview, parent) =
            if let Some(question) = self.repos.load_question(question_id).await? {
                (question.interview_id, question)
            } else if let Some(follow_up) = self.repos.load_follow_up(question_id).await? {
                let parent = self
                    .repos
                    .load_question(follow_up.parent_question_id)
                    .await?
                    .ok_or_else(|| {
                        InterviewError::not_found("question", follow_up.parent_question_id)
                    })?;
                (follow_up.interview_id, parent)
            } else {
                return Err(InterviewError::not_found("question", question_id));
            };

        if deliverable_interview != interview_id || parent.interview_id != interview_id {
            return Err(InterviewError::not_found("question", question_id));
        }

        let reference = match parent.reference_answer.as_deref() {
            Some(reference) if parent.is_planned() => reference.to_string(),
            _ => {
                return Err(InterviewError::NotPlanned {
                    question_id: parent.id.to_string(),
                })
            }
        };

        Ok(Target {
            deliverable_id: question_id,
            parent,
            reference,
        })
    }

    async fn similarity(&self, answer: &str, reference: &str) -> Option<f64> {
        let embedded = futures::future::try_join(
            self.embedder.embed(answer),
            self.embedder.embed(reference),
        )
        .await;
        match embedded {
            Ok((a, b)) => Some(similarity_score(&a, &b)),
            Err(e) => {
                tracing::warn!(embedder = self.embedder.name(), "embedding failed, similarity unset: {e:#}");
                None
            }
        }
    }

    /// Keyword filter first; the model only confirms when the filter found something.
    async fn gap_analysis(&self, target: &Target, answer: &str) -> GapAnalysis {
        let keyword_gaps = self.keywords.detect_keyword_gaps(&target.reference, answer);
        if keyword_gaps.is_empty() {
            return GapAnalysis::default();
        }

        let request = GapConfirmationRequest {
            question: target.parent.text.clone(),
            answer: answer.to_string(),
            reference_answer: target.reference.clone(),
            keyword_gaps: keyword_gaps.clone(),
        };
        let confirmation = tokio::time::timeout(
            self.config.secondary_call_timeout,
            self.llm.detect_concept_gaps(&request),
        )
        .await;

        match confirmation {
            Ok(Ok(report)) => {
                let confirmed = report.confirmed && !report.concepts.is_empty();
                GapAnalysis {
                    missing_concepts: if confirmed { report.concepts } else { Vec::new() },
                    keyword_gaps,
                    confirmed,
                    severity: if confirmed { report.severity } else { Severity::None },
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("gap confirmation failed, treating as unconfirmed: {e:#}");
                unconfirmed(keyword_gaps)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.secondary_call_timeout.as_secs(),
                    "gap confirmation timed out, treating as unconfirmed"
                );
                unconfirmed(keyword_gaps)
            }
        }
    }

    async fn generate_follow_up(
        &self,
        target: &Target,
        answer: &Answer,
        order: u8,
    ) -> Option<FollowUpQuestion> {
        let request = FollowUpRequest {
            parent_question: target.parent.text.clone(),
            answer: answer.text.clone(),
            missing_concepts: answer.gaps.missing_concepts.clone(),
            severity: answer.gaps.severity,
            order,
        };
        let generated = tokio::time::timeout(
            self.config.secondary_call_timeout,
            self.llm.generate_follow_up_question(&request),
        )
        .await;

        let text = match generated {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) => {
                tracing::warn!("follow-up generation returned empty text, stopping");
                return None;
            }
            Ok(Err(e)) => {
                tracing::warn!("follow-up generation failed, stopping: {e:#}");
                return None;
            }
            Err(_) => {
                tracing::warn!("follow-up generation timed out, stopping");
                return None;
            }
        };

        Some(FollowUpQuestion {
            id: Uuid::new_v4(),
            parent_question_id: target.parent.id,
            interview_id: answer.interview_id,
            text,
            generated_reason: format!(
                "similarity {:.2} below {SIMILARITY_THRESHOLD}; missing: {}",
                answer.similarity_score.unwrap_or_default(),
                answer.gaps.missing_concepts.join(", ")
            ),
            target_concepts: answer.gaps.missing_concepts.clone(),
            severity: answer.gaps.severity,
            order_in_sequence: order,
            created_at: Utc::now(),
        })
    }
}

fn unconfirmed(keyword_gaps: Vec<String>) -> GapAnalysis {
    GapAnalysis {
        keyword_gaps,
        ..GapAnalysis::default()
    }
}
