//! Interview planning: question-count sizing, slot distribution, and
//! all-or-nothing generation of the question set.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{GatewayError, InterviewError, InterviewResult};
use crate::model::{
    is_usable_reference_answer, Difficulty, Interview, InterviewStatus, PlanMetadata, Question,
    QuestionType, SkillProfile,
};
use crate::store::Repositories;
use crate::traits::{LanguageModelGateway, QuestionRequest};

/// Upper bound on planned main questions.
pub const MAX_QUESTIONS: usize = 5;

const FALLBACK_SKILL: &str = "general software engineering";

/// Number of main questions for a profile with `skill_count` skills.
///
/// Step function, non-decreasing, capped at [`MAX_QUESTIONS`]. Experience and
/// tenure are deliberately not inputs.
pub fn calculate_question_count(skill_count: usize) -> usize {
    match skill_count {
        0..=2 => 2,
        3..=4 => 3,
        5..=7 => 4,
        _ => MAX_QUESTIONS,
    }
}

/// Question type for slot `index` of `total`: ~60% technical, 30% behavioral, 10% situational.
pub fn question_type_for_slot(index: usize, total: usize) -> QuestionType {
    let position = slot_position(index, total);
    if position < 0.6 {
        QuestionType::Technical
    } else if position < 0.9 {
        QuestionType::Behavioral
    } else {
        QuestionType::Situational
    }
}

/// Difficulty for slot `index` of `total`: ~50% easy, 30% medium, 20% hard.
pub fn difficulty_for_slot(index: usize, total: usize) -> Difficulty {
    let position = slot_position(index, total);
    if position < 0.5 {
        Difficulty::Easy
    } else if position < 0.8 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    }
}

/// Bucket midpoint of a slot in `[0, 1)`.
fn slot_position(index: usize, total: usize) -> f64 {
    (index as f64 + 0.5) / total.max(1) as f64
}

/// One question to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSlot {
    pub index: usize,
    pub skill: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
}

/// Lay out the slots for a profile. Skills are assigned round-robin.
pub fn plan_slots(profile: &SkillProfile) -> Vec<PlanSlot> {
    let total = calculate_question_count(profile.skill_count());
    let fallback = profile
        .target_role
        .clone()
        .unwrap_or_else(|| FALLBACK_SKILL.to_string());

    (0..total)
        .map(|index| PlanSlot {
            index,
            skill: if profile.skills.is_empty() {
                fallback.clone()
            } else {
                profile.skills[index % profile.skills.len()].name.clone()
            },
            question_type: question_type_for_slot(index, total),
            difficulty: difficulty_for_slot(index, total),
        })
        .collect()
}

/// Configuration for the planner.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Maximum concurrent slot generations.
    pub parallelism: usize,
    /// Retries per gateway call on transient errors.
    pub max_retries: u32,
    /// Initial delay between retries (doubles each time).
    pub retry_delay: Duration,
    /// Strategy label recorded in the plan metadata.
    pub strategy: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            strategy: "bucketed-60/30/10-50/30/20".to_string(),
        }
    }
}

/// Generates the full question set and drives an interview to `READY`.
pub struct InterviewPlanner {
    llm: Arc<dyn LanguageModelGateway>,
    repos: Repositories,
    config: PlannerConfig,
}

impl InterviewPlanner {
    pub fn new(
        llm: Arc<dyn LanguageModelGateway>,
        repos: Repositories,
        config: PlannerConfig,
    ) -> Self {
        Self { llm, repos, config }
    }

    /// Plan an interview. All-or-nothing: on any failure the partially
    /// created questions are removed and the interview is cancelled.
    #[instrument(skip(self, profile))]
    pub async fn plan(
        &self,
        candidate_id: &str,
        profile: &SkillProfile,
    ) -> InterviewResult<Interview> {
        let mut interview = Interview::new(candidate_id);
        self.repos
            .interviews
            .save_interview(&interview)
            .await
            .map_err(|e| InterviewError::storage(&e))?;

        match self.generate_questions(interview.id, profile).await {
            Ok(questions) => {
                interview.question_ids = questions.iter().map(|q| q.id).collect();
                interview.plan_metadata = Some(PlanMetadata {
                    question_count: questions.len(),
                    generated_at: Utc::now(),
                    strategy: self.config.strategy.clone(),
                });
                interview.transition_to(InterviewStatus::Ready)?;
                if let Err(e) = self.repos.store_interview(&interview).await {
                    self.abort(&mut interview).await;
                    return Err(e);
                }
                tracing::info!(
                    interview = %interview.id,
                    questions = questions.len(),
                    "interview planned"
                );
                Ok(interview)
            }
            Err(e) => {
                tracing::error!(interview = %interview.id, "planning failed: {e}");
                self.abort(&mut interview).await;
                Err(e)
            }
        }
    }

    /// Generate and persist every slot, returning questions in plan order.
    async fn generate_questions(
        &self,
        interview_id: Uuid,
        profile: &SkillProfile,
    ) -> InterviewResult<Vec<Question>> {
        let slots = plan_slots(profile);
        let context = profile.summary();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for slot in slots {
            let llm = Arc::clone(&self.llm);
            let repos = self.repos.clone();
            let semaphore = Arc::clone(&semaphore);
            let config = self.config.clone();
            let context = context.clone();

            futures.push(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|_| {
                    InterviewError::ExternalGateway {
                        operation: "plan",
                        message: "planning semaphore closed".into(),
                    }
                })?;
                let question =
                    generate_slot(llm.as_ref(), &config, interview_id, &context, &slot).await?;
                repos
                    .questions
                    .save_question(&question)
                    .await
                    .map_err(|e| InterviewError::storage(&e))?;
                Ok::<_, InterviewError>((slot.index, question))
            });
        }

        let mut generated = Vec::with_capacity(futures.len());
        while let Some(result) = futures.next().await {
            // Returning early drops the in-flight slots.
            generated.push(result?);
        }
        generated.sort_by_key(|(index, _)| *index);
        Ok(generated.into_iter().map(|(_, q)| q).collect())
    }

    /// Best-effort cleanup after a failed plan.
    async fn abort(&self, interview: &mut Interview) {
        match self.repos.questions.list_questions(interview.id).await {
            Ok(questions) => {
                for question in questions {
                    if let Err(e) = self.repos.questions.delete_question(question.id).await {
                        tracing::warn!(question = %question.id, "cleanup failed: {e:#}");
                    }
                }
            }
            Err(e) => tracing::warn!(interview = %interview.id, "cleanup listing failed: {e:#}"),
        }

        interview.question_ids.clear();
        interview.plan_metadata = None;
        if interview.transition_to(InterviewStatus::Cancelled).is_ok() {
            if let Err(e) = self.repos.store_interview(interview).await {
                tracing::warn!(interview = %interview.id, "could not persist cancellation: {e}");
            }
        }
    }
}

/// Question text, reference answer, and rationale for one slot.
async fn generate_slot(
    llm: &dyn LanguageModelGateway,
    config: &PlannerConfig,
    interview_id: Uuid,
    context: &str,
    slot: &PlanSlot,
) -> InterviewResult<Question> {
    let request = QuestionRequest {
        context: context.to_string(),
        skill: slot.skill.clone(),
        question_type: slot.question_type,
        difficulty: slot.difficulty,
    };

    let text = with_retry(config, "generate_question", || llm.generate_question(&request)).await?;
    let reference = with_retry(config, "generate_reference_answer", || {
        llm.generate_reference_answer(&text, context)
    })
    .await?;
    if !is_usable_reference_answer(&reference) {
        return Err(InterviewError::ExternalGateway {
            operation: "generate_reference_answer",
            message: format!("reference answer too short for slot {}", slot.index),
        });
    }
    let rationale = with_retry(config, "generate_rationale", || {
        llm.generate_rationale(&text, &reference)
    })
    .await?;

    Ok(Question {
        id: Uuid::new_v4(),
        interview_id,
        text: text.trim().to_string(),
        question_type: slot.question_type,
        difficulty: slot.difficulty,
        reference_answer: Some(reference.trim().to_string()),
        rationale: Some(rationale.trim().to_string()).filter(|r| !r.is_empty()),
        skill_tags: vec![slot.skill.clone()],
        created_at: Utc::now(),
    })
}

/// Retry transient gateway errors with exponential backoff.
async fn with_retry<T, F, Fut>(
    config: &PlannerConfig,
    operation: &'static str,
    mut call: F,
) -> InterviewResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut last_error = None;
    let mut retry_delay = config.retry_delay;
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            tokio::time::sleep(retry_delay).await;
            retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
        }
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if let Some(gateway_error) = e.downcast_ref::<GatewayError>() {
                    if gateway_error.is_permanent() {
                        return Err(InterviewError::gateway(operation, &e));
                    }
                    if let Some(ms) = gateway_error.retry_after_ms() {
                        retry_delay = Duration::from_millis(ms);
                    }
                }
                tracing::warn!(operation, attempt, "gateway call failed: {e:#}");
                last_error = Some(e);
            }
        }
    }

    let err = last_error.unwrap_or_else(|| anyhow::anyhow!("unknown error"));
    Err(InterviewError::gateway(operation, &err))
}
