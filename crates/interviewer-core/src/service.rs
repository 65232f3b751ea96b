//! The public entry point: plan, start, evaluate, complete, cancel.
//!
//! Every mutating operation on an interview holds that interview's lock, so
//! concurrent callers see a serialized history per interview.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;
use uuid::Uuid;

use crate::completion::{CompletionConfig, InterviewCompletionAggregator};
use crate::error::{InterviewError, InterviewResult};
use crate::evaluator::{AdaptiveEvaluator, EvaluationResult, EvaluatorConfig};
use crate::model::{Deliverable, FollowUpQuestion, Interview, InterviewStatus, SkillProfile};
use crate::planner::{InterviewPlanner, PlannerConfig};
use crate::report::CompletionSummary;
use crate::store::Repositories;
use crate::traits::{EmbeddingGateway, LanguageModelGateway};

/// Per-interview async locks, created on first use.
#[derive(Default)]
pub struct InterviewLocks {
    locks: RwLock<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl InterviewLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_lock(&self, interview_id: Uuid) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(&interview_id) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().await;
        locks
            .entry(interview_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop locks nobody is holding, including those of ids that never existed.
    pub async fn cleanup_unused(&self) {
        let mut locks = self.locks.write().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

/// Engine configuration, one section per component.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub planner: PlannerConfig,
    pub evaluator: EvaluatorConfig,
    pub completion: CompletionConfig,
}

pub struct InterviewService {
    repos: Repositories,
    planner: InterviewPlanner,
    evaluator: AdaptiveEvaluator,
    aggregator: InterviewCompletionAggregator,
    locks: InterviewLocks,
}

impl InterviewService {
    pub fn new(
        llm: Arc<dyn LanguageModelGateway>,
        embedder: Arc<dyn EmbeddingGateway>,
        repos: Repositories,
        config: ServiceConfig,
    ) -> Self {
        Self {
            planner: InterviewPlanner::new(Arc::clone(&llm), repos.clone(), config.planner),
            evaluator: AdaptiveEvaluator::new(
                Arc::clone(&llm),
                embedder,
                repos.clone(),
                config.evaluator,
            ),
            aggregator: InterviewCompletionAggregator::new(llm, repos.clone(), config.completion),
            repos,
            locks: InterviewLocks::new(),
        }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    pub async fn interview(&self, interview_id: Uuid) -> InterviewResult<Interview> {
        self.repos.load_interview(interview_id).await
    }

    /// Create and plan a new interview. The result is `READY`.
    pub async fn plan(
        &self,
        candidate_id: &str,
        profile: &SkillProfile,
    ) -> InterviewResult<Interview> {
        if candidate_id.trim().is_empty() {
            return Err(InterviewError::InvalidInput("candidate id is empty".into()));
        }
        self.planner.plan(candidate_id, profile).await
    }

    #[instrument(skip(self))]
    pub async fn start(&self, interview_id: Uuid) -> InterviewResult<Interview> {
        let lock = self.locks.get_lock(interview_id).await;
        let _guard = lock.lock().await;

        let mut interview = self.repos.load_interview(interview_id).await?;
        interview.transition_to(InterviewStatus::InProgress)?;
        self.repos.store_interview(&interview).await?;
        Ok(interview)
    }

    /// Evaluate an answer; the plan position moves on once the active main
    /// question needs no further follow-up.
    ///
    /// Only the active main question (while unanswered) and its unanswered
    /// follow-ups accept answers.
    #[instrument(skip(self, answer_text))]
    pub async fn evaluate(
        &self,
        interview_id: Uuid,
        question_id: Uuid,
        answer_text: &str,
    ) -> InterviewResult<EvaluationResult> {
        let lock = self.locks.get_lock(interview_id).await;
        let _guard = lock.lock().await;

        let interview = self.repos.load_interview(interview_id).await?;
        interview.require_status(InterviewStatus::InProgress, InterviewStatus::InProgress)?;
        let awaiting = self
            .delivery_queue(&interview)
            .await?
            .is_some_and(|queue| queue.accepts(question_id));
        if !awaiting {
            let known = interview.question_ids.contains(&question_id)
                || interview.adaptive_follow_up_ids.contains(&question_id);
            return Err(if known {
                InterviewError::InvalidInput(format!(
                    "question {question_id} is not awaiting an answer"
                ))
            } else {
                InterviewError::not_found("question", question_id)
            });
        }

        let result = self
            .evaluator
            .evaluate(interview_id, question_id, answer_text)
            .await?;

        if !result.follow_up_generated() {
            let mut interview = self.repos.load_interview(interview_id).await?;
            if interview.active_question_id() == Some(result.parent_question_id) {
                interview.current_question_index += 1;
                interview.updated_at = Utc::now();
                self.repos.store_interview(&interview).await?;
                tracing::debug!(
                    position = interview.current_question_index,
                    total = interview.question_ids.len(),
                    "advanced to next main question"
                );
            }
        }
        Ok(result)
    }

    pub async fn complete(&self, interview_id: Uuid) -> InterviewResult<CompletionSummary> {
        let lock = self.locks.get_lock(interview_id).await;
        let guard = lock.lock().await;
        let summary = self.aggregator.complete(interview_id).await?;

        drop(guard);
        drop(lock);
        self.locks.cleanup_unused().await;
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, interview_id: Uuid) -> InterviewResult<Interview> {
        let lock = self.locks.get_lock(interview_id).await;
        let guard = lock.lock().await;

        let mut interview = self.repos.load_interview(interview_id).await?;
        interview.transition_to(InterviewStatus::Cancelled)?;
        self.repos.store_interview(&interview).await?;

        drop(guard);
        drop(lock);
        self.locks.cleanup_unused().await;
        Ok(interview)
    }

    /// What to put in front of the candidate next.
    ///
    /// The oldest unanswered follow-up of the active main question, then the
    /// active main question itself if unanswered; `None` once the plan is
    /// exhausted.
    pub async fn get_next_deliverable(
        &self,
        interview_id: Uuid,
    ) -> InterviewResult<Option<Deliverable>> {
        let lock = self.locks.get_lock(interview_id).await;
        let _guard = lock.lock().await;

        let interview = self.repos.load_interview(interview_id).await?;
        interview.require_status(InterviewStatus::InProgress, InterviewStatus::InProgress)?;
        let Some(queue) = self.delivery_queue(&interview).await? else {
            return Ok(None);
        };

        if let Some(follow_up) = queue.follow_ups.into_iter().next() {
            return Ok(Some(Deliverable::FollowUp(follow_up)));
        }
        if queue.main_answered {
            return Ok(None);
        }
        let question = self
            .repos
            .load_question(queue.active)
            .await?
            .ok_or_else(|| InterviewError::not_found("question", queue.active))?;
        Ok(Some(Deliverable::Main(question)))
    }

    /// Open deliverables at the current plan position; `None` once the plan is
    /// exhausted.
    async fn delivery_queue(
        &self,
        interview: &Interview,
    ) -> InterviewResult<Option<DeliveryQueue>> {
        let Some(active) = interview.active_question_id() else {
            return Ok(None);
        };

        let answered: HashSet<Uuid> = self
            .repos
            .answers
            .list_answers(interview.id)
            .await
            .map_err(|e| InterviewError::storage(&e))?
            .into_iter()
            .map(|a| a.question_id)
            .collect();

        let mut follow_ups: Vec<_> = self
            .repos
            .follow_ups
            .list_follow_ups(interview.id)
            .await
            .map_err(|e| InterviewError::storage(&e))?
            .into_iter()
            .filter(|f| f.parent_question_id == active && !answered.contains(&f.id))
            .collect();
        follow_ups.sort_by_key(|f| f.order_in_sequence);

        Ok(Some(DeliveryQueue {
            active,
            main_answered: answered.contains(&active),
            follow_ups,
        }))
    }
}

/// The active main question and its unanswered follow-ups, oldest first.
struct DeliveryQueue {
    active: Uuid,
    main_answered: bool,
    follow_ups: Vec<FollowUpQuestion>,
}

impl DeliveryQueue {
    fn accepts(&self, question_id: Uuid) -> bool {
        (question_id == self.active && !self.main_answered)
            || self.follow_ups.iter().any(|f| f.id == question_id)
    }
}
