//! Interview completion: per-question attempt history, aggregate scoring, and
//! recommendations.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{InterviewError, InterviewResult};
use crate::model::InterviewStatus;
use crate::report::CompletionSummary;
use crate::scoring::{
    aggregate_score, build_outcomes, speaking_average, theoretical_average, NEUTRAL_SPEAKING_SCORE,
};
use crate::store::Repositories;
use crate::traits::{AggregateContext, LanguageModelGateway, QuestionDigest};

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Speaking average used when no answer carries a voice signal.
    pub neutral_speaking_score: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            neutral_speaking_score: NEUTRAL_SPEAKING_SCORE,
        }
    }
}

pub struct InterviewCompletionAggregator {
    llm: Arc<dyn LanguageModelGateway>,
    repos: Repositories,
    config: CompletionConfig,
}

impl InterviewCompletionAggregator {
    pub fn new(
        llm: Arc<dyn LanguageModelGateway>,
        repos: Repositories,
        config: CompletionConfig,
    ) -> Self {
        Self { llm, repos, config }
    }

    /// Summarize an in-progress interview and mark it `COMPLETED`.
    ///
    /// Nothing is written unless the recommendations call succeeds.
    #[instrument(skip(self))]
    pub async fn complete(&self, interview_id: Uuid) -> InterviewResult<CompletionSummary> {
        let mut interview = self.repos.load_interview(interview_id).await?;
        interview.require_status(InterviewStatus::InProgress, InterviewStatus::Completed)?;

        let questions = self.repos.planned_questions(&interview).await?;
        let answers = self
            .repos
            .answers
            .list_answers(interview_id)
            .await
            .map_err(|e| InterviewError::storage(&e))?;
        let follow_ups = self
            .repos
            .follow_ups
            .list_follow_ups(interview_id)
            .await
            .map_err(|e| InterviewError::storage(&e))?;

        let outcomes = build_outcomes(&questions, &answers, &follow_ups);
        let theoretical_avg = theoretical_average(&outcomes);
        let speaking_avg = speaking_average(&answers, self.config.neutral_speaking_score);
        let aggregate = aggregate_score(theoretical_avg, speaking_avg);

        let context = AggregateContext {
            candidate_id: interview.candidate_id.clone(),
            aggregate_score: aggregate,
            theoretical_avg,
            speaking_avg,
            questions: outcomes
                .iter()
                .map(|o| QuestionDigest {
                    question: o.question_text.clone(),
                    final_score: o.final_score(),
                    follow_up_count: o.follow_up_count,
                    gap_filled_count: o.gap_filled_count,
                    remaining_gaps: o.last_attempt_gaps.clone(),
                })
                .collect(),
        };
        let recommendations = self
            .llm
            .generate_interview_recommendations(&context)
            .await
            .map_err(|e| InterviewError::gateway("generate_interview_recommendations", &e))?;

        let summary = CompletionSummary {
            interview_id,
            candidate_id: interview.candidate_id.clone(),
            created_at: Utc::now(),
            total_follow_ups: follow_ups.len(),
            questions: outcomes,
            theoretical_avg,
            speaking_avg,
            aggregate_score: aggregate,
            recommendations,
        };

        interview.transition_to(InterviewStatus::Completed)?;
        interview.summary = Some(summary.clone());
        self.repos.store_interview(&interview).await?;

        tracing::info!(
            interview = %interview_id,
            aggregate,
            answered = summary.questions.iter().filter(|q| q.is_answered()).count(),
            "interview completed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBehavior, MockLanguageModel};
    use crate::model::{
        Answer, Difficulty, FollowUpQuestion, GapAnalysis, Interview, QualitativeEvaluation,
        Question, QuestionType, Severity,
    };
    use crate::traits::{
        AnswerRepository, FollowUpRepository, InterviewRepository, QuestionRepository,
    };
    use chrono::Duration;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn in_progress(repos: &Repositories, question_count: usize) -> (Interview, Vec<Question>) {
        let mut interview = Interview::new("cand-7");
        let mut questions = Vec::new();
        for i in 0..question_count {
            let question = Question {
                id: Uuid::new_v4(),
                interview_id: interview.id,
                text: format!("Question {i}"),
                question_type: QuestionType::Technical,
                difficulty: Difficulty::Easy,
                reference_answer: Some("a sufficiently long reference answer".into()),
                rationale: None,
                skill_tags: vec![],
                created_at: Utc::now(),
            };
            repos.questions.save_question(&question).await.unwrap();
            interview.question_ids.push(question.id);
            questions.push(question);
        }
        interview.transition_to(InterviewStatus::Ready).unwrap();
        interview.transition_to(InterviewStatus::InProgress).unwrap();
        repos.interviews.save_interview(&interview).await.unwrap();
        (interview, questions)
    }

    fn answer(interview: &Interview, question_id: Uuid, score: f64, gaps: &[&str], at: i64) -> Answer {
        Answer {
            id: Uuid::new_v4(),
            question_id,
            interview_id: interview.id,
            text: "answer".into(),
            similarity_score: Some(0.5),
            gaps: GapAnalysis {
                missing_concepts: strings(gaps),
                keyword_gaps: strings(gaps),
                confirmed: !gaps.is_empty(),
                severity: Severity::Minor,
            },
            evaluation: QualitativeEvaluation {
                score,
                ..Default::default()
            },
            speaking_score: None,
            created_at: Utc::now() + Duration::seconds(at),
        }
    }

    #[tokio::test]
    async fn complete_aggregates_and_transitions() {
        let (_store, repos) = Repositories::in_memory();
        let (interview, questions) = in_progress(&repos, 3).await;

        let follow_up = FollowUpQuestion {
            id: Uuid::new_v4(),
            parent_question_id: questions[0].id,
            interview_id: interview.id,
            text: "Go deeper".into(),
            generated_reason: "gap".into(),
            target_concepts: strings(&["lock", "mutex"]),
            severity: Severity::Minor,
            order_in_sequence: 1,
            created_at: Utc::now(),
        };
        repos.follow_ups.save_follow_up(&follow_up).await.unwrap();
        for a in [
            answer(&interview, questions[0].id, 40.0, &["lock", "mutex"], 0),
            answer(&interview, follow_up.id, 80.0, &["mutex"], 1),
            answer(&interview, questions[1].id, 60.0, &[], 2),
        ] {
            repos.answers.save_answer(&a).await.unwrap();
        }

        let llm = Arc::new(MockLanguageModel::new());
        let aggregator =
            InterviewCompletionAggregator::new(llm.clone(), repos.clone(), CompletionConfig::default());
        let summary = aggregator.complete(interview.id).await.unwrap();

        assert_eq!(summary.questions.len(), 3);
        assert_eq!(summary.questions[0].score_progression, vec![40.0, 80.0]);
        assert_eq!(summary.questions[0].gap_filled_count, 1);
        assert!(!summary.questions[2].is_answered());
        assert_eq!(summary.total_follow_ups, 1);
        // (80 + 60) / 2, unanswered excluded.
        assert!((summary.theoretical_avg - 70.0).abs() < 1e-9);
        assert_eq!(summary.speaking_avg, NEUTRAL_SPEAKING_SCORE);
        assert!((summary.aggregate_score - (70.0 * 0.7 + 50.0 * 0.3)).abs() < 1e-9);
        assert_eq!(summary.recommendations.study_topics, strings(&["mutex"]));

        let stored = repos.load_interview(interview.id).await.unwrap();
        assert_eq!(stored.status, InterviewStatus::Completed);
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.summary.unwrap().aggregate_score, summary.aggregate_score);
        assert_eq!(llm.calls().recommendations, 1);
    }

    #[tokio::test]
    async fn no_answers_gives_zero_theoretical() {
        let (_store, repos) = Repositories::in_memory();
        let (interview, _) = in_progress(&repos, 2).await;
        let aggregator = InterviewCompletionAggregator::new(
            Arc::new(MockLanguageModel::new()),
            repos,
            CompletionConfig::default(),
        );
        let summary = aggregator.complete(interview.id).await.unwrap();
        assert_eq!(summary.theoretical_avg, 0.0);
        assert!((summary.aggregate_score - 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn complete_on_ready_interview_is_rejected() {
        let (_store, repos) = Repositories::in_memory();
        let mut interview = Interview::new("cand-1");
        interview.transition_to(InterviewStatus::Ready).unwrap();
        repos.interviews.save_interview(&interview).await.unwrap();

        let llm = Arc::new(MockLanguageModel::new());
        let aggregator =
            InterviewCompletionAggregator::new(llm.clone(), repos, CompletionConfig::default());
        let err = aggregator.complete(interview.id).await.unwrap_err();
        assert!(matches!(
            err,
            InterviewError::InvalidStateTransition {
                from: InterviewStatus::Ready,
                to: InterviewStatus::Completed
            }
        ));
        assert_eq!(llm.calls().recommendations, 0);
    }

    #[tokio::test]
    async fn recommendation_failure_keeps_interview_in_progress() {
        let (_store, repos) = Repositories::in_memory();
        let (interview, _) = in_progress(&repos, 2).await;
        let llm = Arc::new(
            MockLanguageModel::new().with_recommendation_behavior(MockBehavior::Fail),
        );
        let aggregator =
            InterviewCompletionAggregator::new(llm, repos.clone(), CompletionConfig::default());

        let err = aggregator.complete(interview.id).await.unwrap_err();
        assert!(matches!(err, InterviewError::ExternalGateway { .. }));
        let stored = repos.load_interview(interview.id).await.unwrap();
        assert_eq!(stored.status, InterviewStatus::InProgress);
        assert!(stored.summary.is_none());
    }
}
