//! Whole-engine scenarios against the in-memory store and fixed-output gateways.
//!
//! These drive `InterviewService` the way a session would: plan, start, answer
//! deliverables in order, complete.

use std::sync::Arc;
use std::time::Duration;

use interviewer_core::error::InterviewError;
use interviewer_core::lifecycle::EvaluationPhase;
use interviewer_core::mock::{MockBehavior, MockEmbedder, MockLanguageModel};
use interviewer_core::model::{InterviewStatus, SkillProfile};
use interviewer_core::service::{InterviewService, ServiceConfig};
use interviewer_core::store::{InMemoryStore, Repositories};

const REFERENCE: &str = "A complete reference answer covering the core concepts.";

fn skills(n: usize) -> SkillProfile {
    SkillProfile::from_names((0..n).map(|i| format!("skill-{i}")))
}

fn config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.planner.max_retries = 0;
    config.planner.retry_delay = Duration::from_millis(1);
    config
}

fn make_service(
    llm: Arc<MockLanguageModel>,
    embedder: Arc<MockEmbedder>,
) -> (Arc<InMemoryStore>, InterviewService) {
    let (store, repos) = Repositories::in_memory();
    (store, InterviewService::new(llm, embedder, repos, config()))
}

/// Every non-reference text embeds orthogonally to the reference: similarity 0.
fn distant_embedder() -> MockEmbedder {
    MockEmbedder::new()
        .with_vector(REFERENCE, vec![1.0, 0.0])
        .with_fallback(vec![0.0, 1.0])
}

// --- Planning sizes ---

#[tokio::test]
async fn scenario_plan_sizes_follow_skill_count() {
    for (skill_count, expected) in [(1usize, 2usize), (6, 4), (12, 5)] {
        let (_store, svc) = make_service(
            Arc::new(MockLanguageModel::new()),
            Arc::new(MockEmbedder::new()),
        );
        let interview = svc.plan("cand", &skills(skill_count)).await.unwrap();
        assert_eq!(interview.question_ids.len(), expected, "skills={skill_count}");
        assert_eq!(interview.status, InterviewStatus::Ready);
    }
}

// --- Adaptive loop ---

#[tokio::test]
async fn scenario_close_answer_skips_gap_confirmation() {
    let llm = Arc::new(MockLanguageModel::new());
    let embedder = Arc::new(
        MockEmbedder::new()
            .with_vector(REFERENCE, vec![1.0, 0.0])
            .with_vector("close enough", vec![0.95, (1.0f32 - 0.95 * 0.95).sqrt()]),
    );
    let (_store, svc) = make_service(llm.clone(), embedder);
    let interview = svc.plan("cand", &skills(1)).await.unwrap();
    svc.start(interview.id).await.unwrap();

    let q = interview.question_ids[0];
    // Same keywords as the reference, so the lexical filter finds nothing.
    let result = svc.evaluate(interview.id, q, REFERENCE).await.unwrap();
    assert!(!result.follow_up_generated());
    assert_eq!(llm.calls().gap_confirmations, 0);

    let q2 = interview.question_ids[1];
    let result = svc.evaluate(interview.id, q2, "close enough").await.unwrap();
    let score = result.answer.similarity_score.unwrap();
    assert!((score - 0.95).abs() < 1e-4);
    assert!(!result.follow_up_generated());
}

#[tokio::test]
async fn scenario_three_follow_ups_then_stop() {
    let llm = Arc::new(MockLanguageModel::new());
    let (store, svc) = make_service(llm.clone(), Arc::new(distant_embedder()));
    let interview = svc.plan("cand", &skills(1)).await.unwrap();
    svc.start(interview.id).await.unwrap();

    let main = interview.question_ids[0];
    let mut orders = Vec::new();
    let mut phases = Vec::new();
    for _ in 0..4 {
        let next = svc.get_next_deliverable(interview.id).await.unwrap().unwrap();
        assert_eq!(next.parent_question_id(), main);
        let result = svc
            .evaluate(interview.id, next.id(), "I am not sure")
            .await
            .unwrap();
        phases.push(result.phase);
        if let Some(f) = result.follow_up {
            orders.push(f.order_in_sequence);
        }
    }
    assert_eq!(orders, vec![1, 2, 3]);
    assert_eq!(
        phases,
        vec![
            EvaluationPhase::FollowUpNeeded,
            EvaluationPhase::FollowUpNeeded,
            EvaluationPhase::FollowUpNeeded,
            EvaluationPhase::FollowUpLimitReached,
        ]
    );

    // The plan moved on to the second main question.
    let next = svc.get_next_deliverable(interview.id).await.unwrap().unwrap();
    assert_eq!(next.id(), interview.question_ids[1]);

    let snapshot = store.snapshot().await;
    assert_eq!(
        snapshot
            .follow_ups
            .iter()
            .filter(|f| f.parent_question_id == main)
            .count(),
        3
    );
    assert!(snapshot
        .answers
        .iter()
        .all(|a| a.similarity_score.map_or(true, |s| (0.0..=1.0).contains(&s))));
}

#[tokio::test]
async fn scenario_complete_on_ready_is_rejected() {
    let (_store, svc) = make_service(
        Arc::new(MockLanguageModel::new()),
        Arc::new(MockEmbedder::new()),
    );
    let interview = svc.plan("cand", &skills(2)).await.unwrap();
    let err = svc.complete(interview.id).await.unwrap_err();
    assert!(matches!(
        err,
        InterviewError::InvalidStateTransition {
            from: InterviewStatus::Ready,
            to: InterviewStatus::Completed,
        }
    ));
}

// --- Failure handling ---

#[tokio::test]
async fn failing_slot_leaves_no_questions_and_cancelled_interview() {
    let llm = Arc::new(MockLanguageModel::new().failing_questions_for("skill-2"));
    let (store, svc) = make_service(llm, Arc::new(MockEmbedder::new()));

    let err = svc.plan("cand", &skills(6)).await.unwrap_err();
    assert!(matches!(err, InterviewError::ExternalGateway { .. }));

    let snapshot = store.snapshot().await;
    assert!(snapshot.questions.is_empty());
    assert_eq!(snapshot.interviews.len(), 1);
    assert_eq!(snapshot.interviews[0].status, InterviewStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn gap_confirmation_timeout_still_returns_evaluation() {
    let llm = Arc::new(
        MockLanguageModel::new()
            .with_gap_behavior(MockBehavior::Hang)
            .with_scores(vec![42.0]),
    );
    let (_store, svc) = make_service(llm.clone(), Arc::new(distant_embedder()));
    let interview = svc.plan("cand", &skills(1)).await.unwrap();
    svc.start(interview.id).await.unwrap();

    let result = svc
        .evaluate(interview.id, interview.question_ids[0], "something unrelated")
        .await
        .unwrap();
    assert!(!result.answer.gaps.confirmed);
    assert_eq!(result.answer.evaluation.score, 42.0);
    assert!(!result.follow_up_generated());
    assert_eq!(llm.calls().follow_ups, 0);
}

// --- Concurrency ---

#[tokio::test(start_paused = true)]
async fn concurrent_answers_to_one_question_are_serialized() {
    // Follow-up generation yields for a while so the calls would interleave
    // without the per-interview lock.
    let llm = Arc::new(
        MockLanguageModel::new()
            .with_follow_up_behavior(MockBehavior::Hang)
            .with_hang_duration(Duration::from_millis(50)),
    );
    let (store, svc) = make_service(llm, Arc::new(distant_embedder()));
    let interview = svc.plan("cand", &skills(3)).await.unwrap();
    svc.start(interview.id).await.unwrap();
    let first = interview.question_ids[0];

    let (a, b, c) = tokio::join!(
        svc.evaluate(interview.id, first, "unsure"),
        svc.evaluate(interview.id, first, "unsure"),
        svc.evaluate(interview.id, first, "unsure"),
    );
    let results = [a, b, c];
    let accepted: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(accepted.len(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, InterviewError::InvalidInput(_))));

    let follow_up = accepted[0].follow_up.as_ref().unwrap();
    let stored = svc.interview(interview.id).await.unwrap();
    assert_eq!(stored.adaptive_follow_up_ids, vec![follow_up.id]);

    // The follow-up answer goes through as well and its own follow-up is kept.
    let second = svc
        .evaluate(interview.id, follow_up.id, "still unsure")
        .await
        .unwrap();
    let stored = svc.interview(interview.id).await.unwrap();
    assert_eq!(
        stored.adaptive_follow_up_ids,
        vec![follow_up.id, second.follow_up.unwrap().id]
    );

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.answers.len(), 2);
    assert_eq!(snapshot.follow_ups.len(), 2);
}

// --- Delivery order ---

#[tokio::test]
async fn answer_to_a_later_question_is_rejected() {
    let (store, svc) = make_service(
        Arc::new(MockLanguageModel::new()),
        Arc::new(MockEmbedder::new()),
    );
    let interview = svc.plan("cand", &skills(3)).await.unwrap();
    assert_eq!(interview.question_ids.len(), 3);
    svc.start(interview.id).await.unwrap();

    let err = svc
        .evaluate(interview.id, interview.question_ids[1], "jumping ahead")
        .await
        .unwrap_err();
    assert!(matches!(err, InterviewError::InvalidInput(_)), "{err}");
    assert!(store.snapshot().await.answers.is_empty());

    // Every planned question is still delivered, in plan order.
    let mut delivered = Vec::new();
    while let Some(next) = svc.get_next_deliverable(interview.id).await.unwrap() {
        delivered.push(next.id());
        svc.evaluate(interview.id, next.id(), "A thorough answer.")
            .await
            .unwrap();
    }
    assert_eq!(delivered, interview.question_ids);
}

#[tokio::test]
async fn passed_question_cannot_be_answered_again() {
    let (store, svc) = make_service(
        Arc::new(MockLanguageModel::new()),
        Arc::new(distant_embedder()),
    );
    let interview = svc.plan("cand", &skills(3)).await.unwrap();
    svc.start(interview.id).await.unwrap();
    let first = interview.question_ids[0];

    // Answer the first question and all of its follow-ups until the plan moves on.
    while let Some(next) = svc.get_next_deliverable(interview.id).await.unwrap() {
        if next.parent_question_id() != first {
            break;
        }
        svc.evaluate(interview.id, next.id(), "I am not sure")
            .await
            .unwrap();
    }
    let answers_before = store.snapshot().await.answers.len();
    let follow_up_ids = svc.interview(interview.id).await.unwrap().adaptive_follow_up_ids;

    let err = svc
        .evaluate(interview.id, first, "Second thoughts")
        .await
        .unwrap_err();
    assert!(matches!(err, InterviewError::InvalidInput(_)), "{err}");
    let err = svc
        .evaluate(interview.id, follow_up_ids[0], "Second thoughts")
        .await
        .unwrap_err();
    assert!(matches!(err, InterviewError::InvalidInput(_)), "{err}");

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.answers.len(), answers_before);
    assert_eq!(snapshot.follow_ups.len(), follow_up_ids.len());
}

#[tokio::test]
async fn unknown_question_is_not_found() {
    let (_store, svc) = make_service(
        Arc::new(MockLanguageModel::new()),
        Arc::new(MockEmbedder::new()),
    );
    let interview = svc.plan("cand", &skills(1)).await.unwrap();
    let other = svc.plan("cand", &skills(1)).await.unwrap();
    svc.start(interview.id).await.unwrap();

    let err = svc
        .evaluate(interview.id, other.question_ids[0], "wrong interview")
        .await
        .unwrap_err();
    assert!(matches!(err, InterviewError::NotFound { .. }), "{err}");
}

// --- Full session ---

#[tokio::test]
async fn full_session_completes_with_progression() {
    let llm = Arc::new(MockLanguageModel::new().with_scores(vec![30.0, 55.0, 80.0]));
    let strong = "A reference answer covering the core concepts completely.";
    let embedder = Arc::new(distant_embedder().with_vector(strong, vec![1.0, 0.0]));
    let (_store, svc) = make_service(llm, embedder);
    let interview = svc.plan("cand-9", &skills(2)).await.unwrap();
    svc.start(interview.id).await.unwrap();

    let scripted = ["No idea really", "Still unsure about it", strong];
    let mut step = 0;
    while let Some(next) = svc.get_next_deliverable(interview.id).await.unwrap() {
        let text = scripted[step.min(scripted.len() - 1)];
        svc.evaluate(interview.id, next.id(), text).await.unwrap();
        step += 1;
        assert!(step < 20, "session did not terminate");
    }

    let summary = svc.complete(interview.id).await.unwrap();
    assert_eq!(summary.candidate_id, "cand-9");
    assert_eq!(summary.questions.len(), 2);
    let first = &summary.questions[0];
    assert_eq!(first.score_progression, vec![30.0, 55.0, 80.0]);
    assert_eq!(first.follow_up_count, 2);
    assert!(first.last_attempt_gaps.is_empty());
    assert_eq!(first.gap_filled_count, first.first_attempt_gaps.len());

    let stored = svc.interview(interview.id).await.unwrap();
    assert_eq!(stored.status, InterviewStatus::Completed);
    assert!(stored.summary.is_some());
}
