//! Deterministic scoring: embedding similarity, gap movement, and aggregation.

use std::collections::{HashMap, HashSet};

use crate::model::{Answer, FollowUpQuestion, Question};
use crate::report::{AttemptRecord, QuestionOutcome};

/// Weight of the theoretical (content) average in the aggregate score.
pub const THEORETICAL_WEIGHT: f64 = 0.7;
/// Weight of the speaking (delivery) average in the aggregate score.
pub const SPEAKING_WEIGHT: f64 = 0.3;
/// Speaking average used when no answer carries a voice signal.
pub const NEUTRAL_SPEAKING_SCORE: f64 = 50.0;

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when either vector has zero norm or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Cosine similarity clamped into `[0, 1]`; non-finite results map to 0.
pub fn similarity_score(a: &[f32], b: &[f32]) -> f64 {
    let cosine = cosine_similarity(a, b);
    if cosine.is_finite() {
        cosine.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `|first - last|`: concepts missing in the first attempt but not in the last.
pub fn gap_filled_count(first_attempt_gaps: &[String], last_attempt_gaps: &[String]) -> usize {
    let first: HashSet<&str> = first_attempt_gaps.iter().map(String::as_str).collect();
    let last: HashSet<&str> = last_attempt_gaps.iter().map(String::as_str).collect();
    first.difference(&last).count()
}

pub fn aggregate_score(theoretical_avg: f64, speaking_avg: f64) -> f64 {
    theoretical_avg * THEORETICAL_WEIGHT + speaking_avg * SPEAKING_WEIGHT
}

pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Group answers into one ordered attempt sequence per main question.
///
/// `questions` must be in plan order. Answers to follow-ups are attributed to
/// the follow-up's parent; attempts are ordered by creation time.
pub fn build_outcomes(
    questions: &[Question],
    answers: &[Answer],
    follow_ups: &[FollowUpQuestion],
) -> Vec<QuestionOutcome> {
    let follow_up_by_id: HashMap<_, _> = follow_ups.iter().map(|f| (f.id, f)).collect();

    let mut by_parent: HashMap<_, Vec<&Answer>> = HashMap::new();
    for answer in answers {
        let parent = follow_up_by_id
            .get(&answer.question_id)
            .map(|f| f.parent_question_id)
            .unwrap_or(answer.question_id);
        by_parent.entry(parent).or_default().push(answer);
    }

    questions
        .iter()
        .map(|question| {
            let mut group = by_parent.remove(&question.id).unwrap_or_default();
            group.sort_by_key(|a| a.created_at);

            let attempts: Vec<AttemptRecord> = group
                .iter()
                .map(|answer| {
                    let follow_up = follow_up_by_id.get(&answer.question_id);
                    AttemptRecord {
                        answer_id: answer.id,
                        deliverable_id: answer.question_id,
                        follow_up_order: follow_up.map(|f| f.order_in_sequence),
                        prompt: follow_up
                            .map(|f| f.text.clone())
                            .unwrap_or_else(|| question.text.clone()),
                        answer_text: answer.text.clone(),
                        similarity_score: answer.similarity_score,
                        score: answer.evaluation.score,
                        missing_concepts: answer.gaps.missing_concepts.clone(),
                        gaps_confirmed: answer.gaps.confirmed,
                    }
                })
                .collect();

            let first_attempt_gaps = attempts
                .first()
                .map(|a| a.missing_concepts.clone())
                .unwrap_or_default();
            let last_attempt_gaps = attempts
                .last()
                .map(|a| a.missing_concepts.clone())
                .unwrap_or_default();

            QuestionOutcome {
                question_id: question.id,
                question_text: question.text.clone(),
                question_type: question.question_type,
                difficulty: question.difficulty,
                score_progression: attempts.iter().map(|a| a.score).collect(),
                follow_up_count: follow_ups
                    .iter()
                    .filter(|f| f.parent_question_id == question.id)
                    .count(),
                gap_filled_count: gap_filled_count(&first_attempt_gaps, &last_attempt_gaps),
                first_attempt_gaps,
                last_attempt_gaps,
                attempts,
            }
        })
        .collect()
}

/// Mean final-attempt score over answered questions; 0 when nothing was answered.
pub fn theoretical_average(outcomes: &[QuestionOutcome]) -> f64 {
    mean(outcomes.iter().filter_map(QuestionOutcome::final_score)).unwrap_or(0.0)
}

/// Mean of present speaking scores, or `neutral` when there are none.
pub fn speaking_average(answers: &[Answer], neutral: f64) -> f64 {
    mean(answers.iter().filter_map(|a| a.speaking_score)).unwrap_or(neutral)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Difficulty, GapAnalysis, QualitativeEvaluation, QuestionType, Severity,
    };
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cosine_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn similarity_is_clamped_and_zero_norm_safe() {
        assert_eq!(similarity_score(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(similarity_score(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(similarity_score(&[1.0, 1.0], &[1.0]), 0.0);
        assert_eq!(similarity_score(&[], &[]), 0.0);
        let s = similarity_score(&[0.3, 0.4], &[0.4, 0.3]);
        assert!((0.0..=1.0).contains(&s));
        assert!((s - 0.96).abs() < 1e-6);
    }

    #[test]
    fn gap_filled_count_is_set_difference() {
        let first = strings(&["ownership", "borrowing", "lifetime", "drop"]);
        let last = strings(&["lifetime", "send"]);
        assert_eq!(gap_filled_count(&first, &last), 3);
        assert_eq!(gap_filled_count(&first, &first), 0);
        assert_eq!(gap_filled_count(&[], &last), 0);
        assert_eq!(gap_filled_count(&first, &[]), 4);
    }

    #[test]
    fn aggregate_weights() {
        assert!((aggregate_score(80.0, NEUTRAL_SPEAKING_SCORE) - 71.0).abs() < 1e-9);
        assert!((aggregate_score(0.0, 0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(mean([2.0, 4.0]), Some(3.0));
    }

    fn question(text: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            interview_id: Uuid::nil(),
            text: text.into(),
            question_type: QuestionType::Technical,
            difficulty: Difficulty::Medium,
            reference_answer: Some("a reasonably long reference".into()),
            rationale: None,
            skill_tags: vec![],
            created_at: Utc::now(),
        }
    }

    fn answer(question_id: Uuid, score: f64, gaps: &[&str], offset_secs: i64) -> Answer {
        Answer {
            id: Uuid::new_v4(),
            question_id,
            interview_id: Uuid::nil(),
            text: format!("answer scoring {score}"),
            similarity_score: Some(0.5),
            gaps: GapAnalysis {
                missing_concepts: strings(gaps),
                keyword_gaps: strings(gaps),
                confirmed: !gaps.is_empty(),
                severity: Severity::Moderate,
            },
            evaluation: QualitativeEvaluation {
                score,
                ..Default::default()
            },
            speaking_score: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    fn follow_up(parent: Uuid, order: u8) -> FollowUpQuestion {
        FollowUpQuestion {
            id: Uuid::new_v4(),
            parent_question_id: parent,
            interview_id: Uuid::nil(),
            text: format!("follow-up {order}"),
            generated_reason: "gap".into(),
            target_concepts: vec![],
            severity: Severity::Moderate,
            order_in_sequence: order,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn outcomes_group_follow_up_answers_under_parent() {
        let q1 = question("q1");
        let q2 = question("q2");
        let f1 = follow_up(q1.id, 1);
        let f2 = follow_up(q1.id, 2);

        // Deliberately shuffled storage order.
        let answers = vec![
            answer(f2.id, 70.0, &["drop"], 3),
            answer(q1.id, 30.0, &["ownership", "borrowing", "drop"], 1),
            answer(f1.id, 50.0, &["borrowing", "drop"], 2),
        ];

        let outcomes = build_outcomes(&[q1.clone(), q2.clone()], &answers, &[f1.clone(), f2]);
        assert_eq!(outcomes.len(), 2);

        let first = &outcomes[0];
        assert_eq!(first.score_progression, vec![30.0, 50.0, 70.0]);
        assert_eq!(first.attempts[0].follow_up_order, None);
        assert_eq!(first.attempts[1].follow_up_order, Some(1));
        assert_eq!(first.attempts[1].prompt, f1.text);
        assert_eq!(first.follow_up_count, 2);
        assert_eq!(first.gap_filled_count, 2);
        assert_eq!(first.final_score(), Some(70.0));

        let second = &outcomes[1];
        assert!(!second.is_answered());
        assert_eq!(second.gap_filled_count, 0);
        assert_eq!(theoretical_average(&outcomes), 70.0);
    }

    #[test]
    fn speaking_average_defaults_to_neutral() {
        let q = question("q");
        let mut answers = vec![answer(q.id, 60.0, &[], 0), answer(q.id, 80.0, &[], 1)];
        assert_eq!(speaking_average(&answers, NEUTRAL_SPEAKING_SCORE), 50.0);

        answers[0].speaking_score = Some(90.0);
        assert_eq!(speaking_average(&answers, NEUTRAL_SPEAKING_SCORE), 90.0);
    }

    #[test]
    fn theoretical_average_of_nothing_is_zero() {
        assert_eq!(theoretical_average(&[]), 0.0);
    }
}
