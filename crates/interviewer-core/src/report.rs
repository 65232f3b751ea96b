//! Structured completion summary with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Difficulty, QuestionType};
use crate::traits::InterviewRecommendations;

/// The final, structured record of a completed interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub interview_id: Uuid,
    pub candidate_id: String,
    pub created_at: DateTime<Utc>,
    /// One outcome per planned main question, in plan order.
    pub questions: Vec<QuestionOutcome>,
    /// Mean final-attempt qualitative score over answered main questions (0-100).
    pub theoretical_avg: f64,
    /// Mean speaking score, or the neutral default when no voice signal exists (0-100).
    pub speaking_avg: f64,
    /// `theoretical_avg * 0.7 + speaking_avg * 0.3`.
    pub aggregate_score: f64,
    pub total_follow_ups: usize,
    pub recommendations: InterviewRecommendations,
}

/// Attempt history and gap movement for one main question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    /// Main answer first, then follow-up answers in order.
    pub attempts: Vec<AttemptRecord>,
    /// Qualitative score per attempt.
    pub score_progression: Vec<f64>,
    pub follow_up_count: usize,
    pub first_attempt_gaps: Vec<String>,
    pub last_attempt_gaps: Vec<String>,
    /// Concepts missing in the first attempt that are no longer missing in the last.
    pub gap_filled_count: usize,
}

impl QuestionOutcome {
    /// Qualitative score of the last attempt, if the question was answered.
    pub fn final_score(&self) -> Option<f64> {
        self.score_progression.last().copied()
    }

    pub fn is_answered(&self) -> bool {
        !self.attempts.is_empty()
    }
}

/// One answer within a question's attempt sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub answer_id: Uuid,
    /// The main question or follow-up that was answered.
    pub deliverable_id: Uuid,
    /// `None` for the main answer, `Some(n)` for the n-th follow-up.
    #[serde(default)]
    pub follow_up_order: Option<u8>,
    pub prompt: String,
    pub answer_text: String,
    #[serde(default)]
    pub similarity_score: Option<f64>,
    pub score: f64,
    #[serde(default)]
    pub missing_concepts: Vec<String>,
    pub gaps_confirmed: bool,
}

impl CompletionSummary {
    /// Save the summary as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize summary")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        Ok(())
    }

    /// Load a summary from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read summary from {}", path.display()))?;
        let summary: CompletionSummary =
            serde_json::from_str(&content).context("failed to parse summary JSON")?;
        Ok(summary)
    }

    /// Questions whose final score is below `threshold`, weakest first.
    pub fn weakest_questions(&self, threshold: f64) -> Vec<&QuestionOutcome> {
        let mut weak: Vec<&QuestionOutcome> = self
            .questions
            .iter()
            .filter(|q| q.final_score().is_some_and(|s| s < threshold))
            .collect();
        weak.sort_by(|a, b| {
            a.final_score()
                .partial_cmp(&b.final_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        weak
    }
}
