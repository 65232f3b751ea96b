//! Core data model types for the interview engine.
//!
//! Interviews own an ordered, immutable-once-planned list of main questions.
//! Answers and follow-up questions reference them by id.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::CompletionSummary;

/// Hard cap on follow-up questions generated for one main question.
pub const MAX_FOLLOW_UPS_PER_QUESTION: u8 = 3;

/// A reference answer must be longer than this (trimmed) to count as planned.
pub const MIN_REFERENCE_ANSWER_LEN: usize = 10;

/// A candidate skill extracted upstream (e.g. from a CV).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Skill name (e.g. "rust", "postgres").
    pub name: String,
    /// Self-declared or inferred proficiency (free text).
    #[serde(default)]
    pub level: Option<String>,
}

impl Skill {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
        }
    }
}

/// The candidate skill profile used to size and target the interview plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillProfile {
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Role the candidate is interviewing for.
    #[serde(default)]
    pub target_role: Option<String>,
    /// Free-text background passed to question generation.
    #[serde(default)]
    pub context: Option<String>,
}

impl SkillProfile {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skills: names.into_iter().map(Skill::new).collect(),
            target_role: None,
            context: None,
        }
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    /// One-line description handed to the language model as planning context.
    pub fn summary(&self) -> String {
        let skills = self
            .skills
            .iter()
            .map(|s| match &s.level {
                Some(level) => format!("{} ({level})", s.name),
                None => s.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = String::new();
        if let Some(role) = &self.target_role {
            out.push_str(&format!("Role: {role}. "));
        }
        if skills.is_empty() {
            out.push_str("Skills: none listed.");
        } else {
            out.push_str(&format!("Skills: {skills}."));
        }
        if let Some(ctx) = &self.context {
            out.push(' ');
            out.push_str(ctx);
        }
        out
    }
}

/// Interview lifecycle status. Transitions are enforced in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewStatus {
    Preparing,
    Ready,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterviewStatus::Preparing => write!(f, "PREPARING"),
            InterviewStatus::Ready => write!(f, "READY"),
            InterviewStatus::InProgress => write!(f, "IN_PROGRESS"),
            InterviewStatus::Completed => write!(f, "COMPLETED"),
            InterviewStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Metadata recorded once planning succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
    /// Number of planned main questions.
    pub question_count: usize,
    pub generated_at: DateTime<Utc>,
    /// Label of the distribution policy used.
    pub strategy: String,
}

/// One interview session for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: Uuid,
    pub candidate_id: String,
    pub status: InterviewStatus,
    /// Planned main questions, in delivery order.
    #[serde(default)]
    pub question_ids: Vec<Uuid>,
    /// Plan position: index into `question_ids` of the active main question.
    #[serde(default)]
    pub current_question_index: usize,
    #[serde(default)]
    pub plan_metadata: Option<PlanMetadata>,
    /// Every generated follow-up, append-only.
    #[serde(default)]
    pub adaptive_follow_up_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Structured completion record, set together with `COMPLETED`.
    #[serde(default)]
    pub summary: Option<CompletionSummary>,
}

impl Interview {
    /// Create a fresh interview in `PREPARING`.
    pub fn new(candidate_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            candidate_id: candidate_id.into(),
            status: InterviewStatus::Preparing,
            question_ids: Vec::new(),
            current_question_index: 0,
            plan_metadata: None,
            adaptive_follow_up_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            summary: None,
        }
    }

    /// The main question at the current plan position, if any remain.
    pub fn active_question_id(&self) -> Option<Uuid> {
        self.question_ids.get(self.current_question_index).copied()
    }
}

/// Question category, used by the planning distribution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Technical,
    Behavioral,
    Situational,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Technical => write!(f, "technical"),
            QuestionType::Behavioral => write!(f, "behavioral"),
            QuestionType::Situational => write!(f, "situational"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "technical" => Ok(QuestionType::Technical),
            "behavioral" | "behavioural" => Ok(QuestionType::Behavioral),
            "situational" => Ok(QuestionType::Situational),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A planned main question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub text: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    /// Exemplar answer used as the similarity and gap baseline.
    #[serde(default)]
    pub reference_answer: Option<String>,
    /// Why this question was asked.
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub skill_tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// A question is planned once it carries a non-trivial reference answer.
    pub fn is_planned(&self) -> bool {
        self.reference_answer
            .as_deref()
            .is_some_and(is_usable_reference_answer)
    }
}

pub(crate) fn is_usable_reference_answer(text: &str) -> bool {
    text.trim().chars().count() > MIN_REFERENCE_ANSWER_LEN
}

/// How serious a confirmed concept gap is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Minor,
    Moderate,
    Major,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "none"),
            Severity::Minor => write!(f, "minor"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::Major => write!(f, "major"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(Severity::None),
            "minor" | "low" => Ok(Severity::Minor),
            "moderate" | "medium" => Ok(Severity::Moderate),
            "major" | "high" | "critical" => Ok(Severity::Major),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Outcome of hybrid gap detection for one answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    /// Concepts judged absent from the answer.
    #[serde(default)]
    pub missing_concepts: Vec<String>,
    /// Raw lexical gaps from the keyword filter.
    #[serde(default)]
    pub keyword_gaps: Vec<String>,
    pub confirmed: bool,
    #[serde(default)]
    pub severity: Severity,
}

/// Qualitative grading of an answer. `score` is on a 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitativeEvaluation {
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

/// A candidate answer to a main question or a follow-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    /// Id of the answered main question or follow-up.
    pub question_id: Uuid,
    pub interview_id: Uuid,
    pub text: String,
    /// Cosine similarity to the reference answer, clamped to [0, 1].
    #[serde(default)]
    pub similarity_score: Option<f64>,
    #[serde(default)]
    pub gaps: GapAnalysis,
    pub evaluation: QualitativeEvaluation,
    /// Delivery score (0-100) from a voice pipeline, when one exists.
    #[serde(default)]
    pub speaking_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A dynamically generated question targeting a confirmed gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub id: Uuid,
    pub parent_question_id: Uuid,
    pub interview_id: Uuid,
    pub text: String,
    pub generated_reason: String,
    #[serde(default)]
    pub target_concepts: Vec<String>,
    #[serde(default)]
    pub severity: Severity,
    /// 1-based position among the parent's follow-ups.
    pub order_in_sequence: u8,
    pub created_at: DateTime<Utc>,
}

/// Something that can be put in front of the candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Deliverable {
    Main(Question),
    FollowUp(FollowUpQuestion),
}

impl Deliverable {
    pub fn id(&self) -> Uuid {
        match self {
            Deliverable::Main(q) => q.id,
            Deliverable::FollowUp(f) => f.id,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Deliverable::Main(q) => &q.text,
            Deliverable::FollowUp(f) => &f.text,
        }
    }

    /// Follow-ups have no planned difficulty and default to `Medium`.
    pub fn difficulty(&self) -> Difficulty {
        match self {
            Deliverable::Main(q) => q.difficulty,
            Deliverable::FollowUp(_) => Difficulty::Medium,
        }
    }

    /// Follow-ups target technical gaps and default to `Technical`.
    pub fn question_type(&self) -> QuestionType {
        match self {
            Deliverable::Main(q) => q.question_type,
            Deliverable::FollowUp(_) => QuestionType::Technical,
        }
    }

    /// The main question this deliverable belongs to.
    pub fn parent_question_id(&self) -> Uuid {
        match self {
            Deliverable::Main(q) => q.id,
            Deliverable::FollowUp(f) => f.parent_question_id,
        }
    }

    pub fn is_follow_up(&self) -> bool {
        matches!(self, Deliverable::FollowUp(_))
    }
}
