//! In-memory repositories with JSON snapshot persistence.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{InterviewError, InterviewResult};
use crate::model::{Answer, FollowUpQuestion, Interview, Question};
use crate::traits::{AnswerRepository, FollowUpRepository, InterviewRepository, QuestionRepository};

/// Everything the store holds, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub interviews: Vec<Interview>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub follow_ups: Vec<FollowUpQuestion>,
}

/// Repository implementation backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreSnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.clone()
    }

    /// Write the whole store as pretty JSON.
    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot().await;
        let json = serde_json::to_string_pretty(&snapshot).context("failed to serialize store")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        Ok(())
    }

    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot from {}", path.display()))?;
        let snapshot: StoreSnapshot =
            serde_json::from_str(&content).context("failed to parse snapshot JSON")?;
        Ok(Self::from_snapshot(snapshot))
    }
}

#[async_trait]
impl InterviewRepository for InMemoryStore {
    async fn save_interview(&self, interview: &Interview) -> Result<()> {
        let mut state = self.state.write().await;
        anyhow::ensure!(
            !state.interviews.iter().any(|i| i.id == interview.id),
            "interview {} already exists",
            interview.id
        );
        state.interviews.push(interview.clone());
        Ok(())
    }

    async fn find_interview(&self, id: Uuid) -> Result<Option<Interview>> {
        let state = self.state.read().await;
        Ok(state.interviews.iter().find(|i| i.id == id).cloned())
    }

    async fn update_interview(&self, interview: &Interview) -> Result<()> {
        let mut state = self.state.write().await;
        let slot = state
            .interviews
            .iter_mut()
            .find(|i| i.id == interview.id)
            .with_context(|| format!("interview {} does not exist", interview.id))?;
        *slot = interview.clone();
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryStore {
    async fn save_question(&self, question: &Question) -> Result<()> {
        let mut state = self.state.write().await;
        anyhow::ensure!(
            !state.questions.iter().any(|q| q.id == question.id),
            "question {} already exists",
            question.id
        );
        state.questions.push(question.clone());
        Ok(())
    }

    async fn find_question(&self, id: Uuid) -> Result<Option<Question>> {
        let state = self.state.read().await;
        Ok(state.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn delete_question(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.questions.retain(|q| q.id != id);
        Ok(())
    }

    async fn list_questions(&self, interview_id: Uuid) -> Result<Vec<Question>> {
        let state = self.state.read().await;
        Ok(state
            .questions
            .iter()
            .filter(|q| q.interview_id == interview_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnswerRepository for InMemoryStore {
    async fn save_answer(&self, answer: &Answer) -> Result<()> {
        let mut state = self.state.write().await;
        anyhow::ensure!(
            !state.answers.iter().any(|a| a.id == answer.id),
            "answer {} already exists",
            answer.id
        );
        state.answers.push(answer.clone());
        Ok(())
    }

    async fn list_answers(&self, interview_id: Uuid) -> Result<Vec<Answer>> {
        let state = self.state.read().await;
        Ok(state
            .answers
            .iter()
            .filter(|a| a.interview_id == interview_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FollowUpRepository for InMemoryStore {
    async fn save_follow_up(&self, follow_up: &FollowUpQuestion) -> Result<()> {
        let mut state = self.state.write().await;
        anyhow::ensure!(
            !state.follow_ups.iter().any(|f| f.id == follow_up.id),
            "follow-up {} already exists",
            follow_up.id
        );
        state.follow_ups.push(follow_up.clone());
        Ok(())
    }

    async fn find_follow_up(&self, id: Uuid) -> Result<Option<FollowUpQuestion>> {
        let state = self.state.read().await;
        Ok(state.follow_ups.iter().find(|f| f.id == id).cloned())
    }

    async fn list_follow_ups(&self, interview_id: Uuid) -> Result<Vec<FollowUpQuestion>> {
        let state = self.state.read().await;
        Ok(state
            .follow_ups
            .iter()
            .filter(|f| f.interview_id == interview_id)
            .cloned()
            .collect())
    }
}

/// The four repositories the engine works against.
#[derive(Clone)]
pub struct Repositories {
    pub interviews: Arc<dyn InterviewRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub answers: Arc<dyn AnswerRepository>,
    pub follow_ups: Arc<dyn FollowUpRepository>,
}

impl Repositories {
    /// Use one store for every repository.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: InterviewRepository
            + QuestionRepository
            + AnswerRepository
            + FollowUpRepository
            + 'static,
    {
        Self {
            interviews: store.clone(),
            questions: store.clone(),
            answers: store.clone(),
            follow_ups: store,
        }
    }

    pub fn in_memory() -> (Arc<InMemoryStore>, Self) {
        let store = Arc::new(InMemoryStore::new());
        let repos = Self::from_store(store.clone());
        (store, repos)
    }

    pub async fn load_interview(&self, id: Uuid) -> InterviewResult<Interview> {
        self.interviews
            .find_interview(id)
            .await
            .map_err(|e| InterviewError::storage(&e))?
            .ok_or_else(|| InterviewError::not_found("interview", id))
    }

    pub async fn store_interview(&self, interview: &Interview) -> InterviewResult<()> {
        self.interviews
            .update_interview(interview)
            .await
            .map_err(|e| InterviewError::storage(&e))
    }

    pub async fn load_question(&self, id: Uuid) -> InterviewResult<Option<Question>> {
        self.questions
            .find_question(id)
            .await
            .map_err(|e| InterviewError::storage(&e))
    }

    pub async fn load_follow_up(&self, id: Uuid) -> InterviewResult<Option<FollowUpQuestion>> {
        self.follow_ups
            .find_follow_up(id)
            .await
            .map_err(|e| InterviewError::storage(&e))
    }

    /// The interview's main questions in plan order.
    pub async fn planned_questions(&self, interview: &Interview) -> InterviewResult<Vec<Question>> {
        let mut questions = Vec::with_capacity(interview.question_ids.len());
        for id in &interview.question_ids {
            let question = self
                .load_question(*id)
                .await?
                .ok_or_else(|| InterviewError::not_found("question", id))?;
            questions.push(question);
        }
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuestionType};
    use chrono::Utc;

    fn question(interview_id: Uuid) -> Question {
        Question {
            id: Uuid::new_v4(),
            interview_id,
            text: "What is a mutex?".into(),
            question_type: QuestionType::Technical,
            difficulty: Difficulty::Easy,
            reference_answer: Some("A mutual exclusion lock guarding shared data.".into()),
            rationale: None,
            skill_tags: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn interview_save_find_update() {
        let store = InMemoryStore::new();
        let mut interview = Interview::new("cand-1");
        store.save_interview(&interview).await.unwrap();
        assert!(store.save_interview(&interview).await.is_err());

        interview.current_question_index = 2;
        store.update_interview(&interview).await.unwrap();
        let found = store.find_interview(interview.id).await.unwrap().unwrap();
        assert_eq!(found.current_question_index, 2);

        let ghost = Interview::new("ghost");
        assert!(store.update_interview(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn questions_listed_per_interview_and_deletable() {
        let store = InMemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let q1 = question(a);
        let q2 = question(b);
        store.save_question(&q1).await.unwrap();
        store.save_question(&q2).await.unwrap();

        assert_eq!(store.list_questions(a).await.unwrap().len(), 1);
        store.delete_question(q1.id).await.unwrap();
        assert!(store.list_questions(a).await.unwrap().is_empty());
        assert!(store.find_question(q2.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn snapshot_roundtrip() {
        let store = InMemoryStore::new();
        let interview = Interview::new("cand-1");
        store.save_interview(&interview).await.unwrap();
        store.save_question(&question(interview.id)).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        store.save_snapshot(&path).await.unwrap();

        let loaded = InMemoryStore::load_snapshot(&path).unwrap();
        assert!(loaded.find_interview(interview.id).await.unwrap().is_some());
        assert_eq!(loaded.list_questions(interview.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repositories_map_missing_interview_to_not_found() {
        let (_store, repos) = Repositories::in_memory();
        let err = repos.load_interview(Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, InterviewError::NotFound { entity: "interview", .. }));
    }
}
