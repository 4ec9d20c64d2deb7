#[cfg(test)]
pub mod memory;
pub mod postgres;

use crate::domain::models::{
    Category, Interview, InterviewQuestionAnswer, InterviewScore, Interviewer, Question, Score,
    Test, TestQuestion,
};
use async_trait::async_trait;

pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique or foreign-key constraint refused the write.
    #[error("{0}")]
    Conflict(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub category_id: i64,
    pub content: String,
    pub notes: Option<String>,
}

/// `None` fields are left untouched; `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default)]
pub struct QuestionUpdate {
    pub content: String,
    pub category_id: Option<i64>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct TestUpdate {
    pub name: Option<String>,
    pub question_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct InterviewUpdate {
    pub candidate_name: Option<String>,
    pub feedback: Option<Option<String>>,
}

/// Relational store behind every handler.
///
/// Lookups return `Ok(None)` for missing rows, deletes and replaces return
/// `Ok(false)`. Multi-row writes are atomic.
#[async_trait]
pub trait Store: Send + Sync {
    // ========== Catalog ==========

    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>>;
    async fn create_category(&self, name: &str) -> StoreResult<Category>;
    async fn update_category(&self, id: i64, name: &str) -> StoreResult<Option<Category>>;

    async fn list_questions(&self, category_id: Option<i64>) -> StoreResult<Vec<Question>>;
    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>>;
    async fn get_questions_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Question>>;
    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question>;
    async fn update_question(&self, id: i64, update: QuestionUpdate) -> StoreResult<Option<Question>>;
    async fn delete_question(&self, id: i64) -> StoreResult<bool>;

    // ========== Tests ==========

    async fn list_tests(&self) -> StoreResult<Vec<Test>>;
    async fn get_test(&self, id: i64) -> StoreResult<Option<Test>>;
    async fn create_test(&self, name: &str, question_ids: &[i64]) -> StoreResult<Test>;
    async fn update_test(&self, id: i64, update: TestUpdate) -> StoreResult<Option<Test>>;
    async fn delete_test(&self, id: i64) -> StoreResult<bool>;
    /// Full replace of the ordered question set.
    async fn set_test_questions(&self, test_id: i64, question_ids: &[i64]) -> StoreResult<bool>;
    async fn list_test_questions(&self, test_id: i64) -> StoreResult<Vec<TestQuestion>>;

    // ========== Interviews ==========

    async fn list_interviews(&self) -> StoreResult<Vec<Interview>>;
    async fn get_interview(&self, id: i64) -> StoreResult<Option<Interview>>;
    async fn create_interview(&self, test_id: i64, candidate_name: &str) -> StoreResult<Interview>;
    async fn update_interview(&self, id: i64, update: InterviewUpdate) -> StoreResult<Option<Interview>>;

    async fn list_interviewers(&self, interview_id: i64) -> StoreResult<Vec<Interviewer>>;
    async fn get_interviewer(&self, id: i64) -> StoreResult<Option<Interviewer>>;
    async fn create_interviewer(&self, interview_id: i64, name: &str) -> StoreResult<Interviewer>;

    async fn list_scores(&self, interview_id: i64) -> StoreResult<Vec<InterviewScore>>;
    /// Insert-or-update keyed by (interview, interviewer, question).
    async fn upsert_score(
        &self,
        interview_id: i64,
        interviewer_id: i64,
        question_id: i64,
        score: Score,
    ) -> StoreResult<InterviewScore>;

    async fn list_answers(&self, interview_id: i64) -> StoreResult<Vec<InterviewQuestionAnswer>>;
    /// Insert-or-update keyed by (interview, question).
    async fn upsert_answer(
        &self,
        interview_id: i64,
        question_id: i64,
        answer_notes: Option<String>,
    ) -> StoreResult<InterviewQuestionAnswer>;
}
