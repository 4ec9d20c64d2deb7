//! In-process `Store` used by the test suite.
//!
//! Mirrors the Postgres schema's constraints: unique category names, one score per
//! (interview, interviewer, question), one answer per (interview, question), and
//! refusal to delete rows that are still referenced.

use super::{
    InterviewUpdate, NewQuestion, QuestionUpdate, Store, StoreError, StoreResult, TestUpdate,
};
use crate::domain::composer;
use crate::domain::models::{
    Category, Interview, InterviewQuestionAnswer, InterviewScore, Interviewer, Question, Score,
    Test, TestQuestion,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    next_id: i64,
    categories: BTreeMap<i64, Category>,
    questions: BTreeMap<i64, Question>,
    tests: BTreeMap<i64, Test>,
    test_questions: Vec<TestQuestion>,
    interviews: BTreeMap<i64, Interview>,
    interviewers: BTreeMap<i64, Interviewer>,
    scores: BTreeMap<(i64, i64, i64), InterviewScore>,
    answers: BTreeMap<(i64, i64), InterviewQuestionAnswer>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.categories
            .values()
            .any(|c| c.name == name && Some(c.id) != except)
    }

    fn replace_test_questions(&mut self, test_id: i64, question_ids: &[i64]) -> StoreResult<()> {
        if question_ids.iter().any(|id| !self.questions.contains_key(id)) {
            return Err(StoreError::Conflict("test references an unknown question"));
        }
        self.test_questions.retain(|row| row.test_id != test_id);
        self.test_questions
            .extend(composer::assignments(test_id, question_ids));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, name: &str) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.name_taken(name, None) {
            return Err(StoreError::Conflict("category already exists"));
        }
        let category = Category {
            id: tables.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, name: &str) -> StoreResult<Option<Category>> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Ok(None);
        }
        if tables.name_taken(name, Some(id)) {
            return Err(StoreError::Conflict("category already exists"));
        }
        let category = tables.categories.get_mut(&id).map(|c| {
            c.name = name.to_string();
            c.clone()
        });
        Ok(category)
    }

    async fn list_questions(&self, category_id: Option<i64>) -> StoreResult<Vec<Question>> {
        let tables = self.tables.read().await;
        let mut questions: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| category_id.map_or(true, |id| q.category_id == id))
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.category_id, q.created_at, q.id));
        Ok(questions)
    }

    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn get_questions_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .values()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&question.category_id) {
            return Err(StoreError::Conflict("category does not exist"));
        }
        let now = Utc::now();
        let created = Question {
            id: tables.next_id(),
            category_id: question.category_id,
            content: question.content,
            notes: question.notes,
            created_at: now,
            updated_at: now,
        };
        tables.questions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_question(&self, id: i64, update: QuestionUpdate) -> StoreResult<Option<Question>> {
        let mut tables = self.tables.write().await;
        if let Some(category_id) = update.category_id {
            if !tables.categories.contains_key(&category_id) {
                return Err(StoreError::Conflict("category does not exist"));
            }
        }
        let question = tables.questions.get_mut(&id).map(|q| {
            q.content = update.content;
            if let Some(category_id) = update.category_id {
                q.category_id = category_id;
            }
            if let Some(notes) = update.notes {
                q.notes = notes;
            }
            q.updated_at = Utc::now();
            q.clone()
        });
        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let referenced = tables.test_questions.iter().any(|r| r.question_id == id)
            || tables.scores.keys().any(|&(_, _, q)| q == id)
            || tables.answers.keys().any(|&(_, q)| q == id);
        if referenced && tables.questions.contains_key(&id) {
            return Err(StoreError::Conflict("question is still used by a test or an interview"));
        }
        Ok(tables.questions.remove(&id).is_some())
    }

    async fn list_tests(&self) -> StoreResult<Vec<Test>> {
        let tables = self.tables.read().await;
        let mut tests: Vec<Test> = tables.tests.values().cloned().collect();
        tests.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(tests)
    }

    async fn get_test(&self, id: i64) -> StoreResult<Option<Test>> {
        Ok(self.tables.read().await.tests.get(&id).cloned())
    }

    async fn create_test(&self, name: &str, question_ids: &[i64]) -> StoreResult<Test> {
        let mut tables = self.tables.write().await;
        let test = Test {
            id: tables.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.replace_test_questions(test.id, question_ids)?;
        tables.tests.insert(test.id, test.clone());
        Ok(test)
    }

    async fn update_test(&self, id: i64, update: TestUpdate) -> StoreResult<Option<Test>> {
        let mut tables = self.tables.write().await;
        if !tables.tests.contains_key(&id) {
            return Ok(None);
        }
        if let Some(question_ids) = &update.question_ids {
            tables.replace_test_questions(id, question_ids)?;
        }
        let test = tables.tests.get_mut(&id).map(|t| {
            if let Some(name) = update.name {
                t.name = name;
            }
            t.clone()
        });
        Ok(test)
    }

    async fn delete_test(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.interviews.values().any(|i| i.test_id == id) {
            return Err(StoreError::Conflict("test is still used by an interview"));
        }
        tables.test_questions.retain(|row| row.test_id != id);
        Ok(tables.tests.remove(&id).is_some())
    }

    async fn set_test_questions(&self, test_id: i64, question_ids: &[i64]) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.tests.contains_key(&test_id) {
            return Ok(false);
        }
        tables.replace_test_questions(test_id, question_ids)?;
        Ok(true)
    }

    async fn list_test_questions(&self, test_id: i64) -> StoreResult<Vec<TestQuestion>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<TestQuestion> = tables
            .test_questions
            .iter()
            .filter(|row| row.test_id == test_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.order_index);
        Ok(rows)
    }

    async fn list_interviews(&self) -> StoreResult<Vec<Interview>> {
        let tables = self.tables.read().await;
        let mut interviews: Vec<Interview> = tables.interviews.values().cloned().collect();
        interviews.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(interviews)
    }

    async fn get_interview(&self, id: i64) -> StoreResult<Option<Interview>> {
        Ok(self.tables.read().await.interviews.get(&id).cloned())
    }

    async fn create_interview(&self, test_id: i64, candidate_name: &str) -> StoreResult<Interview> {
        let mut tables = self.tables.write().await;
        if !tables.tests.contains_key(&test_id) {
            return Err(StoreError::Conflict("test does not exist"));
        }
        let now = Utc::now();
        let interview = Interview {
            id: tables.next_id(),
            test_id,
            candidate_name: candidate_name.to_string(),
            feedback: None,
            created_at: now,
            updated_at: now,
        };
        tables.interviews.insert(interview.id, interview.clone());
        Ok(interview)
    }

    async fn update_interview(&self, id: i64, update: InterviewUpdate) -> StoreResult<Option<Interview>> {
        let mut tables = self.tables.write().await;
        let interview = tables.interviews.get_mut(&id).map(|i| {
            if let Some(name) = update.candidate_name {
                i.candidate_name = name;
            }
            if let Some(feedback) = update.feedback {
                i.feedback = feedback;
            }
            i.updated_at = Utc::now();
            i.clone()
        });
        Ok(interview)
    }

    async fn list_interviewers(&self, interview_id: i64) -> StoreResult<Vec<Interviewer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .interviewers
            .values()
            .filter(|i| i.interview_id == interview_id)
            .cloned()
            .collect())
    }

    async fn get_interviewer(&self, id: i64) -> StoreResult<Option<Interviewer>> {
        Ok(self.tables.read().await.interviewers.get(&id).cloned())
    }

    async fn create_interviewer(&self, interview_id: i64, name: &str) -> StoreResult<Interviewer> {
        let mut tables = self.tables.write().await;
        if !tables.interviews.contains_key(&interview_id) {
            return Err(StoreError::Conflict("interview does not exist"));
        }
        let interviewer = Interviewer {
            id: tables.next_id(),
            interview_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.interviewers.insert(interviewer.id, interviewer.clone());
        Ok(interviewer)
    }

    async fn list_scores(&self, interview_id: i64) -> StoreResult<Vec<InterviewScore>> {
        let tables = self.tables.read().await;
        let mut scores: Vec<InterviewScore> = tables
            .scores
            .values()
            .filter(|s| s.interview_id == interview_id)
            .cloned()
            .collect();
        scores.sort_by_key(|s| s.id);
        Ok(scores)
    }

    async fn upsert_score(
        &self,
        interview_id: i64,
        interviewer_id: i64,
        question_id: i64,
        score: Score,
    ) -> StoreResult<InterviewScore> {
        let mut tables = self.tables.write().await;
        if !tables.interviews.contains_key(&interview_id)
            || !tables.interviewers.contains_key(&interviewer_id)
            || !tables.questions.contains_key(&question_id)
        {
            return Err(StoreError::Conflict(
                "score references an unknown interview, interviewer or question",
            ));
        }

        let now = Utc::now();
        let key = (interview_id, interviewer_id, question_id);
        let row = match tables.scores.get_mut(&key) {
            Some(existing) => {
                existing.score = score.value();
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let row = InterviewScore {
                    id: tables.next_id(),
                    interview_id,
                    interviewer_id,
                    question_id,
                    score: score.value(),
                    created_at: now,
                    updated_at: now,
                };
                tables.scores.insert(key, row.clone());
                row
            }
        };
        Ok(row)
    }

    async fn list_answers(&self, interview_id: i64) -> StoreResult<Vec<InterviewQuestionAnswer>> {
        let tables = self.tables.read().await;
        let mut answers: Vec<InterviewQuestionAnswer> = tables
            .answers
            .values()
            .filter(|a| a.interview_id == interview_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| a.id);
        Ok(answers)
    }

    async fn upsert_answer(
        &self,
        interview_id: i64,
        question_id: i64,
        answer_notes: Option<String>,
    ) -> StoreResult<InterviewQuestionAnswer> {
        let mut tables = self.tables.write().await;
        if !tables.interviews.contains_key(&interview_id) || !tables.questions.contains_key(&question_id) {
            return Err(StoreError::Conflict(
                "answer references an unknown interview or question",
            ));
        }

        let now = Utc::now();
        let key = (interview_id, question_id);
        let row = match tables.answers.get_mut(&key) {
            Some(existing) => {
                existing.answer_notes = answer_notes;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let row = InterviewQuestionAnswer {
                    id: tables.next_id(),
                    interview_id,
                    question_id,
                    answer_notes,
                    created_at: now,
                    updated_at: now,
                };
                tables.answers.insert(key, row.clone());
                row
            }
        };
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn seeded() -> (MemoryStore, Vec<Question>) {
        let store = MemoryStore::new();
        let category = store.create_category("Rust").await.unwrap();
        let mut questions = Vec::new();
        for content in ["Borrowing", "Lifetimes", "Traits"] {
            questions.push(
                store
                    .create_question(NewQuestion {
                        category_id: category.id,
                        content: content.to_string(),
                        notes: None,
                    })
                    .await
                    .unwrap(),
            );
        }
        (store, questions)
    }

    #[tokio::test]
    async fn test_duplicate_category_is_conflict() {
        let store = MemoryStore::new();
        store.create_category("Rust").await.unwrap();
        let err = store.create_category("Rust").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_replace_with_unknown_question_keeps_previous_set() {
        let (store, questions) = seeded().await;
        let test = store.create_test("Core", &[questions[0].id]).await.unwrap();

        let err = store
            .set_test_questions(test.id, &[questions[1].id, 999])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let rows = store.list_test_questions(test.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].question_id, questions[0].id);
    }

    #[tokio::test]
    async fn test_delete_referenced_question_is_refused() {
        let (store, questions) = seeded().await;
        store.create_test("Core", &[questions[0].id]).await.unwrap();

        let err = store.delete_question(questions[0].id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.delete_question(questions[1].id).await.unwrap());
        assert!(!store.delete_question(questions[1].id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sequential_upserts_replace_in_place() {
        let (store, questions) = seeded().await;
        let test = store.create_test("Core", &[questions[0].id]).await.unwrap();
        let interview = store.create_interview(test.id, "Dana").await.unwrap();
        let interviewer = store.create_interviewer(interview.id, "Sam").await.unwrap();

        let first = store
            .upsert_score(interview.id, interviewer.id, questions[0].id, Score::try_from(2).unwrap())
            .await
            .unwrap();
        let second = store
            .upsert_score(interview.id, interviewer.id, questions[0].id, Score::try_from(5).unwrap())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let scores = store.list_scores(interview.id).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 5);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_leave_one_row() {
        let (store, questions) = seeded().await;
        let store = Arc::new(store);
        let test = store.create_test("Core", &[questions[0].id]).await.unwrap();
        let interview = store.create_interview(test.id, "Dana").await.unwrap();
        let interviewer = store.create_interviewer(interview.id, "Sam").await.unwrap();
        let (interview_id, interviewer_id, question_id) = (interview.id, interviewer.id, questions[0].id);

        let writes = (0..32i64).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let score = Score::try_from(i % 5 + 1).unwrap();
                store.upsert_score(interview_id, interviewer_id, question_id, score).await
            })
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.list_scores(interview_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_answer_upsert_is_unique_per_question() {
        let (store, questions) = seeded().await;
        let test = store.create_test("Core", &[questions[0].id]).await.unwrap();
        let interview = store.create_interview(test.id, "Dana").await.unwrap();

        store
            .upsert_answer(interview.id, questions[0].id, Some("first".to_string()))
            .await
            .unwrap();
        let answer = store
            .upsert_answer(interview.id, questions[0].id, None)
            .await
            .unwrap();

        let answers = store.list_answers(interview.id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answer.answer_notes, None);
    }

    #[tokio::test]
    async fn test_delete_test_in_use_is_refused() {
        let (store, questions) = seeded().await;
        let test = store.create_test("Core", &[questions[0].id]).await.unwrap();
        store.create_interview(test.id, "Dana").await.unwrap();

        let err = store.delete_test(test.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
