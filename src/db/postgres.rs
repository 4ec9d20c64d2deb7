use super::{
    InterviewUpdate, NewQuestion, QuestionUpdate, Store, StoreError, StoreResult, TestUpdate,
};
use crate::domain::composer;
use crate::domain::models::{
    Category, Interview, InterviewQuestionAnswer, InterviewScore, Interviewer, Question, Score,
    Test, TestQuestion,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

const QUESTION_COLUMNS: &str = "id, category_id, content, notes, created_at, updated_at";
const INTERVIEW_COLUMNS: &str = "id, test_id, candidate_name, feedback, created_at, updated_at";
const SCORE_COLUMNS: &str =
    "id, interview_id, interviewer_id, question_id, score, created_at, updated_at";
const ANSWER_COLUMNS: &str = "id, interview_id, question_id, answer_notes, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps constraint violations to `StoreError::Conflict`, everything else stays a database error.
fn constraint(conflict: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
            StoreError::Conflict(conflict)
        }
        _ => StoreError::Database(err),
    }
}

/// Replaces the question set of a test inside an open transaction.
async fn write_test_questions(
    tx: &mut Transaction<'_, Postgres>,
    test_id: i64,
    question_ids: &[i64],
) -> StoreResult<()> {
    sqlx::query("DELETE FROM test_questions WHERE test_id = $1")
        .bind(test_id)
        .execute(&mut **tx)
        .await?;

    if question_ids.is_empty() {
        return Ok(());
    }

    let rows = composer::assignments(test_id, question_ids);
    let ids: Vec<i64> = rows.iter().map(|r| r.question_id).collect();
    let indexes: Vec<i32> = rows.iter().map(|r| r.order_index).collect();

    sqlx::query(
        r#"
        INSERT INTO test_questions (test_id, question_id, order_index)
        SELECT $1, question_id, order_index
        FROM UNNEST($2::BIGINT[], $3::INT[]) AS t(question_id, order_index)
        "#,
    )
    .bind(test_id)
    .bind(&ids)
    .bind(&indexes)
    .execute(&mut **tx)
    .await
    .map_err(constraint("test references an unknown question"))?;

    Ok(())
}

/// Locks the test row for the rest of the transaction so concurrent replaces serialize.
async fn lock_test(tx: &mut Transaction<'_, Postgres>, test_id: i64) -> StoreResult<Option<Test>> {
    let test = sqlx::query_as::<_, Test>(
        "SELECT id, name, created_at FROM tests WHERE id = $1 FOR UPDATE",
    )
    .bind(test_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(test)
}

#[async_trait]
impl Store for PgStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn create_category(&self, name: &str) -> StoreResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(constraint("category already exists"))?;
        Ok(category)
    }

    async fn update_category(&self, id: i64, name: &str) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(constraint("category already exists"))?;
        Ok(category)
    }

    async fn list_questions(&self, category_id: Option<i64>) -> StoreResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            r#"
            SELECT {QUESTION_COLUMNS}
            FROM questions
            WHERE $1::BIGINT IS NULL OR category_id = $1
            ORDER BY category_id, created_at ASC, id ASC
            "#
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn get_questions_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Question>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let created = sqlx::query_as::<_, Question>(&format!(
            r#"
            INSERT INTO questions (category_id, content, notes)
            VALUES ($1, $2, $3)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(question.category_id)
        .bind(&question.content)
        .bind(&question.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(constraint("category does not exist"))?;
        Ok(created)
    }

    async fn update_question(&self, id: i64, update: QuestionUpdate) -> StoreResult<Option<Question>> {
        let (notes_given, notes) = match update.notes {
            Some(notes) => (true, notes),
            None => (false, None),
        };
        let question = sqlx::query_as::<_, Question>(&format!(
            r#"
            UPDATE questions
            SET content = $2,
                category_id = COALESCE($3, category_id),
                notes = CASE WHEN $4 THEN $5 ELSE notes END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.content)
        .bind(update.category_id)
        .bind(notes_given)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(constraint("category does not exist"))?;
        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(constraint("question is still used by a test or an interview"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tests(&self) -> StoreResult<Vec<Test>> {
        let tests = sqlx::query_as::<_, Test>(
            "SELECT id, name, created_at FROM tests ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tests)
    }

    async fn get_test(&self, id: i64) -> StoreResult<Option<Test>> {
        let test = sqlx::query_as::<_, Test>("SELECT id, name, created_at FROM tests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(test)
    }

    async fn create_test(&self, name: &str, question_ids: &[i64]) -> StoreResult<Test> {
        let mut tx = self.pool.begin().await?;
        let test = sqlx::query_as::<_, Test>(
            "INSERT INTO tests (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        write_test_questions(&mut tx, test.id, question_ids).await?;
        tx.commit().await?;
        Ok(test)
    }

    async fn update_test(&self, id: i64, update: TestUpdate) -> StoreResult<Option<Test>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut test) = lock_test(&mut tx, id).await? else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            test = sqlx::query_as::<_, Test>(
                "UPDATE tests SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
            )
            .bind(id)
            .bind(&name)
            .fetch_one(&mut *tx)
            .await?;
        }
        if let Some(question_ids) = update.question_ids {
            write_test_questions(&mut tx, id, &question_ids).await?;
        }

        tx.commit().await?;
        Ok(Some(test))
    }

    async fn delete_test(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(constraint("test is still used by an interview"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_test_questions(&self, test_id: i64, question_ids: &[i64]) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        if lock_test(&mut tx, test_id).await?.is_none() {
            return Ok(false);
        }
        write_test_questions(&mut tx, test_id, question_ids).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn list_test_questions(&self, test_id: i64) -> StoreResult<Vec<TestQuestion>> {
        let rows = sqlx::query_as::<_, TestQuestion>(
            r#"
            SELECT test_id, question_id, order_index
            FROM test_questions
            WHERE test_id = $1
            ORDER BY order_index ASC
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_interviews(&self) -> StoreResult<Vec<Interview>> {
        let interviews = sqlx::query_as::<_, Interview>(&format!(
            "SELECT {INTERVIEW_COLUMNS} FROM interviews ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(interviews)
    }

    async fn get_interview(&self, id: i64) -> StoreResult<Option<Interview>> {
        let interview = sqlx::query_as::<_, Interview>(&format!(
            "SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(interview)
    }

    async fn create_interview(&self, test_id: i64, candidate_name: &str) -> StoreResult<Interview> {
        let interview = sqlx::query_as::<_, Interview>(&format!(
            r#"
            INSERT INTO interviews (test_id, candidate_name)
            VALUES ($1, $2)
            RETURNING {INTERVIEW_COLUMNS}
            "#
        ))
        .bind(test_id)
        .bind(candidate_name)
        .fetch_one(&self.pool)
        .await
        .map_err(constraint("test does not exist"))?;
        Ok(interview)
    }

    async fn update_interview(&self, id: i64, update: InterviewUpdate) -> StoreResult<Option<Interview>> {
        let (feedback_given, feedback) = match update.feedback {
            Some(feedback) => (true, feedback),
            None => (false, None),
        };
        let interview = sqlx::query_as::<_, Interview>(&format!(
            r#"
            UPDATE interviews
            SET candidate_name = COALESCE($2, candidate_name),
                feedback = CASE WHEN $3 THEN $4 ELSE feedback END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {INTERVIEW_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.candidate_name)
        .bind(feedback_given)
        .bind(feedback)
        .fetch_optional(&self.pool)
        .await?;
        Ok(interview)
    }

    async fn list_interviewers(&self, interview_id: i64) -> StoreResult<Vec<Interviewer>> {
        let interviewers = sqlx::query_as::<_, Interviewer>(
            r#"
            SELECT id, interview_id, name, created_at
            FROM interviewers
            WHERE interview_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(interviewers)
    }

    async fn get_interviewer(&self, id: i64) -> StoreResult<Option<Interviewer>> {
        let interviewer = sqlx::query_as::<_, Interviewer>(
            "SELECT id, interview_id, name, created_at FROM interviewers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(interviewer)
    }

    async fn create_interviewer(&self, interview_id: i64, name: &str) -> StoreResult<Interviewer> {
        let interviewer = sqlx::query_as::<_, Interviewer>(
            r#"
            INSERT INTO interviewers (interview_id, name)
            VALUES ($1, $2)
            RETURNING id, interview_id, name, created_at
            "#,
        )
        .bind(interview_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(constraint("interview does not exist"))?;
        Ok(interviewer)
    }

    async fn list_scores(&self, interview_id: i64) -> StoreResult<Vec<InterviewScore>> {
        let scores = sqlx::query_as::<_, InterviewScore>(&format!(
            "SELECT {SCORE_COLUMNS} FROM interview_scores WHERE interview_id = $1 ORDER BY id ASC"
        ))
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(scores)
    }

    async fn upsert_score(
        &self,
        interview_id: i64,
        interviewer_id: i64,
        question_id: i64,
        score: Score,
    ) -> StoreResult<InterviewScore> {
        let row = sqlx::query_as::<_, InterviewScore>(&format!(
            r#"
            INSERT INTO interview_scores (interview_id, interviewer_id, question_id, score)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (interview_id, interviewer_id, question_id) DO UPDATE
            SET score = EXCLUDED.score,
                updated_at = NOW()
            RETURNING {SCORE_COLUMNS}
            "#
        ))
        .bind(interview_id)
        .bind(interviewer_id)
        .bind(question_id)
        .bind(score.value())
        .fetch_one(&self.pool)
        .await
        .map_err(constraint("score references an unknown interview, interviewer or question"))?;
        Ok(row)
    }

    async fn list_answers(&self, interview_id: i64) -> StoreResult<Vec<InterviewQuestionAnswer>> {
        let answers = sqlx::query_as::<_, InterviewQuestionAnswer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM interview_question_answers WHERE interview_id = $1 ORDER BY id ASC"
        ))
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn upsert_answer(
        &self,
        interview_id: i64,
        question_id: i64,
        answer_notes: Option<String>,
    ) -> StoreResult<InterviewQuestionAnswer> {
        let row = sqlx::query_as::<_, InterviewQuestionAnswer>(&format!(
            r#"
            INSERT INTO interview_question_answers (interview_id, question_id, answer_notes)
            VALUES ($1, $2, $3)
            ON CONFLICT (interview_id, question_id) DO UPDATE
            SET answer_notes = EXCLUDED.answer_notes,
                updated_at = NOW()
            RETURNING {ANSWER_COLUMNS}
            "#
        ))
        .bind(interview_id)
        .bind(question_id)
        .bind(answer_notes)
        .fetch_one(&self.pool)
        .await
        .map_err(constraint("answer references an unknown interview or question"))?;
        Ok(row)
    }
}
