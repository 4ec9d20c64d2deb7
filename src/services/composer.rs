use crate::db::{Store, StoreError, StoreResult};
use crate::domain::composer;
use crate::domain::models::TestWithQuestions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("test not found")]
    TestNotFound,
    #[error("unknown question ids: {0:?}")]
    UnknownQuestions(Vec<i64>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rejects a question list that names questions the bank does not have.
pub async fn ensure_questions_exist(store: &dyn Store, question_ids: &[i64]) -> Result<(), ComposeError> {
    if question_ids.is_empty() {
        return Ok(());
    }
    let known = store.get_questions_by_ids(question_ids).await?;
    let unknown = composer::unknown_question_ids(question_ids, &known);
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ComposeError::UnknownQuestions(unknown))
    }
}

/// Replaces a test's ordered question set; reading it back yields exactly `question_ids`.
pub async fn set_test_questions(
    store: &dyn Store,
    test_id: i64,
    question_ids: &[i64],
) -> Result<(), ComposeError> {
    if store.get_test(test_id).await?.is_none() {
        return Err(ComposeError::TestNotFound);
    }
    ensure_questions_exist(store, question_ids).await?;
    if store.set_test_questions(test_id, question_ids).await? {
        tracing::info!("Test {} now has {} questions", test_id, question_ids.len());
        Ok(())
    } else {
        Err(ComposeError::TestNotFound)
    }
}

/// The test with its questions in `order_index` order, or `None` if the test is missing.
pub async fn get_test_with_questions(
    store: &dyn Store,
    test_id: i64,
) -> StoreResult<Option<TestWithQuestions>> {
    let Some(test) = store.get_test(test_id).await? else {
        return Ok(None);
    };

    let rows = store.list_test_questions(test_id).await?;
    if rows.is_empty() {
        return Ok(Some(TestWithQuestions {
            test,
            questions: Vec::new(),
        }));
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.question_id).collect();
    let questions = store.get_questions_by_ids(&ids).await?;

    Ok(Some(TestWithQuestions {
        test,
        questions: composer::order_questions(&rows, questions),
    }))
}
