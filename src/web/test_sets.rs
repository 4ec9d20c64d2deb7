use crate::db::TestUpdate;
use crate::domain::models::{Test, TestWithQuestions};
use crate::services::composer;
use crate::state::SharedState;
use crate::web::error::{required_text, ApiError, ApiJson, ApiPath, ApiQuery};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct CreateTestPayload {
    pub name: String,
    #[serde(default)]
    pub question_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTestPayload {
    pub name: Option<String>,
    pub question_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct TestQuestionsPayload {
    pub question_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TestQuery {
    #[serde(default)]
    pub include_questions: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TestView {
    Plain(Test),
    WithQuestions(TestWithQuestions),
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_tests).post(create_test))
        .route("/:id", get(get_test).put(update_test).delete(delete_test))
        .route("/:id/questions", put(set_test_questions))
        .with_state(state)
}

async fn list_tests(State(state): State<SharedState>) -> Result<Json<Vec<Test>>, ApiError> {
    let tests = state
        .store
        .list_tests()
        .await
        .map_err(ApiError::store("Failed to fetch tests"))?;
    Ok(Json(tests))
}

async fn create_test(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<CreateTestPayload>,
) -> Result<(StatusCode, Json<Test>), ApiError> {
    let name = required_text(&payload.name, "Test name is required")?;
    composer::ensure_questions_exist(state.store.as_ref(), &payload.question_ids)
        .await
        .map_err(ApiError::compose("Failed to create test"))?;

    let test = state
        .store
        .create_test(&name, &payload.question_ids)
        .await
        .map_err(ApiError::store("Failed to create test"))?;

    tracing::info!(
        "Created test {} ({}) with {} questions",
        test.id,
        test.name,
        payload.question_ids.len()
    );
    Ok((StatusCode::CREATED, Json(test)))
}

async fn get_test(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<TestQuery>,
) -> Result<Json<TestView>, ApiError> {
    let view = if query.include_questions {
        composer::get_test_with_questions(state.store.as_ref(), id)
            .await
            .map_err(ApiError::store("Failed to fetch test"))?
            .map(TestView::WithQuestions)
    } else {
        state
            .store
            .get_test(id)
            .await
            .map_err(ApiError::store("Failed to fetch test"))?
            .map(TestView::Plain)
    };
    view.map(Json).ok_or(ApiError::NotFound("Test"))
}

async fn update_test(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateTestPayload>,
) -> Result<Json<Test>, ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(|n| required_text(n, "Test name must be a non-empty string"))
        .transpose()?;
    state
        .store
        .get_test(id)
        .await
        .map_err(ApiError::store("Failed to fetch test"))?
        .ok_or(ApiError::NotFound("Test"))?;
    if let Some(question_ids) = &payload.question_ids {
        composer::ensure_questions_exist(state.store.as_ref(), question_ids)
            .await
            .map_err(ApiError::compose("Failed to update test"))?;
    }

    let test = state
        .store
        .update_test(
            id,
            TestUpdate {
                name,
                question_ids: payload.question_ids,
            },
        )
        .await
        .map_err(ApiError::store("Failed to update test"))?
        .ok_or(ApiError::NotFound("Test"))?;

    tracing::info!("Updated test {}", test.id);
    Ok(Json(test))
}

async fn set_test_questions(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TestQuestionsPayload>,
) -> Result<Json<TestWithQuestions>, ApiError> {
    composer::set_test_questions(state.store.as_ref(), id, &payload.question_ids)
        .await
        .map_err(ApiError::compose("Failed to update test questions"))?;

    composer::get_test_with_questions(state.store.as_ref(), id)
        .await
        .map_err(ApiError::store("Failed to fetch test"))?
        .map(Json)
        .ok_or(ApiError::NotFound("Test"))
}

async fn delete_test(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .store
        .delete_test(id)
        .await
        .map_err(ApiError::store("Failed to delete test"))?;
    if !deleted {
        return Err(ApiError::NotFound("Test"));
    }

    tracing::info!("Deleted test {}", id);
    Ok(Json(json!({ "success": true })))
}
