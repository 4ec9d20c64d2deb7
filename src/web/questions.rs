use crate::db::{NewQuestion, QuestionUpdate};
use crate::domain::models::{normalize_notes, Question};
use crate::state::SharedState;
use crate::web::error::{required_text, ApiError, ApiJson, ApiPath, ApiQuery};
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionPayload {
    pub category_id: i64,
    pub content: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuestionPayload {
    pub content: String,
    pub category_id: Option<i64>,
    /// Present replaces the notes; an empty string clears them.
    pub notes: Option<String>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_questions).post(create_question))
        .route("/:id", get(get_question).put(update_question).delete(delete_question))
        .with_state(state)
}

async fn ensure_category(state: &SharedState, category_id: i64) -> Result<(), ApiError> {
    state
        .store
        .get_category(category_id)
        .await
        .map_err(ApiError::store("Failed to fetch category"))?
        .ok_or(ApiError::NotFound("Category"))?;
    Ok(())
}

async fn list_questions(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<QuestionQuery>,
) -> Result<Json<Vec<Question>>, ApiError> {
    let questions = state
        .store
        .list_questions(query.category_id)
        .await
        .map_err(ApiError::store("Failed to fetch questions"))?;
    Ok(Json(questions))
}

async fn create_question(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<CreateQuestionPayload>,
) -> Result<(StatusCode, Json<Question>), ApiError> {
    let content = required_text(&payload.content, "Question content is required")?;
    ensure_category(&state, payload.category_id).await?;

    let question = state
        .store
        .create_question(NewQuestion {
            category_id: payload.category_id,
            content,
            notes: normalize_notes(payload.notes.as_deref()),
        })
        .await
        .map_err(ApiError::store("Failed to create question"))?;

    tracing::info!("Created question {} in category {}", question.id, question.category_id);
    Ok((StatusCode::CREATED, Json(question)))
}

async fn get_question(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Question>, ApiError> {
    state
        .store
        .get_question(id)
        .await
        .map_err(ApiError::store("Failed to fetch question"))?
        .map(Json)
        .ok_or(ApiError::NotFound("Question"))
}

async fn update_question(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateQuestionPayload>,
) -> Result<Json<Question>, ApiError> {
    let content = required_text(&payload.content, "Question content is required")?;
    if let Some(category_id) = payload.category_id {
        ensure_category(&state, category_id).await?;
    }

    let update = QuestionUpdate {
        content,
        category_id: payload.category_id,
        notes: payload.notes.as_deref().map(|n| normalize_notes(Some(n))),
    };

    let question = state
        .store
        .update_question(id, update)
        .await
        .map_err(ApiError::store("Failed to update question"))?
        .ok_or(ApiError::NotFound("Question"))?;

    tracing::info!("Updated question {}", question.id);
    Ok(Json(question))
}

async fn delete_question(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .store
        .delete_question(id)
        .await
        .map_err(ApiError::store("Failed to delete question"))?;
    if !deleted {
        return Err(ApiError::NotFound("Question"));
    }

    tracing::info!("Deleted question {}", id);
    Ok(Json(json!({ "success": true })))
}
