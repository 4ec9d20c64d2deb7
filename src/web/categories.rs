use crate::domain::models::Category;
use crate::state::SharedState;
use crate::web::error::{required_text, ApiError, ApiJson, ApiPath};
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category))
        .with_state(state)
}

async fn list_categories(State(state): State<SharedState>) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state
        .store
        .list_categories()
        .await
        .map_err(ApiError::store("Failed to fetch categories"))?;
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let name = required_text(&payload.name, "Category name is required")?;

    let category = state
        .store
        .create_category(&name)
        .await
        .map_err(ApiError::store("Failed to create category"))?;

    tracing::info!("Created category {} ({})", category.id, category.name);
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Category>, ApiError> {
    state
        .store
        .get_category(id)
        .await
        .map_err(ApiError::store("Failed to fetch category"))?
        .map(Json)
        .ok_or(ApiError::NotFound("Category"))
}

async fn update_category(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> Result<Json<Category>, ApiError> {
    let name = required_text(&payload.name, "Category name is required")?;

    let category = state
        .store
        .update_category(id, &name)
        .await
        .map_err(ApiError::store("Failed to update category"))?
        .ok_or(ApiError::NotFound("Category"))?;

    tracing::info!("Renamed category {} to {}", category.id, category.name);
    Ok(Json(category))
}
