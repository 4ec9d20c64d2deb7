use crate::db::StoreError;
use crate::services::composer::ComposeError;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Every failure leaves the API as `{"error": "..."}` with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    /// Store failure; only `context` reaches the client.
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// `map_err` adapter: constraint conflicts become 409, anything else a logged 500.
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |source| match source {
            StoreError::Conflict(message) => ApiError::Conflict(message),
            source => ApiError::Store { context, source },
        }
    }

    pub fn compose(context: &'static str) -> impl FnOnce(ComposeError) -> ApiError {
        move |err| match err {
            ComposeError::TestNotFound => ApiError::NotFound("Test"),
            ComposeError::UnknownQuestions(ids) => {
                ApiError::BadRequest(format!("Unknown question ids: {:?}", ids))
            }
            ComposeError::Store(source) => ApiError::store(context)(source),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store { context, source } = &self {
            tracing::error!("{}: {}", context, source);
        }
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `axum::Json` whose rejections answer 400 with the JSON error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Trims a required text field, rejecting blank input with `message`.
pub fn required_text(value: &str, message: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(message));
    }
    Ok(trimmed.to_string())
}
