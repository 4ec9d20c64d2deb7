pub mod categories;
pub mod error;
pub mod interviews;
pub mod questions;
pub mod test_sets;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/categories", categories::router(state.clone()))
        .nest("/api/questions", questions::router(state.clone()))
        .nest("/api/tests", test_sets::router(state.clone()))
        .nest("/api/interviews", interviews::router(state))
}
