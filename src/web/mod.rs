pub mod admin;
pub mod auth;
pub mod error;
pub mod questionnaires;
pub mod responses;
pub mod session;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router(state.clone()))
        .merge(questionnaires::router(state.clone()))
        .merge(responses::router(state.clone()))
        .nest("/admin", admin::router(state))
}
