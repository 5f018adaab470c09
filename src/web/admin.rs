use crate::db::{self, QuestionnaireReport, ResponseWithAnswers, UserResponseCount};
use crate::state::SharedState;
use crate::web::error::ApiError;
use crate::web::session::{require_admin, AuthUser};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/responses/", get(list_all_responses))
        .route("/users/:id/responses", get(list_user_responses))
        .route("/user-responses", get(response_counts))
        .route("/user-responses/:username", get(user_response_detail))
        .with_state(state)
}

async fn list_all_responses(
    AuthUser(identity): AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<ResponseWithAnswers>>, ApiError> {
    require_admin(&identity)?;

    let responses = db::all_responses(&state.pool).await?;
    Ok(Json(responses))
}

async fn list_user_responses(
    AuthUser(identity): AuthUser,
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<ResponseWithAnswers>>, ApiError> {
    require_admin(&identity)?;

    let responses = db::responses_by_user(&state.pool, user_id).await?;
    Ok(Json(responses))
}

async fn response_counts(
    AuthUser(identity): AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<UserResponseCount>>, ApiError> {
    require_admin(&identity)?;

    let counts = db::response_counts_by_non_admin(&state.pool).await?;
    Ok(Json(counts))
}

async fn user_response_detail(
    AuthUser(identity): AuthUser,
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<QuestionnaireReport>>, ApiError> {
    require_admin(&identity)?;

    let user = db::find_user_by_username(&state.pool, &username)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let report = db::user_report(&state.pool, user.id).await?;
    Ok(Json(report))
}
