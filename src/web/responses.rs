use crate::db::{self, NewAnswer, ResponseWithAnswers};
use crate::domain::submission;
use crate::state::SharedState;
use crate::web::error::ApiError;
use crate::web::session::AuthUser;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct AnswerPayload {
    pub question_id: i32,
    pub value: Vec<String>,
}

#[derive(Deserialize)]
pub struct SubmitPayload {
    pub questionnaire_id: i32,
    pub answers: Vec<AnswerPayload>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/responses/", post(submit_response))
        .with_state(state)
}

/// Submit or resubmit a questionnaire. A resubmission fully supersedes
/// the caller's previous response; nothing is applied if any part of
/// the submission is invalid or fails to commit.
async fn submit_response(
    AuthUser(identity): AuthUser,
    State(state): State<SharedState>,
    Json(payload): Json<SubmitPayload>,
) -> Result<Json<ResponseWithAnswers>, ApiError> {
    db::find_questionnaire(&state.pool, payload.questionnaire_id)
        .await?
        .ok_or(ApiError::NotFound("Questionnaire"))?;

    let question_ids: Vec<i32> = payload.answers.iter().map(|a| a.question_id).collect();

    if let Some(id) = submission::first_duplicate_question(&question_ids) {
        return Err(ApiError::Conflict(format!(
            "Duplicate answer for question id {}",
            id
        )));
    }

    let known = db::existing_question_ids(&state.pool, &question_ids).await?;
    if let Some(id) = submission::first_unknown_question(&question_ids, &known) {
        return Err(ApiError::InvalidAnswer(id));
    }

    let answers: Vec<NewAnswer> = payload
        .answers
        .iter()
        .map(|a| NewAnswer {
            question_id: a.question_id,
            // submitted value list is stored verbatim; option membership
            // for mcq questions is deliberately not enforced
            value: serde_json::json!(a.value),
        })
        .collect();

    let response = db::replace_response(
        &state.pool,
        identity.id,
        payload.questionnaire_id,
        &answers,
    )
    .await
    .map_err(ApiError::Transaction)?;

    tracing::info!(
        "User {} submitted response {} for questionnaire {}",
        identity.username,
        response.id,
        response.questionnaire_id
    );

    Ok(Json(response))
}
