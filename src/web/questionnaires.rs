use crate::db;
use crate::domain::models::{order_questions, Question, Questionnaire};
use crate::state::SharedState;
use crate::web::error::ApiError;
use crate::web::session::AuthUser;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct QuestionnaireDetail {
    pub id: i32,
    pub name: String,
    pub questions: Vec<Question>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/questionnaires/", get(list_questionnaires))
        .route("/questionnaires/:id", get(get_questionnaire))
        .with_state(state)
}

async fn list_questionnaires(
    AuthUser(_identity): AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Questionnaire>>, ApiError> {
    let questionnaires = db::list_questionnaires(&state.pool).await?;
    Ok(Json(questionnaires))
}

async fn get_questionnaire(
    AuthUser(_identity): AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i32>,
) -> Result<Json<QuestionnaireDetail>, ApiError> {
    let questionnaire = db::find_questionnaire(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("Questionnaire"))?;

    let junctions = db::junction_questions(&state.pool, id).await?;
    let questions = order_questions(junctions);

    Ok(Json(QuestionnaireDetail {
        id: questionnaire.id,
        name: questionnaire.name,
        questions,
    }))
}
