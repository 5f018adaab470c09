use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Every user-visible failure in the API. Handlers return these
/// directly; nothing is retried or swallowed.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Incorrect username or password")]
    InvalidCredential,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Not authorized")]
    Forbidden,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Unknown question id {0}")]
    InvalidAnswer(i32),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many attempts, try again later")]
    RateLimited,

    #[error("Submission could not be committed")]
    Transaction(#[source] sqlx::Error),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredential | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidAnswer(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Transaction(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Transaction(err) => tracing::error!("Submission failed: {}", err),
            ApiError::Internal(err) => tracing::error!("Internal error: {:#}", err),
            _ => {}
        }

        let body = Json(json!({ "detail": self.to_string() }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_statuses() {
        assert_eq!(ApiError::InvalidCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::BadRequest("Username and password required").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("questionnaire").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::InvalidAnswer(9).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            ApiError::Conflict("Username already registered".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn messages_name_the_offending_input() {
        assert_eq!(ApiError::InvalidAnswer(42).to_string(), "Unknown question id 42");
        assert_eq!(ApiError::NotFound("questionnaire").to_string(), "questionnaire not found");
    }
}
