use crate::db;
use crate::state::SharedState;
use crate::web::error::ApiError;
use crate::web::session::{self, AuthUser};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use axum::{
    extract::{ConnectInfo, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CredentialPayload {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Deserialize)]
pub struct CreateUserPayload {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/token", post(issue_token))
        .route("/users/", post(create_user))
        .route("/users/me", get(current_user))
        .with_state(state)
}

pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

async fn issue_token(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<SharedState>,
    Json(payload): Json<CredentialPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    let ip = addr.ip().to_string();
    if !state.login_limiter.check(&ip).await {
        tracing::warn!("Login rate limit exceeded for IP: {}", ip);
        return Err(ApiError::RateLimited);
    }

    let user = db::find_user_by_username(&state.pool, &payload.username)
        .await?
        .ok_or(ApiError::InvalidCredential)?;

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::warn!("Invalid password for user: {}", user.username);
        return Err(ApiError::InvalidCredential);
    }

    let token = session::sign_token(
        &user.username,
        &state.config.session_key,
        state.config.token_ttl_minutes,
    )
    .map_err(|e| anyhow::anyhow!("Failed to sign token: {}", e))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer",
    }))
}

async fn create_user(
    State(state): State<SharedState>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<Json<UserResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Username and password required"));
    }

    if db::find_user_by_username(&state.pool, username).await?.is_some() {
        return Err(ApiError::Conflict("Username already registered".to_string()));
    }

    let hash = hash_password(&payload.password)?;
    let user_id = Uuid::new_v4();
    if let Err(e) = db::insert_user(&state.pool, user_id, username, &hash).await {
        // lost the race on the unique constraint
        if db::is_unique_violation(&e) {
            return Err(ApiError::Conflict("Username already registered".to_string()));
        }
        return Err(ApiError::Internal(e.into()));
    }

    tracing::info!("Registered user {}", username);

    Ok(Json(UserResponse {
        id: user_id,
        username: username.to_string(),
        is_admin: false,
    }))
}

async fn current_user(AuthUser(identity): AuthUser) -> Json<UserResponse> {
    Json(UserResponse {
        id: identity.id,
        username: identity.username,
        is_admin: identity.is_admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
