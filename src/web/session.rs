use crate::db;
use crate::domain::models::Identity;
use crate::state::SharedState;
use crate::web::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verified token contents: the subject username and expiry.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub subject: String,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
}

/// Signed bearer token: `base64(subject|exp) . base64(hmac)`. Opaque to
/// every other component; the subject is the username.
pub fn sign_token(subject: &str, key: &[u8], ttl_minutes: i64) -> Result<String, TokenError> {
    let exp = Utc::now() + Duration::minutes(ttl_minutes);
    let payload = format!("{}|{}", subject, exp.timestamp());
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::Invalid)?;
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    let token = format!(
        "{}.{}",
        general_purpose::STANDARD.encode(payload.as_bytes()),
        general_purpose::STANDARD.encode(sig)
    );
    Ok(token)
}

pub fn verify_token(token: &str, key: &[u8]) -> Result<TokenClaims, TokenError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(TokenError::Invalid)?;
    let payload_bytes = general_purpose::STANDARD
        .decode(payload_b64)
        .map_err(|_| TokenError::Invalid)?;
    let sig_bytes = general_purpose::STANDARD
        .decode(sig_b64)
        .map_err(|_| TokenError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::Invalid)?;
    mac.update(&payload_bytes);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| TokenError::Signature)?;

    let payload = String::from_utf8(payload_bytes).map_err(|_| TokenError::Invalid)?;
    // usernames may contain '|'; the expiry is always the last segment
    let (subject, exp_raw) = payload.rsplit_once('|').ok_or(TokenError::Invalid)?;
    let exp: i64 = exp_raw.parse().map_err(|_| TokenError::Invalid)?;
    if Utc::now().timestamp() > exp {
        return Err(TokenError::Expired);
    }
    Ok(TokenClaims {
        subject: subject.to_string(),
        exp,
    })
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(axum::http::header::AUTHORIZATION)?;
    let val = auth.to_str().ok()?;
    let bearer = val.strip_prefix("Bearer ")?;
    Some(bearer.trim().to_string())
}

pub fn require_admin(identity: &Identity) -> Result<(), ApiError> {
    if !identity.is_admin {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// Extractor that validates the bearer token and resolves its subject
/// to a live user.
///
/// Usage:
/// ```ignore
/// async fn handler(AuthUser(identity): AuthUser) -> Result<...> {
///     // identity is the authenticated caller
/// }
/// ```
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared_state = SharedState::from_ref(state);

        let token = extract_bearer(&parts.headers).ok_or(ApiError::InvalidToken)?;

        let claims = verify_token(&token, &shared_state.config.session_key).map_err(|e| {
            tracing::warn!("Token verification failed: {}", e);
            ApiError::InvalidToken
        })?;

        let user = db::find_user_by_username(&shared_state.pool, &claims.subject)
            .await
            .map_err(|e| {
                tracing::warn!("User lookup failed for token subject: {}", e);
                ApiError::InvalidToken
            })?;

        let Some(user) = user else {
            return Err(ApiError::InvalidToken);
        };

        Ok(AuthUser(Identity {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test-signing-key";

    #[test]
    fn round_trips_subject_and_expiry() {
        let token = sign_token("alice", KEY, 30).unwrap();
        let claims = verify_token(&token, KEY).unwrap();
        assert_eq!(claims.subject, "alice");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn subject_may_contain_separator() {
        let token = sign_token("al|ice", KEY, 30).unwrap();
        let claims = verify_token(&token, KEY).unwrap();
        assert_eq!(claims.subject, "al|ice");
    }

    #[test]
    fn rejects_expired_token() {
        let token = sign_token("alice", KEY, -5).unwrap();
        assert!(matches!(verify_token(&token, KEY), Err(TokenError::Expired)));
    }

    #[test]
    fn rejects_wrong_key() {
        let token = sign_token("alice", KEY, 30).unwrap();
        assert!(matches!(
            verify_token(&token, b"other-key"),
            Err(TokenError::Signature)
        ));
    }

    #[test]
    fn rejects_tampered_payload() {
        let token = sign_token("alice", KEY, 30).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged_payload =
            general_purpose::STANDARD.encode(format!("mallory|{}", Utc::now().timestamp() + 600));
        let forged = format!("{}.{}", forged_payload, sig);
        assert!(matches!(
            verify_token(&forged, KEY),
            Err(TokenError::Signature)
        ));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(verify_token("", KEY).is_err());
        assert!(verify_token("not-a-token", KEY).is_err());
        assert!(verify_token("a.b.c", KEY).is_err());
        assert!(verify_token("%%%.%%%", KEY).is_err());
    }

    #[test]
    fn extracts_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer abc.def".parse().unwrap(),
        );
        assert_eq!(extract_bearer(&headers), Some("abc.def".to_string()));

        let mut basic = HeaderMap::new();
        basic.insert(
            axum::http::header::AUTHORIZATION,
            "Basic abc".parse().unwrap(),
        );
        assert_eq!(extract_bearer(&basic), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn admin_gate_rejects_non_admin() {
        let admin = Identity {
            id: uuid::Uuid::new_v4(),
            username: "admin".to_string(),
            is_admin: true,
        };
        let user = Identity {
            id: uuid::Uuid::new_v4(),
            username: "bob".to_string(),
            is_admin: false,
        };
        assert!(require_admin(&admin).is_ok());
        assert!(matches!(require_admin(&user), Err(ApiError::Forbidden)));
    }
}
