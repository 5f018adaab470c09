use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};

/// Process configuration, loaded once at startup and passed into the
/// shared state. Nothing reads the environment after this point.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub session_key: Vec<u8>,
    pub token_ttl_minutes: i64,
    pub bind_addr: String,
    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL missing")?;

        let session_key_b64 = std::env::var("SESSION_KEY").context("SESSION_KEY missing")?;
        let session_key = general_purpose::STANDARD
            .decode(session_key_b64)
            .context("SESSION_KEY must be base64")?;

        let token_ttl_minutes = match std::env::var("TOKEN_TTL_MINUTES") {
            Ok(raw) => raw.parse().context("TOKEN_TTL_MINUTES must be an integer")?,
            Err(_) => 30,
        };

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let admin_username =
            std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_password = std::env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD missing")?;

        Ok(Self {
            database_url,
            session_key,
            token_ttl_minutes,
            bind_addr,
            admin_username,
            admin_password,
        })
    }
}
