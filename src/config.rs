use anyhow::{bail, Context};
use axum::http::HeaderValue;
use serde::Deserialize;

/// Default token lifetime: 30 days.
pub const DEFAULT_TTL_MINUTES: i64 = 60 * 24 * 30;
/// Upper bound on the token lifetime: 100 years.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 100;
pub const DEFAULT_REALM: &str = "jwt auth";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    pub realm: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres URL; `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET must be set to a non-empty value")?;

        let ttl_minutes = match lookup("JWT_TTL_MINUTES") {
            Some(v) => v
                .parse::<i64>()
                .with_context(|| format!("JWT_TTL_MINUTES is not a number: {v:?}"))?,
            None => DEFAULT_TTL_MINUTES,
        };
        if ttl_minutes <= 0 {
            bail!("JWT_TTL_MINUTES must be positive, got {ttl_minutes}");
        }
        if ttl_minutes > MAX_TTL_MINUTES {
            bail!("JWT_TTL_MINUTES must be at most {MAX_TTL_MINUTES}, got {ttl_minutes}");
        }

        let realm = lookup("JWT_REALM").unwrap_or_else(|| DEFAULT_REALM.into());
        validate_realm(&realm)?;

        let jwt = JwtConfig {
            secret,
            ttl_minutes,
            realm,
        };

        let port = match lookup("APP_PORT").or_else(|| lookup("PORT")) {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT is not a valid port: {v:?}"))?,
            None => 8000,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            jwt,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
        })
    }
}

/// The realm is sent verbatim inside a quoted `WWW-Authenticate` parameter.
fn validate_realm(realm: &str) -> anyhow::Result<()> {
    if realm.contains(|c: char| c == '"' || c == '\\' || c.is_control()) {
        bail!("JWT_REALM must not contain quotes, backslashes or control characters: {realm:?}");
    }
    HeaderValue::from_str(&format!("Bearer realm=\"{realm}\""))
        .with_context(|| format!("JWT_REALM is not a valid header value: {realm:?}"))?;
    Ok(())
}
