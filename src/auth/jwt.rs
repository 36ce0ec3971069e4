use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::{claims::Claims, errors::TokenError};
use crate::{config::JwtConfig, state::AppState};

/// Signing material plus token policy. Built once at start-up, read-only afterwards.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub ttl: Duration,
    pub realm: String,
}

/// A freshly signed token and the instant it stops being valid.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.auth.keys().clone()
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            ttl: Duration::seconds(cfg.ttl_minutes.saturating_mul(60)),
            realm: cfg.realm.clone(),
        }
    }

    pub fn issue(&self, subject: &str) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, OffsetDateTime::now_utc())
    }

    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Re-issue for the same subject. Expired tokens are not refreshable.
    pub fn refresh(&self, token: &str) -> Result<IssuedToken, TokenError> {
        self.refresh_at(token, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(
        &self,
        subject: &str,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, TokenError> {
        // JWT timestamps are whole seconds, so the expiry can land up to 1s
        // before `now + ttl`; never after it.
        let expires_at = now
            .checked_sub(Duration::nanoseconds(i64::from(now.nanosecond())))
            .and_then(|issued_at| issued_at.checked_add(self.ttl))
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = Claims {
            sub: subject.to_owned(),
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        debug!(subject = %subject, exp = claims.exp, "jwt signed");
        Ok(IssuedToken { token, expires_at })
    }

    pub(crate) fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked below against `now`, with no leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        })?;
        let claims = data.claims;

        if claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }
        if claims.exp <= now.unix_timestamp() {
            return Err(TokenError::Expired);
        }
        debug!(subject = %claims.sub, "jwt verified");
        Ok(claims.sub)
    }

    pub(crate) fn refresh_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, TokenError> {
        let subject = self.verify_at(token, now)?;
        self.issue_at(&subject, now)
    }
}
