use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use super::jwt::JwtKeys;
use crate::errors::ApiError;

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    lazy_static! {
        static ref BEARER_RE: Regex = Regex::new(r"^(?i:bearer) +(\S+)$").unwrap();
    }
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    BEARER_RE
        .captures(value.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// The raw bearer token, not yet verified.
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            Some(token) => Ok(BearerToken(token.to_owned())),
            None => {
                let keys = JwtKeys::from_ref(state);
                warn!("missing or malformed authorization header");
                Err(ApiError::unverified(
                    "missing or malformed authorization header",
                    &keys.realm,
                ))
            }
        }
    }
}

/// Verified subject of the request. Handlers taking this only run for valid tokens.
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let keys = JwtKeys::from_ref(state);

        match keys.verify(&token) {
            Ok(subject) => Ok(AuthUser(subject)),
            Err(e) => {
                warn!(reason = %e, "invalid or expired token");
                Err(ApiError::unverified("invalid or expired token", &keys.realm))
            }
        }
    }
}
