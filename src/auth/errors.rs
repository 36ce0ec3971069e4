use thiserror::Error;

/// Failures of the password hasher.
#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// The stored digest could not be parsed. Callers treat this as a non-match.
    #[error("stored password digest is corrupt: {0}")]
    CorruptDigest(String),
}

/// Failures of token issuance and verification.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    BadSignature,

    #[error("token is malformed")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("token expiry is outside the representable date range")]
    ExpiryOutOfRange,
}

impl TokenError {
    /// Issuance failures are server-side; everything else is the caller's token.
    pub fn is_verification(&self) -> bool {
        !matches!(self, TokenError::Signing(_) | TokenError::ExpiryOutOfRange)
    }
}

/// Failures reported by a [`UserStore`](crate::auth::repo::UserStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists")]
    Duplicate,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => StoreError::Duplicate,
            _ => StoreError::Backend(e.into()),
        }
    }
}

/// Errors of the register/login flows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("username already exists")]
    Conflict,

    /// Unknown user and wrong password share this variant on purpose.
    #[error("incorrect username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("user store failure: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AuthError::Conflict,
            other => AuthError::Store(other),
        }
    }
}
