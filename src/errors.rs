use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::auth::errors::AuthError;

/// Client-facing error. Every failing request ends up here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Validation(String),
    Conflict(String),
    Unauthorized {
        kind: &'static str,
        message: String,
        realm: String,
    },
    Internal,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: u16,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    /// Rejection issued by the authorization gate.
    pub fn unverified(message: impl Into<String>, realm: &str) -> Self {
        ApiError::Unauthorized {
            kind: "verification",
            message: message.into(),
            realm: realm.to_owned(),
        }
    }

    /// Translate a core error. Internal causes are logged here and not exposed.
    pub fn from_auth(err: AuthError, realm: &str) -> Self {
        match err {
            AuthError::Validation(msg) => ApiError::Validation(msg.into()),
            AuthError::Conflict => ApiError::Conflict(err.to_string()),
            AuthError::InvalidCredentials => ApiError::Unauthorized {
                kind: "authentication",
                message: err.to_string(),
                realm: realm.to_owned(),
            },
            AuthError::Token(ref e) if e.is_verification() => {
                ApiError::unverified("invalid or expired token", realm)
            }
            AuthError::Token(_) | AuthError::Password(_) | AuthError::Store(_) => {
                error!(error = %err, "request failed");
                ApiError::Internal
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (kind, message, challenge) = match self {
            ApiError::Validation(msg) => ("validation", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::Unauthorized {
                kind,
                message,
                realm,
            } => (kind, message, Some(format!("Bearer realm=\"{}\"", realm))),
            ApiError::Internal => ("internal", "internal server error".to_string(), None),
        };

        let body = ApiErrorBody {
            code: status.as_u16(),
            kind,
            message,
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(challenge) = challenge {
            // config rejects unencodable realms; a 401 still never goes out without a challenge
            let value = HeaderValue::from_str(&challenge).unwrap_or_else(|_| {
                warn!(challenge = %challenge, "realm is not a valid header value");
                HeaderValue::from_static("Bearer")
            });
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}
