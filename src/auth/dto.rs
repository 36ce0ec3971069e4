use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Request body for both register and login.
///
/// Missing fields come through as empty strings so the auth core reports
/// them as validation errors.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Public part of the user returned after registration.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
}

/// Body of the protected `/auth/hello` route.
#[derive(Debug, Serialize)]
pub struct HelloResponse {
    pub subject: String,
    pub text: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub current_time: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_empty() {
        let creds: Credentials = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(creds.username, "alice");
        assert!(creds.password.is_empty());
    }

    #[test]
    fn debug_never_prints_password() {
        let creds = Credentials {
            username: "alice".into(),
            password: "s3cret".into(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("s3cret"));
    }
}
