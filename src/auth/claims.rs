use serde::{Deserialize, Serialize};

/// JWT payload. Nothing else is signed into a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub exp: i64,    // expires at (unix timestamp)
}
