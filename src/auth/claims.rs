use serde::{Deserialize, Serialize};

/// JWT payload used for authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,      // issuer
    pub iat: i64,         // issued at (unix timestamp)
    pub exp: i64,         // expires at (unix timestamp)
    pub user_id: i64,     // users.id
    pub username: String, // users.username
}

impl Claims {
    pub fn new(issuer: &str, user_id: i64, username: &str, now: i64, ttl_seconds: i64) -> Self {
        Self {
            iss: issuer.to_string(),
            iat: now,
            exp: now + ttl_seconds,
            user_id,
            username: username.to_string(),
        }
    }
}
