use axum::http::{header::AUTHORIZATION, HeaderMap};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

use super::{claims::Claims, jwt::TokenError, jwt::TokenService};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("Authorization header missing")]
    Missing,
    #[error("Invalid authorization format")]
    Malformed,
    #[error("Invalid token: {0}")]
    Token(#[from] TokenError),
}

/// Pulls the token out of `Bearer <token>`: one whitespace character after the
/// scheme, then a non-empty token with no whitespace.
pub(crate) fn bearer_token(value: &str) -> Option<&str> {
    lazy_static! {
        static ref BEARER_RE: Regex = Regex::new(r"^Bearer\s(\S+)$").expect("static regex");
    }
    BEARER_RE
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Validates the request's bearer token and returns its claims.
///
/// Any valid token grants access to every protected route; claims are not
/// used to scope resources to their owner.
pub fn authenticate(
    headers: &HeaderMap,
    tokens: &dyn TokenService,
) -> Result<Claims, AuthRejection> {
    let header = headers.get(AUTHORIZATION).ok_or(AuthRejection::Missing)?;
    let value = header.to_str().map_err(|_| AuthRejection::Malformed)?;
    let token = bearer_token(value).ok_or(AuthRejection::Malformed)?;

    tokens.validate(token).map_err(|e| {
        warn!(reason = %e, "token rejected");
        AuthRejection::Token(e)
    })
}
