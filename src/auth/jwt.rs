use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use super::claims::Claims;
use crate::config::JwtConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Malformed token")]
    Malformed,
    #[error("Token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Issues and validates bearer tokens.
///
/// Tokens are stateless: nothing is stored server side and expiry is the only
/// way a token stops being valid.
pub trait TokenService: Send + Sync {
    /// Claims for a fresh login, stamped with the current time and TTL.
    fn claims_for(&self, user_id: i64, username: &str) -> Claims;

    fn issue(&self, claims: &Claims) -> Result<String, TokenError>;

    /// Signature is checked before expiry, so a forged token always reports
    /// `InvalidSignature` whatever its `exp` says.
    fn validate(&self, token: &str) -> Result<Claims, TokenError>;

    fn ttl_seconds(&self) -> i64;
}

/// HS256 keys plus issuer/TTL settings.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl_seconds: i64,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            ttl_seconds: cfg.ttl_seconds,
        }
    }

    pub fn validate_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.exp < now {
            return Err(TokenError::Expired);
        }
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}

fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

impl TokenService for JwtKeys {
    fn claims_for(&self, user_id: i64, username: &str) -> Claims {
        Claims::new(&self.issuer, user_id, username, unix_now(), self.ttl_seconds)
    }

    fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(user_id = claims.user_id, "jwt signed");
        Ok(token)
    }

    fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, unix_now())
    }

    fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }
}
