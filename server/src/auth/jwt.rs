//! JWT session token handling

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT validation error
#[derive(Debug)]
pub enum JwtError {
    /// Token signature has expired
    Expired,
    /// Token signature is invalid
    InvalidSignature,
    /// Token could not be produced
    Encode(String),
    /// Other validation error
    Invalid(String),
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "Session token has expired"),
            Self::InvalidSignature => write!(f, "Invalid session token signature"),
            Self::Encode(msg) => write!(f, "Failed to create session token: {}", msg),
            Self::Invalid(msg) => write!(f, "Invalid session token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// JWT claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    pub login: String,
    pub iat: i64,
    pub exp: i64,
    /// Session record ID
    pub jti: String,
    pub auth_method: String,
}

impl SessionClaims {
    pub fn new(user_id: &str, login: &str, auth_method: &str, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            login: login.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            auth_method: auth_method.to_string(),
        }
    }

    /// Get the user ID from claims
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Sign claims into a compact JWT
pub fn encode_token(signing_key: &[u8], claims: &SessionClaims) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| JwtError::Encode(e.to_string()))
}

/// Validate signature and expiry, returning the claims
pub fn decode_token(token: &str, signing_key: &[u8]) -> Result<SessionClaims, JwtError> {
    decode_with(token, signing_key, true)
}

/// Validate the signature only; expired tokens still decode
///
/// Used to locate the session record of a token that is being replaced or
/// revoked, which must work even after the token expired.
pub fn decode_token_ignoring_expiry(
    token: &str,
    signing_key: &[u8],
) -> Result<SessionClaims, JwtError> {
    decode_with(token, signing_key, false)
}

fn decode_with(
    token: &str,
    signing_key: &[u8],
    validate_exp: bool,
) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = validate_exp;
    validation.leeway = 0;
    if !validate_exp {
        validation.required_spec_claims.clear();
    }

    let token_data =
        decode::<SessionClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::Invalid(e.to_string()),
            })?;

    Ok(token_data.claims)
}
