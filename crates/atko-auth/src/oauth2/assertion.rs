//! Signed client assertions (RFC 7523) for the client credentials flow

use chrono::Utc;
use jsonwebtoken::{Header, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SigningKey;
use crate::error::{AuthError, AuthResult};

/// `client_assertion_type` sent alongside every assertion
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Lifetime of an assertion in seconds
const ASSERTION_TTL: i64 = 3600;

/// Claims of a client assertion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl AssertionClaims {
    /// Claims for `client_id` addressed to `audience`, issued now
    pub fn new(client_id: &str, audience: &str) -> Self {
        let iat = Utc::now().timestamp();
        Self {
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            aud: audience.to_string(),
            iat,
            exp: iat + ASSERTION_TTL,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Sign a client assertion bound to `audience`
///
/// The audience is the endpoint the assertion is presented to (token or introspection).
///
/// # Errors
///
/// Returns [`AuthError::Configuration`] when signing fails with the configured key.
pub fn sign_client_assertion(
    client_id: &str,
    audience: &str,
    key: &SigningKey,
) -> AuthResult<String> {
    let mut header = Header::new(key.algorithm());
    header.kid = key.key_id().map(str::to_string);

    encode(
        &header,
        &AssertionClaims::new(client_id, audience),
        key.encoding_key(),
    )
    .map_err(|e| AuthError::Configuration(format!("cannot sign client assertion: {e}")))
}
