//! OAuth 2.0 Token Introspection (RFC 7662)
//!
//! The token validator asks the provider whether a token is still active before the
//! lifecycle manager hands it out. A token that was issued moments ago by the token endpoint
//! may skip the round-trip ([`Verification::TrustIssued`]); a token read back from the cache
//! never may, since the cache carries no freshness guarantee.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::oauth2::{OAuthClient, TokenTypeHint};

/// Token introspection response per RFC 7662 Section 2.2
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active (REQUIRED)
    #[serde(default)]
    pub active: bool,

    /// Scope(s) associated with the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Username (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Token type (Bearer, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Expiration timestamp (seconds since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Subject
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Additional fields
    #[serde(flatten)]
    pub additional: HashMap<String, Value>,
}

/// Whether a token has to be introspected before it is trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Ask the introspection endpoint
    Introspect,
    /// Token was issued by the token endpoint in this same operation
    TrustIssued,
}

impl OAuthClient {
    /// Check whether `token` is active
    ///
    /// # Errors
    ///
    /// Discovery, transport and service errors propagate; an inactive token is `Ok(false)`.
    pub async fn is_valid(&self, token: &str, hint: TokenTypeHint) -> AuthResult<bool> {
        self.validate(token, hint, Verification::Introspect).await
    }

    /// Check a token, optionally trusting one that was just issued
    ///
    /// # Errors
    ///
    /// Same as [`OAuthClient::is_valid`].
    pub async fn validate(
        &self,
        token: &str,
        hint: TokenTypeHint,
        verification: Verification,
    ) -> AuthResult<bool> {
        if verification == Verification::TrustIssued {
            debug!("trusting freshly issued token");
            return Ok(true);
        }

        let response = self.introspect(token, hint).await?;
        debug!(active = response.active, hint = hint.as_str(), "introspected token");
        Ok(response.active)
    }

    /// Strict variant of [`OAuthClient::is_valid`]
    ///
    /// # Errors
    ///
    /// Returns an `invalid_token` [`AuthError::Token`] when the provider reports the token
    /// inactive, in addition to the errors of [`OAuthClient::is_valid`].
    pub async fn ensure_valid(&self, token: &str, hint: TokenTypeHint) -> AuthResult<()> {
        if self.is_valid(token, hint).await? {
            Ok(())
        } else {
            Err(AuthError::token(
                "invalid_token",
                format!("the {} is inactive or expired", hint.as_str().replace('_', " ")),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inactive_response_needs_only_active() {
        let response: IntrospectionResponse =
            serde_json::from_value(json!({ "active": false })).unwrap();
        assert!(!response.active);
        assert!(response.additional.is_empty());
    }

    #[test]
    fn extra_claims_are_kept() {
        let response: IntrospectionResponse = serde_json::from_value(json!({
            "active": true,
            "scope": "okta.users.read",
            "client_id": "0oa1",
            "uid": "00u1"
        }))
        .unwrap();
        assert!(response.active);
        assert_eq!(response.additional["uid"], json!("00u1"));
    }
}
