//! Token endpoint responses

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Fields of a token endpoint response the lifecycle manager inspects
#[derive(Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

// Manual Debug impl to prevent token exposure in logs
impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .finish()
    }
}

impl TokenResponse {
    /// Turn the response into a token pair, or a token error when no access token was issued
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Token`] carrying the provider's `error`/`error_description`.
    pub fn into_pair(self) -> AuthResult<TokenPair> {
        match self.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(TokenPair {
                access_token,
                refresh_token: self.refresh_token.unwrap_or_default(),
            }),
            _ => Err(AuthError::token(
                self.error.unwrap_or_else(|| "no_access_token".to_string()),
                self.error_description
                    .unwrap_or_else(|| "token endpoint did not issue an access token".to_string()),
            )),
        }
    }
}

/// Access token with its refresh token (empty when none was issued)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .finish()
    }
}

/// `token_type_hint` values for introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenTypeHint {
    #[default]
    AccessToken,
    RefreshToken,
}

impl TokenTypeHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}
