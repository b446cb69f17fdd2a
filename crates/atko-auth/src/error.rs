//! Error types for token acquisition, caching and transport

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::config::OAuthFlow;

/// Failure categories surfaced by the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not reach the server
    Connection,
    /// The request timed out
    Timeout,
    /// Redirect policy was violated
    Redirect,
    /// The response body could not be decoded
    InvalidBody,
    /// Anything else reported by the HTTP client
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Timeout => write!(f, "timeout"),
            Self::Redirect => write!(f, "too many redirects"),
            Self::InvalidBody => write!(f, "invalid response body"),
            Self::Other => write!(f, "request"),
        }
    }
}

/// Errors raised by the OAuth flows, the token cache and the HTTP transport
#[derive(Error, Debug)]
pub enum AuthError {
    /// Invalid or incomplete configuration for the declared flow
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation invoked for a flow that does not support it
    #[error("unsupported_flow: '{operation}' is not available for the '{flow}' flow (supported: {})", format_flows(.allowed))]
    UnsupportedFlow {
        operation: &'static str,
        flow: OAuthFlow,
        allowed: &'static [OAuthFlow],
    },

    /// Token absent, rejected, or the authorization callback reported an error
    #[error("{code}: {message}")]
    Token {
        code: String,
        message: String,
        authorize_url: Option<String>,
    },

    /// The identity provider rejected a request
    #[error("Service error [{status}] {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
        info: Value,
    },

    /// The request never produced a usable response
    #[error("Transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// The persisted token cache is not valid JSON
    #[error("Token cache at {} is corrupt; delete it to recover", .path.display())]
    CacheCorruption { path: PathBuf },

    /// Cache key does not follow `profile[:resource[:field]]`
    #[error("Invalid cache key '{0}': expected profile[:resource[:field]]")]
    InvalidCacheKey(String),

    /// The local callback listener could not bind its port
    #[error("Port {port} is unavailable for the authorization callback: {reason}")]
    PortUnavailable { port: u16, reason: String },

    /// The system browser could not be launched
    #[error("Failed to open browser: {0}")]
    Browser(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_flows(flows: &[OAuthFlow]) -> String {
    flows
        .iter()
        .map(OAuthFlow::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AuthError {
    /// Shorthand for a token error without a remediation URL
    pub fn token(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Token {
            code: code.into(),
            message: message.into(),
            authorize_url: None,
        }
    }

    /// Provider error code for service and token errors
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Token { code, .. } | Self::Service { code, .. } => Some(code),
            Self::UnsupportedFlow { .. } => Some("unsupported_flow"),
            _ => None,
        }
    }

    /// Get the error category for colored output
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::UnsupportedFlow { .. } => ErrorCategory::Config,
            Self::Token { .. } => ErrorCategory::Token,
            Self::Service { .. } => ErrorCategory::Service,
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::CacheCorruption { .. } => ErrorCategory::Cache,
            Self::InvalidCacheKey(_) => ErrorCategory::User,
            Self::PortUnavailable { .. } | Self::Browser(_) | Self::Io(_) => ErrorCategory::System,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() {
            TransportErrorKind::Connection
        } else if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_redirect() {
            TransportErrorKind::Redirect
        } else if err.is_decode() {
            TransportErrorKind::InvalidBody
        } else {
            TransportErrorKind::Other
        };
        Self::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

/// Error categories for colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Token,
    Service,
    Transport,
    Cache,
    User,
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "Configuration"),
            Self::Token => write!(f, "Token"),
            Self::Service => write!(f, "Service"),
            Self::Transport => write!(f, "Transport"),
            Self::Cache => write!(f, "Cache"),
            Self::User => write!(f, "User Input"),
            Self::System => write!(f, "System"),
        }
    }
}

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_flow_names_allowed_set() {
        let err = AuthError::UnsupportedFlow {
            operation: "build_authorization_url",
            flow: OAuthFlow::Password,
            allowed: &[OAuthFlow::Implicit, OAuthFlow::Pkce],
        };
        let text = err.to_string();
        assert!(text.starts_with("unsupported_flow"));
        assert!(text.contains("implicit, pkce"));
        assert_eq!(err.category(), ErrorCategory::Config);
        assert_eq!(err.code(), Some("unsupported_flow"));
    }

    #[test]
    fn token_error_display_carries_code_and_message() {
        let err = AuthError::token("access_denied", "user cancelled");
        assert_eq!(err.to_string(), "access_denied: user cancelled");
    }
}
