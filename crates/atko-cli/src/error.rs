//! Error types for CLI operations

use std::fmt;

use atko_auth::AuthError;
use atko_client::ClientError;
use thiserror::Error;

/// CLI-specific errors with rich context
#[derive(Error, Debug)]
pub enum CliError {
    /// OAuth flows, token cache and HTTP transport
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Users and groups API
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The selected profile is not configured
    #[error("Profile '{0}' is not configured")]
    ProfileNotFound(String),

    /// The user declined a confirmation prompt
    #[error("Operation cancelled")]
    Cancelled,

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// CSV output error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// Get user-friendly suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::ProfileNotFound(_) => vec![
                "Run `atko config list` to find the configured profiles",
                "Run `atko config init` to configure this profile",
            ],
            Self::InvalidArguments(_) => vec!["Use --help to see expected format"],
            Self::Auth(err) | Self::Client(ClientError::Auth(err)) => auth_suggestions(err),
            Self::Client(ClientError::Csv(_)) => {
                vec!["Check that the file has a header row and one record per line"]
            }
            Self::Config(_) => vec!["Check ~/.atko/config.yaml and ~/.atko/credentials.yaml"],
            _ => vec![],
        }
    }

    /// Get the error category for colored output
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth(err) | Self::Client(ClientError::Auth(err)) => err.category().into(),
            Self::Client(ClientError::InvalidInput(_)) | Self::InvalidArguments(_) => {
                ErrorCategory::User
            }
            Self::Client(ClientError::UnexpectedResponse(_)) => ErrorCategory::Service,
            Self::Client(ClientError::Csv(_) | ClientError::Json(_)) => ErrorCategory::Parsing,
            Self::Client(ClientError::Io(_)) | Self::Io(_) => ErrorCategory::System,
            Self::ProfileNotFound(_) | Self::Config(_) => ErrorCategory::Config,
            Self::Json(_) | Self::Yaml(_) | Self::Csv(_) => ErrorCategory::Parsing,
            Self::Cancelled | Self::Other(_) => ErrorCategory::Other,
        }
    }
}

fn auth_suggestions(err: &AuthError) -> Vec<&'static str> {
    match err {
        AuthError::Configuration(_) => vec![
            "Check the oauth_flow and its parameters with `atko config show`",
            "Run `atko config init` to update the profile",
        ],
        AuthError::UnsupportedFlow { .. } => {
            vec!["Use a command that matches the profile's oauth_flow"]
        }
        AuthError::Token { code, .. } if code == "invalid_token" || code == "not_authenticated" => {
            vec![
                "Run `atko auth login` to obtain a new token",
                "Use `atko auth seed <TOKEN>` for manual profiles",
            ]
        }
        AuthError::Token { .. } => vec!["Run `atko auth login` to authorize again"],
        AuthError::Service { status: 401, .. } => vec![
            "Check the API token or client credentials of the profile",
            "Run `atko auth login` to obtain a new token",
        ],
        AuthError::Service { status: 403, .. } => {
            vec!["Check that the token was granted the required scopes"]
        }
        AuthError::Transport { .. } => vec![
            "Verify the base_url of the profile",
            "Verify network connectivity",
        ],
        AuthError::CacheCorruption { .. } => vec![
            "Delete ~/.atko/cache.json and authenticate again",
            "Run `atko cache remove <PROFILE>` to drop a single profile",
        ],
        AuthError::InvalidCacheKey(_) => vec!["Keys look like default, default:UserMgr or default:UserMgr:access_token"],
        AuthError::PortUnavailable { .. } => {
            vec!["Stop the process listening on the callback port and retry"]
        }
        AuthError::Browser(_) => vec!["Run `atko auth url` and open the URL manually"],
        _ => vec![],
    }
}

/// Error categories for colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Token,
    Service,
    Connection,
    Cache,
    User,
    Parsing,
    System,
    Other,
}

impl From<atko_auth::ErrorCategory> for ErrorCategory {
    fn from(category: atko_auth::ErrorCategory) -> Self {
        match category {
            atko_auth::ErrorCategory::Config => Self::Config,
            atko_auth::ErrorCategory::Token => Self::Token,
            atko_auth::ErrorCategory::Service => Self::Service,
            atko_auth::ErrorCategory::Transport => Self::Connection,
            atko_auth::ErrorCategory::Cache => Self::Cache,
            atko_auth::ErrorCategory::User => Self::User,
            atko_auth::ErrorCategory::System => Self::System,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "Configuration"),
            Self::Token => write!(f, "Token"),
            Self::Service => write!(f, "Service"),
            Self::Connection => write!(f, "Connection"),
            Self::Cache => write!(f, "Cache"),
            Self::User => write!(f, "User Input"),
            Self::Parsing => write!(f, "Parsing"),
            Self::System => write!(f, "System"),
            Self::Other => write!(f, "Error"),
        }
    }
}

impl From<String> for CliError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for CliError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
