//! Error types for the REST client

use atko_auth::AuthError;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by [`OktaClient`](crate::OktaClient) and the resource managers
#[derive(Error, Debug)]
pub enum ClientError {
    /// Authentication, transport or service failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Malformed CSV import file
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed JSON import file or payload
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading an import file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller supplied something unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The service answered with a document of the wrong shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ClientError {
    /// Machine-readable code of a service or token error
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Auth(e) => e.code(),
            _ => None,
        }
    }

    /// JSON detail recorded for this error in bulk reports
    ///
    /// Service errors contribute the provider's error document; everything else its message.
    pub fn report(&self) -> Value {
        match self {
            Self::Auth(AuthError::Service { info, .. }) if !info.is_null() => info.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_prefers_service_document() {
        let info = json!({"errorCode": "E0000001", "errorSummary": "Api validation failed: login"});
        let err = ClientError::from(AuthError::Service {
            status: 400,
            code: "E0000001".into(),
            message: "Api validation failed: login".into(),
            info: info.clone(),
        });
        assert_eq!(err.report(), info);
        assert_eq!(err.code(), Some("E0000001"));
    }

    #[test]
    fn report_falls_back_to_message() {
        let err = ClientError::InvalidInput("missing login".into());
        assert_eq!(err.report(), json!("Invalid input: missing login"));
        assert!(err.code().is_none());
    }
}
