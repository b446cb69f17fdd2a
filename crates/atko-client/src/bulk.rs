//! Outcome of operations applied to many records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ClientError;

/// Per-item outcome of a bulk operation
///
/// `failure[i]` failed with `errors[i]`. A failing item never stops the remaining ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    pub success: Vec<Value>,
    pub failure: Vec<Value>,
    pub errors: Vec<Value>,
}

impl BulkResult {
    pub fn record_success(&mut self, item: impl Into<Value>) {
        self.success.push(item.into());
    }

    pub fn record_failure(&mut self, item: impl Into<Value>, error: &ClientError) {
        let item = item.into();
        warn!(%error, "bulk item failed");
        self.failure.push(item);
        self.errors.push(error.report());
    }

    pub fn is_complete_success(&self) -> bool {
        self.failure.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failures_pair_with_errors() {
        let mut result = BulkResult::default();
        result.record_success("00u1");
        result.record_failure("00u2", &ClientError::InvalidInput("nope".into()));

        assert!(!result.is_complete_success());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"success": ["00u1"], "failure": ["00u2"], "errors": ["Invalid input: nope"]})
        );
    }
}
