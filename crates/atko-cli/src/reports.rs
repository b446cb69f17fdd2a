//! Result files for bulk operations
//!
//! Successes and failures are written as JSON arrays next to where the command ran, e.g.
//! `atko_user_deactivate_success_20240131-154500.txt`. Provider error documents go to an
//! `atko_errors_*` log when `--debug` is set.

use std::path::PathBuf;

use atko_client::BulkResult;
use chrono::Local;
use serde_json::Value;
use tracing::debug;

use crate::error::CliResult;

/// Writes bulk result files into one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    include_errors: bool,
    stamp: String,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>, include_errors: bool) -> Self {
        Self {
            dir: dir.into(),
            include_errors,
            stamp: Local::now().format("%Y%m%d-%H%M%S").to_string(),
        }
    }

    /// Write the non-empty parts of `result`, returning the files written
    ///
    /// # Errors
    ///
    /// I/O and JSON errors.
    pub fn write(&self, subject: &str, action: &str, result: &BulkResult) -> CliResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        if !result.success.is_empty() {
            written.push(self.write_list(
                &format!("atko_{subject}_{action}_success_{}.txt", self.stamp),
                &result.success,
            )?);
        }
        if !result.failure.is_empty() {
            written.push(self.write_list(
                &format!("atko_{subject}_{action}_failed_{}.txt", self.stamp),
                &result.failure,
            )?);
        }
        if self.include_errors && !result.errors.is_empty() {
            written.push(self.write_list(
                &format!("atko_errors_{subject}_{action}_{}.log", self.stamp),
                &result.errors,
            )?);
        }
        Ok(written)
    }

    fn write_list(&self, name: &str, items: &[Value]) -> CliResult<PathBuf> {
        let path = self.dir.join(name);
        std::fs::write(&path, serde_json::to_string(items)?)?;
        debug!(path = %path.display(), count = items.len(), "wrote report");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result() -> BulkResult {
        BulkResult {
            success: vec![json!("00u1")],
            failure: vec![json!("00u2")],
            errors: vec![json!({"errorCode": "E0000007"})],
        }
    }

    #[test]
    fn success_and_failure_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = ReportWriter::new(dir.path(), false)
            .write("user", "deactivate", &result())
            .unwrap();
        assert_eq!(files.len(), 2);

        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("atko_user_deactivate_success_"), "{name}");
        assert_eq!(std::fs::read_to_string(&files[0]).unwrap(), r#"["00u1"]"#);
        let failed = files[1].file_name().unwrap().to_string_lossy().into_owned();
        assert!(failed.starts_with("atko_user_deactivate_failed_"), "{failed}");
    }

    #[test]
    fn errors_only_in_debug() {
        let dir = tempfile::tempdir().unwrap();
        let files = ReportWriter::new(dir.path(), true)
            .write("group", "delete", &result())
            .unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[2].to_string_lossy().ends_with(".log"));
    }

    #[test]
    fn nothing_to_report() {
        let dir = tempfile::tempdir().unwrap();
        let files = ReportWriter::new(dir.path(), true)
            .write("user", "create", &BulkResult::default())
            .unwrap();
        assert!(files.is_empty());
    }
}
