//! Listing collections across pages

use atko_auth::ResourceKind;
use serde_json::Value;
use tracing::debug;

use crate::client::OktaClient;
use crate::error::{ClientError, ClientResult};

/// Default page size
pub const DEFAULT_LIMIT: usize = 200;

/// Which records to list and how many
///
/// `q` takes precedence and is answered with a single request. Otherwise `filter`, then
/// `search`, then a plain listing is paged through `next` links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub q: Option<String>,
    pub filter: Option<String>,
    pub search: Option<String>,
    /// Page size
    pub limit: usize,
    /// Maximum number of records to collect; 0 collects everything
    pub threshold: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            q: None,
            filter: None,
            search: None,
            limit: DEFAULT_LIMIT,
            threshold: 0,
        }
    }
}

impl ListQuery {
    pub fn q(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }

    pub fn filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Self::default()
        }
    }

    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Path and query of the first request against `base_path`
    pub fn first_page(&self, base_path: &str) -> String {
        if let Some(q) = non_blank(self.q.as_deref()) {
            return if self.threshold > 0 {
                format!("{base_path}?limit={}&q={}", self.threshold, urlencoding::encode(q))
            } else {
                format!("{base_path}?q={}", urlencoding::encode(q))
            };
        }

        let limit = self.limit.max(1);
        if let Some(filter) = non_blank(self.filter.as_deref()) {
            format!("{base_path}?limit={limit}&filter={}", urlencoding::encode(filter))
        } else if let Some(search) = non_blank(self.search.as_deref()) {
            format!("{base_path}?limit={limit}&search={}", urlencoding::encode(search))
        } else {
            format!("{base_path}?limit={limit}")
        }
    }

    fn is_single_request(&self) -> bool {
        non_blank(self.q.as_deref()).is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Collect the records matching `query` under `base_path`
///
/// # Errors
///
/// Request failures, or [`ClientError::UnexpectedResponse`] when a page is not an array.
pub async fn collect(
    client: &OktaClient,
    resource: ResourceKind,
    base_path: &str,
    query: &ListQuery,
) -> ClientResult<Vec<Value>> {
    let mut page = client.get(resource, &query.first_page(base_path)).await?;
    let mut records = into_records(page.body)?;

    if query.is_single_request() {
        return Ok(records);
    }

    let reached = |records: &[Value]| query.threshold > 0 && records.len() >= query.threshold;
    while !reached(&records) {
        let Some(next) = page.next.take() else { break };
        debug!(next = %next, collected = records.len(), "following next page");
        page = client.get(resource, &next).await?;
        records.extend(into_records(page.body)?);
    }

    if query.threshold > 0 {
        records.truncate(query.threshold);
    }
    Ok(records)
}

fn into_records(body: Value) -> ClientResult<Vec<Value>> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Null => Ok(Vec::new()),
        other => Err(ClientError::UnexpectedResponse(format!(
            "expected a list of records, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
