//! Group operations (`/api/v1/groups`)

use atko_auth::ResourceKind;
use serde_json::Value;
use tracing::{debug, info};

use crate::bulk::BulkResult;
use crate::client::OktaClient;
use crate::error::{ClientError, ClientResult};
use crate::models::Group;
use crate::pagination::{ListQuery, collect};
use crate::search::DeepSearch;

const GROUPS_PATH: &str = "/api/v1/groups";
const RESOURCE: ResourceKind = ResourceKind::Groups;

/// Group manager bound to a client
#[derive(Debug, Clone, Copy)]
pub struct GroupManager<'a> {
    client: &'a OktaClient,
}

impl<'a> GroupManager<'a> {
    pub fn new(client: &'a OktaClient) -> Self {
        Self { client }
    }

    /// Group by id
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn get(&self, id: &str) -> ClientResult<Group> {
        let page = self.client.get(RESOURCE, &group_path(id)).await?;
        Ok(Group::new(page.body))
    }

    /// Groups matching `query`, narrowed by `deep_search`
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn list(&self, query: &ListQuery, deep_search: &DeepSearch) -> ClientResult<Vec<Group>> {
        let groups: Vec<Group> = collect(self.client, RESOURCE, GROUPS_PATH, query)
            .await?
            .into_iter()
            .map(Group::new)
            .collect();
        debug!(count = groups.len(), "listed groups");
        Ok(deep_search.apply(groups))
    }

    /// Create one group, returning the created document
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn create(&self, payload: &Value) -> ClientResult<Value> {
        self.client.post(RESOURCE, GROUPS_PATH, Some(payload)).await
    }

    /// Create every payload; successes are recorded by group name
    pub async fn create_many(&self, payloads: Vec<Value>) -> BulkResult {
        let mut result = BulkResult::default();
        for payload in payloads {
            match self.create(&payload).await.and_then(created_name) {
                Ok(name) => result.record_success(name),
                Err(e) => result.record_failure(payload, &e),
            }
        }
        info!(
            created = result.success.len(),
            failed = result.failure.len(),
            "bulk group creation finished"
        );
        result
    }

    /// Delete a group
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn delete(&self, id: &str) -> ClientResult<u16> {
        self.client.delete(RESOURCE, &group_path(id)).await
    }

    /// Delete every id
    pub async fn delete_many(&self, ids: &[String]) -> BulkResult {
        let mut result = BulkResult::default();
        for id in ids {
            match self.delete(id).await {
                Ok(_) => result.record_success(id.as_str()),
                Err(e) => result.record_failure(id.as_str(), &e),
            }
        }
        result
    }
}

fn group_path(id: &str) -> String {
    format!("{GROUPS_PATH}/{}", urlencoding::encode(id))
}

fn created_name(created: Value) -> ClientResult<Value> {
    created
        .pointer("/profile/name")
        .cloned()
        .ok_or_else(|| ClientError::UnexpectedResponse("created group has no profile.name".into()))
}
