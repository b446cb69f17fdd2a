//! User operations (`/api/v1/users`)

use atko_auth::ResourceKind;
use serde_json::Value;
use tracing::{debug, info};

use crate::bulk::BulkResult;
use crate::client::OktaClient;
use crate::error::{ClientError, ClientResult};
use crate::models::User;
use crate::pagination::{ListQuery, collect};
use crate::search::DeepSearch;

const USERS_PATH: &str = "/api/v1/users";
const RESOURCE: ResourceKind = ResourceKind::Users;

/// User manager bound to a client
#[derive(Debug, Clone, Copy)]
pub struct UserManager<'a> {
    client: &'a OktaClient,
}

impl<'a> UserManager<'a> {
    pub fn new(client: &'a OktaClient) -> Self {
        Self { client }
    }

    /// The user the credential belongs to
    ///
    /// For API tokens that is the token's owner; for OAuth the user the token was issued to.
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn current(&self, attr: Option<&str>) -> ClientResult<User> {
        let page = self.client.get(RESOURCE, &format!("{USERS_PATH}/me")).await?;
        Ok(User::with_attr(page.body, attr))
    }

    /// User by id or login
    ///
    /// # Errors
    ///
    /// Request failures; a service error with code `E0000007` when no such user exists.
    pub async fn get(&self, id_or_login: &str, attr: Option<&str>) -> ClientResult<User> {
        let page = self.client.get(RESOURCE, &user_path(id_or_login)).await?;
        Ok(User::with_attr(page.body, attr))
    }

    /// Users matching `query`, narrowed by `deep_search`
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn list(
        &self,
        query: &ListQuery,
        attr: Option<&str>,
        deep_search: &DeepSearch,
    ) -> ClientResult<Vec<User>> {
        let users: Vec<User> = collect(self.client, RESOURCE, USERS_PATH, query)
            .await?
            .into_iter()
            .map(|data| User::with_attr(data, attr))
            .collect();
        debug!(count = users.len(), "listed users");
        Ok(deep_search.apply(users))
    }

    /// Create one user, returning the created document
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn create(&self, payload: &Value, activate: bool) -> ClientResult<Value> {
        let path = format!("{USERS_PATH}?activate={activate}");
        self.client.post(RESOURCE, &path, Some(payload)).await
    }

    /// Create every payload; successes are recorded by login
    pub async fn create_many(&self, payloads: Vec<Value>, activate: bool) -> BulkResult {
        let mut result = BulkResult::default();
        for payload in payloads {
            match self.create(&payload, activate).await.and_then(created_login) {
                Ok(login) => result.record_success(login),
                Err(e) => result.record_failure(payload, &e),
            }
        }
        info!(
            created = result.success.len(),
            failed = result.failure.len(),
            "bulk user creation finished"
        );
        result
    }

    /// Activate a staged or provisioned user
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn activate(&self, id: &str, notify: bool) -> ClientResult<Value> {
        let path = format!("{}/lifecycle/activate?sendEmail={notify}", user_path(id));
        self.client.post(RESOURCE, &path, None).await
    }

    /// Deactivate a user
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn deactivate(&self, id: &str, notify: bool) -> ClientResult<Value> {
        let path = format!("{}/lifecycle/deactivate?sendEmail={notify}", user_path(id));
        self.client.post(RESOURCE, &path, None).await
    }

    /// Delete a user; a user that is not yet deactivated is deactivated instead
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn delete(&self, id: &str, notify: bool) -> ClientResult<u16> {
        let path = format!("{}?sendEmail={notify}", user_path(id));
        self.client.delete(RESOURCE, &path).await
    }

    /// Activate every id
    pub async fn activate_many(&self, ids: &[String], notify: bool) -> BulkResult {
        let mut result = BulkResult::default();
        for id in ids {
            match self.activate(id, notify).await {
                Ok(_) => result.record_success(id.as_str()),
                Err(e) => result.record_failure(id.as_str(), &e),
            }
        }
        result
    }

    /// Deactivate every id
    pub async fn deactivate_many(&self, ids: &[String], notify: bool) -> BulkResult {
        let mut result = BulkResult::default();
        for id in ids {
            match self.deactivate(id, notify).await {
                Ok(_) => result.record_success(id.as_str()),
                Err(e) => result.record_failure(id.as_str(), &e),
            }
        }
        result
    }

    /// Delete every id
    pub async fn delete_many(&self, ids: &[String], notify: bool) -> BulkResult {
        let mut result = BulkResult::default();
        for id in ids {
            match self.delete(id, notify).await {
                Ok(_) => result.record_success(id.as_str()),
                Err(e) => result.record_failure(id.as_str(), &e),
            }
        }
        result
    }
}

fn user_path(id_or_login: &str) -> String {
    format!("{USERS_PATH}/{}", urlencoding::encode(id_or_login))
}

fn created_login(created: Value) -> ClientResult<Value> {
    created
        .pointer("/profile/login")
        .cloned()
        .ok_or_else(|| ClientError::UnexpectedResponse("created user has no profile.login".into()))
}
