//! Authenticated REST access to an Okta org
//!
//! [`OktaClient`] joins relative API paths to the org's base URL, attaches the
//! `Authorization` header for the configured [`Credentials`] and delegates the call to the
//! shared [`HttpTransport`]. With OAuth credentials each call first asks the
//! [`TokenLifecycleManager`] for a token valid for the resource being managed.

use std::fmt;
use std::sync::Arc;

use atko_auth::{HttpTransport, Page, ResourceKind, TokenLifecycleManager};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::groups::GroupManager;
use crate::users::UserManager;

/// How requests authenticate
pub enum Credentials {
    /// Okta API token, sent as `SSWS <token>`
    ApiToken(SecretString),
    /// Access tokens from the lifecycle manager, sent as `Bearer <token>`
    OAuth(Arc<TokenLifecycleManager>),
}

impl Credentials {
    /// Authorization scheme name
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::ApiToken(_) => "SSWS",
            Self::OAuth(_) => "Bearer",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiToken(_) => f.write_str("ApiToken([REDACTED])"),
            Self::OAuth(manager) => f.debug_tuple("OAuth").field(manager).finish(),
        }
    }
}

/// REST client for one Okta org
#[derive(Debug)]
pub struct OktaClient {
    base_url: String,
    credentials: Credentials,
    transport: HttpTransport,
    verbose: bool,
}

impl OktaClient {
    /// Client for the org at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be initialised.
    pub fn new(base_url: &str, credentials: Credentials) -> ClientResult<Self> {
        Ok(Self::with_transport(base_url, credentials, HttpTransport::new()?))
    }

    /// Client sharing an existing transport
    pub fn with_transport(base_url: &str, credentials: Credentials, transport: HttpTransport) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            transport,
            verbose: false,
        }
    }

    /// Print every request as an equivalent `curl` command on stderr
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// User operations
    pub fn users(&self) -> UserManager<'_> {
        UserManager::new(self)
    }

    /// Group operations
    pub fn groups(&self) -> GroupManager<'_> {
        GroupManager::new(self)
    }

    /// GET `path`, returning the body and the next page link
    ///
    /// # Errors
    ///
    /// Authentication failures, transport errors and service errors.
    pub async fn get(&self, resource: ResourceKind, path: &str) -> ClientResult<Page> {
        let url = self.url(path);
        let headers = self.headers(resource).await?;
        self.trace("GET", &url, None);
        Ok(self.transport.get(&url, headers).await?)
    }

    /// POST an optional JSON body to `path`
    ///
    /// # Errors
    ///
    /// Same as [`OktaClient::get`].
    pub async fn post(
        &self,
        resource: ResourceKind,
        path: &str,
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let url = self.url(path);
        let headers = self.headers(resource).await?;
        self.trace("POST", &url, body);
        Ok(self.transport.post_json(&url, headers, body).await?)
    }

    /// PUT an optional JSON body to `path`, returning the status code
    ///
    /// # Errors
    ///
    /// Same as [`OktaClient::get`].
    pub async fn put(
        &self,
        resource: ResourceKind,
        path: &str,
        body: Option<&Value>,
    ) -> ClientResult<u16> {
        let url = self.url(path);
        let headers = self.headers(resource).await?;
        self.trace("PUT", &url, body);
        Ok(self.transport.put_json(&url, headers, body).await?)
    }

    /// DELETE `path`, returning the status code
    ///
    /// # Errors
    ///
    /// Same as [`OktaClient::get`].
    pub async fn delete(&self, resource: ResourceKind, path: &str) -> ClientResult<u16> {
        let url = self.url(path);
        let headers = self.headers(resource).await?;
        self.trace("DELETE", &url, None);
        Ok(self.transport.delete(&url, headers).await?)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    async fn headers(&self, resource: ResourceKind) -> ClientResult<HeaderMap> {
        let credential = match &self.credentials {
            Credentials::ApiToken(token) => format!("SSWS {}", token.expose_secret()),
            Credentials::OAuth(manager) => {
                format!("Bearer {}", manager.ensure_authenticated(resource).await?)
            }
        };
        let mut authorization = HeaderValue::from_str(&credential).map_err(|_| {
            ClientError::InvalidInput("the credential contains characters not allowed in a header".into())
        })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, authorization);
        debug!(%resource, scheme = self.credentials.scheme(), "authorized request");
        Ok(headers)
    }

    fn trace(&self, method: &str, url: &str, body: Option<&Value>) {
        if self.verbose {
            eprintln!("{}", curl_command(method, url, self.credentials.scheme(), body));
        }
    }
}

/// `curl` equivalent of a request, with the credential masked
pub fn curl_command(method: &str, url: &str, scheme: &str, body: Option<&Value>) -> String {
    let mut parts = vec!["curl".to_string()];
    if method != "GET" {
        parts.push(format!("-X {method}"));
    }
    parts.push("-H 'Accept: application/json'".to_string());
    parts.push("-H 'Content-Type: application/json'".to_string());
    parts.push(format!("-H 'Authorization: {scheme} ***'"));
    if let Some(body) = body {
        parts.push(format!("-d '{}'", body.to_string().replace('\'', r"'\''")));
    }
    parts.push(format!("'{url}'"));
    parts.join(" ")
}
