//! Common test utilities for integration tests
//!
//! A wiremock-backed Okta org serving the users and groups endpoints.

#![allow(dead_code)]

use atko_client::{Credentials, OktaClient};
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::{MockServer, Request};

pub const API_TOKEN: &str = "00a-test-api-token";

/// Mock org plus a client authenticated with [`API_TOKEN`]
pub struct MockOrg {
    pub server: MockServer,
    pub client: OktaClient,
}

impl MockOrg {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let client = OktaClient::new(
            &server.uri(),
            Credentials::ApiToken(SecretString::new(API_TOKEN.to_string())),
        )
        .expect("client");
        Self { server, client }
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

pub fn user(id: &str, login: &str, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "profile": {
            "login": login,
            "email": login,
            "firstName": login.split('@').next().unwrap_or_default(),
            "lastName": "Tester"
        },
        "_links": {"self": {"href": format!("https://acme.okta.com/api/v1/users/{id}")}}
    })
}

pub fn group(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "type": "OKTA_GROUP",
        "created": "2024-01-01T00:00:00.000Z",
        "profile": {"name": name, "description": format!("{name} team")},
        "_links": {}
    })
}

/// `Link` header value pointing at `path_and_query` on `base`
pub fn next_link(base: &str, path_and_query: &str) -> String {
    format!("<{base}{path_and_query}>; rel=\"next\"")
}

pub fn header_of(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn service_error(code: &str, summary: &str) -> Value {
    json!({
        "errorCode": code,
        "errorSummary": summary,
        "errorLink": code,
        "errorId": "oae1",
        "errorCauses": []
    })
}
