//! Common test utilities for integration tests
//!
//! A wiremock-backed identity provider serving the discovery document, token endpoint and
//! introspection endpoint, plus helpers for inspecting the requests it received.

#![allow(dead_code)]

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN_PATH: &str = "/oauth2/v1/token";
pub const INTROSPECT_PATH: &str = "/oauth2/v1/introspect";
pub const AUTHORIZE_PATH: &str = "/oauth2/v1/authorize";

pub const RSA_KEY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/rsa_private.pem");
pub const EC_KEY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/ec_private.pem");

/// Mock Okta org authorization server
pub struct MockIdentityProvider {
    pub server: MockServer,
    pub base_url: String,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub introspection_endpoint: String,
}

impl MockIdentityProvider {
    /// Start the server and mount the discovery document
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": base_url,
                "authorization_endpoint": format!("{base_url}{AUTHORIZE_PATH}"),
                "token_endpoint": format!("{base_url}{TOKEN_PATH}"),
                "userinfo_endpoint": format!("{base_url}/oauth2/v1/userinfo"),
                "introspection_endpoint": format!("{base_url}{INTROSPECT_PATH}"),
            })))
            .mount(&server)
            .await;

        Self {
            authorize_endpoint: format!("{base_url}{AUTHORIZE_PATH}"),
            token_endpoint: format!("{base_url}{TOKEN_PATH}"),
            introspection_endpoint: format!("{base_url}{INTROSPECT_PATH}"),
            base_url,
            server,
        }
    }

    /// Token endpoint issuing `access_token` for any grant
    pub async fn mock_token_success(&self, access_token: &str, refresh_token: Option<&str>) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access_token, refresh_token)))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint issuing `access_token` only for `grant_type`
    pub async fn mock_token_for_grant(
        &self,
        grant_type: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains(format!("grant_type={grant_type}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access_token, refresh_token)))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint rejecting `grant_type` with an OAuth error
    pub async fn mock_token_error_for_grant(&self, grant_type: &str, error: &str, description: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains(format!("grant_type={grant_type}")))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": error,
                "error_description": description,
            })))
            .mount(&self.server)
            .await;
    }

    /// Introspection endpoint reporting `active` for `token`
    pub async fn mock_introspection(&self, token: &str, active: bool) {
        Mock::given(method("POST"))
            .and(path(INTROSPECT_PATH))
            .and(body_string_contains(format!("token={token}&")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "active": active })))
            .mount(&self.server)
            .await;
    }

    /// Requests received on `endpoint_path`, oldest first
    pub async fn requests_to(&self, endpoint_path: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == endpoint_path)
            .collect()
    }
}

fn token_body(access_token: &str, refresh_token: Option<&str>) -> Value {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "okta.users.read",
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = json!(refresh);
    }
    body
}

/// Decoded form body of a request
pub fn form_of(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

/// Query parameters of a URL
pub fn query_of(url: &str) -> HashMap<String, String> {
    url::Url::parse(url)
        .expect("valid url")
        .query_pairs()
        .into_owned()
        .collect()
}

/// `Authorization` header value, if any
pub fn authorization_of(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Expected HTTP Basic header for a client
pub fn basic(client_id: &str, client_secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{client_id}:{client_secret}")))
}

/// Claims of a compact JWT, without verifying the signature
pub fn jwt_claims(token: &str) -> Value {
    let payload = token.split('.').nth(1).expect("jwt payload");
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).expect("base64url payload"))
        .expect("json claims")
}

/// Header of a compact JWT
pub fn jwt_header(token: &str) -> Value {
    let header = token.split('.').next().expect("jwt header");
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).expect("base64url header"))
        .expect("json header")
}

/// Profile settings from literal pairs
pub fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
