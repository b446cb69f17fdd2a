//! Token lifecycle manager scenarios
//!
//! Interactive scenarios bind the fixed callback port and therefore run serially.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use atko_auth::{
    AuthError, AuthResult, CacheKey, OAuthClient, OAuthConfig, ResourceKind, TokenCache,
    TokenLifecycleManager,
};
use common::*;
use serial_test::serial;
use tempfile::TempDir;

const REDIRECT_URI: &str = "http://localhost:12345/authorization-code/callback";

struct Harness {
    idp: MockIdentityProvider,
    dir: TempDir,
}

impl Harness {
    async fn start() -> Self {
        Self {
            idp: MockIdentityProvider::start().await,
            dir: TempDir::new().unwrap(),
        }
    }

    fn cache(&self) -> TokenCache {
        TokenCache::load(self.dir.path().join("cache.json")).unwrap()
    }

    fn seed(&self, resource: ResourceKind, access: &str, refresh: &str) {
        self.cache()
            .put_entry("default", resource.name(), access, refresh)
            .unwrap();
    }

    fn manager(&self, pairs: &[(&str, &str)]) -> TokenLifecycleManager {
        let config = OAuthConfig::from_settings(&settings(pairs)).unwrap();
        let client = OAuthClient::new(&self.idp.base_url, config).unwrap();
        TokenLifecycleManager::new("default", client, self.cache())
            .with_browser(|_: &str| -> AuthResult<()> { panic!("browser must not open") })
    }
}

const AUTH_CODE: &[(&str, &str)] = &[
    ("oauth_flow", "authorization_code"),
    ("client_id", "0oacode"),
    ("client_secret", "code-secret"),
    ("redirect_uri", REDIRECT_URI),
];

const PKCE: &[(&str, &str)] = &[
    ("oauth_flow", "pkce"),
    ("client_id", "0oapkce"),
    ("redirect_uri", REDIRECT_URI),
];

const IMPLICIT: &[(&str, &str)] = &[
    ("oauth_flow", "implicit"),
    ("client_id", "0oaimplicit"),
    ("redirect_uri", REDIRECT_URI),
];

const PASSWORD: &[(&str, &str)] = &[
    ("oauth_flow", "password"),
    ("client_id", "0oapass"),
    ("client_secret", "pass-secret"),
    ("userid", "jane@example.com"),
    ("password", "hunter2"),
];

/// Browser stand-in that completes the redirect with `query` on the callback port
fn redirect_with(query: &'static str, opened: Arc<AtomicUsize>) -> impl Fn(&str) -> AuthResult<()> {
    move |url: &str| {
        assert!(url.contains("state=atkostate"));
        opened.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let _ = reqwest::get(format!(
                "http://127.0.0.1:12345/authorization-code/callback?{query}"
            ))
            .await;
        });
        Ok(())
    }
}

/// Browser stand-in that posts `access_token` to the callback port, as `form_post` does
fn post_token_with(access_token: &'static str, opened: Arc<AtomicUsize>) -> impl Fn(&str) -> AuthResult<()> {
    move |url: &str| {
        assert!(url.contains("response_type=token"));
        opened.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let _ = reqwest::Client::new()
                .post("http://127.0.0.1:12345/implicit/callback")
                .form(&[("access_token", access_token), ("state", "atkostate")])
                .send()
                .await;
        });
        Ok(())
    }
}

#[tokio::test]
async fn client_credentials_acquires_with_service_scopes() {
    let h = Harness::start().await;
    h.idp.mock_token_for_grant("client_credentials", "at-service", None).await;
    let pem = std::fs::read_to_string(RSA_KEY_PATH).unwrap();
    let manager = h.manager(&[
        ("oauth_flow", "client_credentials"),
        ("client_id", "0oaservice"),
        ("private_key", pem.as_str()),
    ]);

    let token = manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    assert_eq!(token, "at-service");

    let form = form_of(&h.idp.requests_to(TOKEN_PATH).await[0]);
    assert_eq!(form["scope"], "okta.users.manage okta.users.read");

    let stored = h.cache().get_entry("default", "UserMgr").unwrap();
    assert_eq!(stored.access_token, "at-service");
    assert!(stored.refresh_token.is_empty());
}

#[tokio::test]
async fn active_cached_token_is_reused() {
    let h = Harness::start().await;
    h.seed(ResourceKind::Groups, "at-live", "rt-live");
    h.idp.mock_introspection("at-live", true).await;
    let manager = h.manager(AUTH_CODE);

    let token = manager.ensure_authenticated(ResourceKind::Groups).await.unwrap();
    assert_eq!(token, "at-live");
    assert_eq!(h.idp.requests_to(INTROSPECT_PATH).await.len(), 1);
    assert!(h.idp.requests_to(TOKEN_PATH).await.is_empty());
}

#[tokio::test]
async fn inactive_token_is_refreshed_without_browser() {
    let h = Harness::start().await;
    h.seed(ResourceKind::Users, "at-old", "rt-old");
    h.idp.mock_introspection("at-old", false).await;
    h.idp.mock_token_for_grant("refresh_token", "at-new", Some("rt-new")).await;
    let manager = h.manager(AUTH_CODE);

    let token = manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    assert_eq!(token, "at-new");

    let form = form_of(&h.idp.requests_to(TOKEN_PATH).await[0]);
    assert_eq!(form["refresh_token"], "rt-old");

    let stored = h.cache().get_entry("default", "UserMgr").unwrap();
    assert_eq!(stored.access_token, "at-new");
    assert_eq!(stored.refresh_token, "rt-new");
}

#[tokio::test]
async fn fresh_token_is_trusted_once() {
    let h = Harness::start().await;
    h.idp.mock_token_for_grant("password", "at-fresh", Some("rt-fresh")).await;
    h.idp.mock_introspection("at-fresh", true).await;
    let manager = h.manager(PASSWORD);

    manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    // Trusted without introspection right after issuance
    manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    assert!(h.idp.requests_to(INTROSPECT_PATH).await.is_empty());

    // The mark is consumed by the previous evaluation
    manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    assert_eq!(h.idp.requests_to(INTROSPECT_PATH).await.len(), 1);
    assert_eq!(h.idp.requests_to(TOKEN_PATH).await.len(), 1);
}

#[tokio::test]
async fn failed_refresh_falls_back_to_acquisition() {
    let h = Harness::start().await;
    h.seed(ResourceKind::Users, "at-old", "rt-revoked");
    h.idp.mock_introspection("at-old", false).await;
    h.idp
        .mock_token_error_for_grant("refresh_token", "invalid_grant", "The refresh token is invalid or expired.")
        .await;
    h.idp.mock_token_for_grant("password", "at-new", Some("rt-new")).await;
    let manager = h.manager(PASSWORD);

    let token = manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    assert_eq!(token, "at-new");

    let grants: Vec<String> = h
        .idp
        .requests_to(TOKEN_PATH)
        .await
        .iter()
        .map(|r| form_of(r)["grant_type"].clone())
        .collect();
    assert_eq!(grants, ["refresh_token", "password"]);
}

#[tokio::test]
async fn explicit_refresh_reports_failures() {
    let h = Harness::start().await;
    h.seed(ResourceKind::Users, "at-old", "rt-revoked");
    h.idp
        .mock_token_error_for_grant("refresh_token", "invalid_grant", "The refresh token is invalid or expired.")
        .await;
    let manager = h.manager(PASSWORD);

    let err = manager.refresh(ResourceKind::Users).await.unwrap_err();
    assert_eq!(err.code(), Some("invalid_grant"));

    let err = manager.refresh(ResourceKind::Groups).await.unwrap_err();
    assert_eq!(err.code(), Some("not_authenticated"));
}

#[tokio::test]
async fn manual_flow_without_token_asks_for_seed() {
    let h = Harness::start().await;
    let manager = h.manager(&[("oauth_flow", "manual")]);

    let err = manager.ensure_authenticated(ResourceKind::Users).await.unwrap_err();
    assert_eq!(err.code(), Some("not_authenticated"));
    assert!(err.to_string().contains("atko auth seed"));
    assert!(h.idp.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn manual_flow_uses_seeded_token_as_is() {
    let h = Harness::start().await;
    let manager = h.manager(&[("oauth_flow", "manual")]);

    manager
        .seed_token(ResourceKind::Users, "at-seeded", "", false)
        .await
        .unwrap();
    let token = manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    assert_eq!(token, "at-seeded");
    assert!(h.idp.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn cleared_access_token_counts_as_missing() {
    let h = Harness::start().await;
    h.seed(ResourceKind::Users, "at-seeded", "");
    let key: CacheKey = "default:UserMgr:access_token".parse().unwrap();
    assert!(h.cache().remove(&key).unwrap());
    let manager = h.manager(&[("oauth_flow", "manual")]);

    let err = manager.ensure_authenticated(ResourceKind::Users).await.unwrap_err();
    assert_eq!(err.code(), Some("not_authenticated"));
    assert!(h.idp.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn cleared_access_token_is_not_introspected() {
    let h = Harness::start().await;
    h.seed(ResourceKind::Users, "", "");
    h.idp.mock_token_for_grant("password", "at-new", Some("rt-new")).await;
    let manager = h.manager(PASSWORD);

    let token = manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    assert_eq!(token, "at-new");
    assert!(h.idp.requests_to(INTROSPECT_PATH).await.is_empty());
}

#[tokio::test]
async fn verified_seed_rejects_inactive_token() {
    let h = Harness::start().await;
    h.idp.mock_introspection("at-stale", false).await;
    let manager = h.manager(AUTH_CODE);

    let err = manager
        .seed_token(ResourceKind::Users, "at-stale", "", true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("invalid_token"));
    assert!(manager.cached_entry(ResourceKind::Users).await.is_none());
}

#[test]
fn unknown_resource_is_rejected() {
    let err = "WidgetMgr".parse::<ResourceKind>().unwrap_err();
    assert!(matches!(err, AuthError::Configuration(_)));
    assert!(err.to_string().contains("UserMgr"));
}

#[tokio::test]
#[serial]
async fn pkce_reauthorizes_in_browser_instead_of_refreshing() {
    let h = Harness::start().await;
    h.seed(ResourceKind::Users, "at-old", "rt-old");
    h.idp.mock_introspection("at-old", false).await;
    h.idp.mock_token_for_grant("authorization_code", "at-pkce", None).await;

    let opened = Arc::new(AtomicUsize::new(0));
    let manager = h
        .manager(PKCE)
        .with_browser(redirect_with("code=code-abc&state=atkostate", opened.clone()));

    let token = manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    assert_eq!(token, "at-pkce");
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    let requests = h.idp.requests_to(TOKEN_PATH).await;
    assert_eq!(requests.len(), 1);
    let form = form_of(&requests[0]);
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code"], "code-abc");
    assert!(form.contains_key("code_verifier"));
}

#[tokio::test]
#[serial]
async fn denied_authorization_is_a_token_error() {
    let h = Harness::start().await;
    let opened = Arc::new(AtomicUsize::new(0));
    let manager = h.manager(PKCE).with_browser(redirect_with(
        "error=access_denied&error_description=user%20cancelled&state=atkostate",
        opened.clone(),
    ));

    let err = manager.ensure_authenticated(ResourceKind::Users).await.unwrap_err();
    match &err {
        AuthError::Token {
            code,
            message,
            authorize_url,
        } => {
            assert_eq!(code, "access_denied");
            assert!(message.contains("user cancelled"));
            assert!(authorize_url.as_deref().is_some_and(|url| url.contains("code_challenge")));
        }
        other => panic!("expected token error, got {other:?}"),
    }
    assert!(h.idp.requests_to(TOKEN_PATH).await.is_empty());
    assert!(manager.cached_entry(ResourceKind::Users).await.is_none());
}

#[tokio::test]
#[serial]
async fn implicit_token_is_validated_and_stored_without_refresh_token() {
    let h = Harness::start().await;
    h.idp.mock_introspection("at-implicit", true).await;
    let opened = Arc::new(AtomicUsize::new(0));
    let manager = h
        .manager(IMPLICIT)
        .with_browser(post_token_with("at-implicit", opened.clone()));

    let token = manager.ensure_authenticated(ResourceKind::Users).await.unwrap();
    assert_eq!(token, "at-implicit");
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    let introspections = h.idp.requests_to(INTROSPECT_PATH).await;
    assert_eq!(introspections.len(), 1);
    assert_eq!(form_of(&introspections[0])["client_id"], "0oaimplicit");
    assert!(h.idp.requests_to(TOKEN_PATH).await.is_empty());

    let stored = h.cache().get_entry("default", "UserMgr").unwrap();
    assert_eq!(stored.access_token, "at-implicit");
    assert!(stored.refresh_token.is_empty());
}

#[tokio::test]
#[serial]
async fn inactive_implicit_token_is_rejected() {
    let h = Harness::start().await;
    h.idp.mock_introspection("at-revoked", false).await;
    let opened = Arc::new(AtomicUsize::new(0));
    let manager = h
        .manager(IMPLICIT)
        .with_browser(post_token_with("at-revoked", opened.clone()));

    let err = manager.ensure_authenticated(ResourceKind::Users).await.unwrap_err();
    assert_eq!(err.code(), Some("invalid_token"));
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert!(manager.cached_entry(ResourceKind::Users).await.is_none());
}

#[tokio::test]
#[serial]
async fn authorization_code_exchange_uses_basic_auth_and_keeps_refresh_token() {
    let h = Harness::start().await;
    h.idp
        .mock_token_for_grant("authorization_code", "at-code", Some("rt-code"))
        .await;
    let opened = Arc::new(AtomicUsize::new(0));
    let manager = h
        .manager(AUTH_CODE)
        .with_browser(redirect_with("code=code-xyz&state=atkostate", opened.clone()));

    let token = manager.ensure_authenticated(ResourceKind::Groups).await.unwrap();
    assert_eq!(token, "at-code");
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    let requests = h.idp.requests_to(TOKEN_PATH).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        authorization_of(&requests[0]).as_deref(),
        Some(basic("0oacode", "code-secret").as_str())
    );
    let form = form_of(&requests[0]);
    assert_eq!(form["code"], "code-xyz");
    assert_eq!(form["redirect_uri"], REDIRECT_URI);
    assert!(!form.contains_key("code_verifier"));

    let stored = h.cache().get_entry("default", "GroupMgr").unwrap();
    assert_eq!(stored.refresh_token, "rt-code");
}
