//! OAuth flow strategy
//!
//! [`OAuthClient`] encodes how each grant flow talks to the provider: which parameters go in
//! the authorization URL, how token requests are shaped, and how the client authenticates
//! itself (HTTP Basic, public client id, or a signed client assertion). Every operation is
//! total over the flows that support it and rejects the rest with
//! [`AuthError::UnsupportedFlow`] before touching the network.

use parking_lot::Mutex;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::assertion::{CLIENT_ASSERTION_TYPE, sign_client_assertion};
use super::pkce::PkceChallenge;
use super::types::{TokenPair, TokenResponse, TokenTypeHint};
use crate::config::{FlowParameters, OAuthConfig, OAuthFlow};
use crate::discovery::{DiscoveryFetcher, DiscoveryInfo};
use crate::error::{AuthError, AuthResult, TransportErrorKind};
use crate::http_client::HttpTransport;
use crate::introspection::IntrospectionResponse;

/// Anti-forgery `state` sent with every authorization request
pub const AUTHORIZATION_STATE: &str = "atkostate";

const OFFLINE_ACCESS: &str = "offline_access";

const CREDENTIAL_FLOWS: &[OAuthFlow] = &[OAuthFlow::Password, OAuthFlow::ClientCredentials];
const CODE_FLOWS: &[OAuthFlow] = &[OAuthFlow::AuthorizationCode, OAuthFlow::Pkce];

/// OAuth client bound to one profile's configuration
#[derive(Debug)]
pub struct OAuthClient {
    config: OAuthConfig,
    discovery: DiscoveryFetcher,
    transport: HttpTransport,
    /// Challenge of the authorization attempt in flight; a new attempt overwrites it
    pkce: Mutex<Option<PkceChallenge>>,
}

impl OAuthClient {
    /// Create a client for the org at `base_url`
    ///
    /// # Errors
    ///
    /// Returns a transport error when the HTTP client cannot be built.
    pub fn new(base_url: &str, config: OAuthConfig) -> AuthResult<Self> {
        Ok(Self::with_transport(base_url, config, HttpTransport::new()?))
    }

    /// Create a client sharing an existing transport
    pub fn with_transport(base_url: &str, config: OAuthConfig, transport: HttpTransport) -> Self {
        let discovery = DiscoveryFetcher::new(base_url, config.auth_server_id(), transport.clone());
        Self {
            config,
            discovery,
            transport,
            pkce: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn flow(&self) -> OAuthFlow {
        self.config.flow()
    }

    /// Provider endpoints, fetched once per client
    ///
    /// # Errors
    ///
    /// Propagates discovery failures.
    pub async fn discovery_info(&self) -> AuthResult<&DiscoveryInfo> {
        self.discovery.get_discovery_info().await
    }

    /// Build the URL the user visits to authorize this client
    ///
    /// Supported for `implicit`, `pkce` and `authorization_code`. The `pkce` flow generates a
    /// fresh challenge and remembers its verifier for [`OAuthClient::exchange_code_for_token`];
    /// `authorization_code` also asks for `offline_access` so a refresh token is issued.
    ///
    /// # Errors
    ///
    /// [`AuthError::UnsupportedFlow`] for passive flows, discovery failures otherwise.
    pub async fn build_authorization_url(&self, scopes: &[&str]) -> AuthResult<String> {
        let mut params: Vec<(&str, String)> = match self.config.parameters() {
            FlowParameters::Implicit {
                client_id,
                redirect_uri,
            } => vec![
                ("response_type", "token".to_string()),
                ("scope", join_scopes(scopes)),
                ("client_id", client_id.clone()),
                ("redirect_uri", redirect_uri.clone()),
                ("response_mode", "form_post".to_string()),
            ],
            FlowParameters::Pkce {
                client_id,
                redirect_uri,
            } => {
                let pkce = PkceChallenge::generate();
                let params = vec![
                    ("response_type", "code".to_string()),
                    ("scope", join_scopes(scopes)),
                    ("client_id", client_id.clone()),
                    ("redirect_uri", redirect_uri.clone()),
                    ("code_challenge_method", pkce.method().to_string()),
                    ("code_challenge", pkce.code_challenge().to_string()),
                ];
                *self.pkce.lock() = Some(pkce);
                params
            }
            FlowParameters::AuthorizationCode {
                client_id,
                redirect_uri,
                ..
            } => vec![
                ("response_type", "code".to_string()),
                ("scope", join_scopes(&with_offline_access(scopes))),
                ("client_id", client_id.clone()),
                ("redirect_uri", redirect_uri.clone()),
            ],
            _ => {
                return Err(self.unsupported("build_authorization_url", OAuthFlow::INTERACTIVE));
            }
        };
        params.push(("state", AUTHORIZATION_STATE.to_string()));
        params.push(("nonce", Uuid::new_v4().simple().to_string()));

        let info = self.discovery_info().await?;
        Ok(format!(
            "{}?{}",
            info.authorization_endpoint,
            encode_query(&params)
        ))
    }

    /// Obtain a token directly from credentials, without user interaction
    ///
    /// `password` authenticates the client with HTTP Basic and adds `offline_access`;
    /// `client_credentials` presents a client assertion signed with the configured key and
    /// bound to the token endpoint.
    ///
    /// # Errors
    ///
    /// [`AuthError::UnsupportedFlow`] for other flows; service errors when the provider
    /// rejects the request; a token error when no access token is issued.
    pub async fn acquire_token_by_credentials(&self, scopes: &[&str]) -> AuthResult<TokenPair> {
        match self.config.parameters() {
            FlowParameters::Password {
                client_id,
                client_secret,
                username,
                password,
                ..
            } => {
                let endpoint = self.token_endpoint().await?;
                let scope = join_scopes(&with_offline_access(scopes));
                let form = [
                    ("grant_type", "password"),
                    ("username", username.as_str()),
                    ("password", password.expose_secret().as_str()),
                    ("scope", scope.as_str()),
                ];
                self.token_request(
                    &endpoint,
                    Some((client_id.as_str(), client_secret.expose_secret().as_str())),
                    &form,
                )
                .await
            }
            FlowParameters::ClientCredentials {
                client_id,
                signing_key,
            } => {
                let endpoint = self.token_endpoint().await?;
                let assertion = sign_client_assertion(client_id, &endpoint, signing_key)?;
                let scope = join_scopes(scopes);
                let form = [
                    ("grant_type", "client_credentials"),
                    ("scope", scope.as_str()),
                    ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                    ("client_assertion", assertion.as_str()),
                ];
                self.token_request(&endpoint, None, &form).await
            }
            _ => Err(self.unsupported("acquire_token_by_credentials", CREDENTIAL_FLOWS)),
        }
    }

    /// Exchange an authorization code for tokens
    ///
    /// The `pkce` flow sends the verifier of the authorization attempt in flight instead of a
    /// client secret, and consumes it.
    ///
    /// # Errors
    ///
    /// [`AuthError::UnsupportedFlow`] for flows without a code; a token error when no PKCE
    /// attempt is in flight; provider errors otherwise.
    pub async fn exchange_code_for_token(&self, code: &str) -> AuthResult<TokenPair> {
        match self.config.parameters() {
            FlowParameters::Pkce {
                client_id,
                redirect_uri,
            } => {
                let pkce = self.pkce.lock().take().ok_or_else(|| {
                    AuthError::token(
                        "invalid_request",
                        "no PKCE authorization is in flight for this client",
                    )
                })?;
                let endpoint = self.token_endpoint().await?;
                let form = [
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("client_id", client_id.as_str()),
                    ("code_verifier", pkce.code_verifier()),
                ];
                self.token_request(&endpoint, None, &form).await
            }
            FlowParameters::AuthorizationCode {
                client_id,
                client_secret,
                redirect_uri,
            } => {
                let endpoint = self.token_endpoint().await?;
                let form = [
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri.as_str()),
                ];
                self.token_request(
                    &endpoint,
                    Some((client_id.as_str(), client_secret.expose_secret().as_str())),
                    &form,
                )
                .await
            }
            _ => Err(self.unsupported("exchange_code_for_token", CODE_FLOWS)),
        }
    }

    /// Renew tokens with a refresh token
    ///
    /// # Errors
    ///
    /// [`AuthError::UnsupportedFlow`] unless the flow is `authorization_code` or `password`;
    /// provider errors otherwise.
    pub async fn exchange_refresh_token_for_token(
        &self,
        refresh_token: &str,
        scopes: &[&str],
    ) -> AuthResult<TokenPair> {
        let flow = self.flow();
        let basic = match self.config.basic_credentials() {
            Some(basic) if flow.supports_refresh() => basic,
            _ => {
                return Err(self.unsupported(
                    "exchange_refresh_token_for_token",
                    OAuthFlow::REFRESHABLE,
                ));
            }
        };

        let endpoint = self.token_endpoint().await?;
        let scope = join_scopes(&with_offline_access(scopes));
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];
        if let Some(redirect_uri) = self.config.redirect_uri() {
            form.push(("redirect_uri", redirect_uri));
        }
        self.token_request(&endpoint, Some(basic), &form).await
    }

    /// Ask the provider whether a token is active
    ///
    /// Client authentication depends on the flow: public clients (`implicit`, `pkce`) send
    /// their client id, `client_credentials` signs an assertion for the introspection
    /// endpoint, and every other flow uses HTTP Basic.
    ///
    /// # Errors
    ///
    /// A configuration error when a `manual` profile has no client credentials; provider
    /// and transport errors otherwise.
    pub async fn introspect(
        &self,
        token: &str,
        hint: TokenTypeHint,
    ) -> AuthResult<IntrospectionResponse> {
        let endpoint = self.discovery_info().await?.introspection_endpoint.clone();
        let mut form = vec![("token", token), ("token_type_hint", hint.as_str())];

        let body = match self.config.parameters() {
            FlowParameters::Implicit { client_id, .. } | FlowParameters::Pkce { client_id, .. } => {
                form.push(("client_id", client_id.as_str()));
                self.transport.post_form(&endpoint, None, &form).await?
            }
            FlowParameters::ClientCredentials {
                client_id,
                signing_key,
            } => {
                let assertion = sign_client_assertion(client_id, &endpoint, signing_key)?;
                form.push(("client_assertion_type", CLIENT_ASSERTION_TYPE));
                form.push(("client_assertion", assertion.as_str()));
                self.transport.post_form(&endpoint, None, &form).await?
            }
            _ => {
                let basic = self.config.basic_credentials().ok_or_else(|| {
                    AuthError::Configuration(format!(
                        "introspection for the '{}' flow requires client_id and client_secret",
                        self.flow()
                    ))
                })?;
                self.transport.post_form(&endpoint, Some(basic), &form).await?
            }
        };

        parse_body(body)
    }

    async fn token_endpoint(&self) -> AuthResult<String> {
        Ok(self.discovery_info().await?.token_endpoint.clone())
    }

    async fn token_request(
        &self,
        endpoint: &str,
        basic: Option<(&str, &str)>,
        form: &[(&str, &str)],
    ) -> AuthResult<TokenPair> {
        let grant_type = form
            .iter()
            .find_map(|(k, v)| (*k == "grant_type").then_some(*v))
            .unwrap_or_default();
        debug!(flow = %self.flow(), grant_type, "requesting token");

        let body = self.transport.post_form(endpoint, basic, form).await?;
        parse_body::<TokenResponse>(body)?.into_pair()
    }

    fn unsupported(&self, operation: &'static str, allowed: &'static [OAuthFlow]) -> AuthError {
        AuthError::UnsupportedFlow {
            operation,
            flow: self.flow(),
            allowed,
        }
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> AuthResult<T> {
    serde_json::from_value(body).map_err(|e| AuthError::Transport {
        kind: TransportErrorKind::InvalidBody,
        message: e.to_string(),
    })
}

fn with_offline_access<'a>(scopes: &[&'a str]) -> Vec<&'a str> {
    let mut scopes = scopes.to_vec();
    if !scopes.contains(&OFFLINE_ACCESS) {
        scopes.push(OFFLINE_ACCESS);
    }
    scopes
}

fn join_scopes(scopes: &[&str]) -> String {
    scopes.join(" ")
}

fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
