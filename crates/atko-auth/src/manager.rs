//! Token lifecycle manager
//!
//! Every authenticated call goes through [`TokenLifecycleManager::ensure_authenticated`],
//! which evaluates the cached token of a (profile, resource) pair and decides whether to
//! reuse it, refresh it, or acquire a new one:
//!
//! ```text
//!                 ┌──────────── cache lookup ────────────┐
//!                 │ absent                       present │
//!                 ▼                                      ▼
//!             NO_TOKEN                              introspect
//!                 │                      active ┌────────┴────────┐ inactive
//!                 │                             ▼                 ▼
//!                 │                       CACHED_VALID   refresh-capable flow?
//!                 │                                     yes │            │ no
//!                 │                  CACHED_EXPIRED_REFRESHABLE   CACHED_EXPIRED_TERMINAL
//!                 │                        ok │   │ failed                │
//!                 │                   (store) │   └──────────┐            │
//!                 └─────────────────────────────────────► FRESH ◄─────────┘
//! ```
//!
//! `FRESH` acquisition is passive for `password` and `client_credentials` and goes through
//! the browser and the local callback listener for `pkce`, `authorization_code` and
//! `implicit`. A token stored by a successful refresh or acquisition marks the pair as
//! verified; the next evaluation trusts it without introspection and clears the mark.

use std::collections::HashSet;
use std::fmt;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::browser::{BrowserLauncher, SystemBrowser};
use crate::cache::{TokenCache, TokenEntry};
use crate::callback::{CallbackListener, CallbackPayload};
use crate::config::OAuthFlow;
use crate::error::{AuthError, AuthResult};
use crate::introspection::Verification;
use crate::oauth2::{OAuthClient, TokenPair, TokenTypeHint};
use crate::scopes::ResourceKind;

/// Evaluation of the cached token of one (profile, resource) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    CachedValid(TokenEntry),
    CachedExpiredRefreshable(TokenEntry),
    CachedExpiredTerminal,
}

impl TokenState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoToken => "NO_TOKEN",
            Self::CachedValid(_) => "CACHED_VALID",
            Self::CachedExpiredRefreshable(_) => "CACHED_EXPIRED_REFRESHABLE",
            Self::CachedExpiredTerminal => "CACHED_EXPIRED_TERMINAL",
        }
    }
}

/// Acquires, caches, validates and renews the tokens of one profile
pub struct TokenLifecycleManager {
    profile: String,
    client: OAuthClient,
    cache: Mutex<TokenCache>,
    verified: parking_lot::Mutex<HashSet<ResourceKind>>,
    browser: Box<dyn BrowserLauncher>,
}

impl fmt::Debug for TokenLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenLifecycleManager")
            .field("profile", &self.profile)
            .field("flow", &self.client.flow())
            .finish_non_exhaustive()
    }
}

impl TokenLifecycleManager {
    /// Manager for `profile`, opening the system browser for interactive flows
    pub fn new(profile: impl Into<String>, client: OAuthClient, cache: TokenCache) -> Self {
        Self {
            profile: profile.into(),
            client,
            cache: Mutex::new(cache),
            verified: parking_lot::Mutex::new(HashSet::new()),
            browser: Box::new(SystemBrowser),
        }
    }

    /// Replace the browser launcher
    pub fn with_browser(mut self, browser: impl BrowserLauncher + 'static) -> Self {
        self.browser = Box::new(browser);
        self
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn flow(&self) -> OAuthFlow {
        self.client.flow()
    }

    pub fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Return a usable access token for `resource`, acquiring one if needed
    ///
    /// # Errors
    ///
    /// Configuration errors for invalid profiles; token errors when the user denies access
    /// or a `manual` profile has no token; service and transport errors from discovery,
    /// introspection and token exchange. Failures while refreshing are not returned: they
    /// trigger a new acquisition instead.
    pub async fn ensure_authenticated(&self, resource: ResourceKind) -> AuthResult<String> {
        let state = self.assess(resource).await?;
        debug!(profile = %self.profile, %resource, state = state.name(), "evaluated cached token");

        match state {
            TokenState::CachedValid(entry) => return Ok(entry.access_token),
            TokenState::CachedExpiredRefreshable(entry) => {
                match self
                    .client
                    .exchange_refresh_token_for_token(&entry.refresh_token, self.scopes(resource))
                    .await
                {
                    Ok(pair) => {
                        info!(profile = %self.profile, %resource, "refreshed access token");
                        return self.adopt(resource, pair).await;
                    }
                    Err(e) => {
                        warn!(
                            profile = %self.profile,
                            %resource,
                            error = %e,
                            "refresh failed, acquiring a new token"
                        );
                    }
                }
            }
            TokenState::NoToken | TokenState::CachedExpiredTerminal => {}
        }

        debug!(profile = %self.profile, %resource, state = "FRESH", "acquiring token");
        let pair = self.acquire(resource).await?;
        self.adopt(resource, pair).await
    }

    /// Authorization URL for an interactive flow, for completing the flow out of band
    ///
    /// # Errors
    ///
    /// [`AuthError::UnsupportedFlow`] for passive flows, discovery failures otherwise.
    pub async fn authorization_url(&self, resource: ResourceKind) -> AuthResult<String> {
        self.client
            .build_authorization_url(self.scopes(resource))
            .await
    }

    /// Exchange a code obtained out of band and cache the result
    ///
    /// # Errors
    ///
    /// See [`OAuthClient::exchange_code_for_token`]; I/O errors writing the cache.
    pub async fn authenticate_with_code(
        &self,
        resource: ResourceKind,
        code: &str,
    ) -> AuthResult<String> {
        let pair = self.client.exchange_code_for_token(code).await?;
        self.adopt(resource, pair).await
    }

    /// Force a refresh with the cached refresh token
    ///
    /// Unlike the refresh inside [`TokenLifecycleManager::ensure_authenticated`], failures are
    /// returned.
    ///
    /// # Errors
    ///
    /// A `not_authenticated` token error without a cached refresh token; see
    /// [`OAuthClient::exchange_refresh_token_for_token`].
    pub async fn refresh(&self, resource: ResourceKind) -> AuthResult<String> {
        let refresh_token = self
            .cached_entry(resource)
            .await
            .map(|entry| entry.refresh_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AuthError::token(
                    "not_authenticated",
                    format!(
                        "no refresh token is cached for profile '{}' ({resource})",
                        self.profile
                    ),
                )
            })?;

        let pair = self
            .client
            .exchange_refresh_token_for_token(&refresh_token, self.scopes(resource))
            .await?;
        self.adopt(resource, pair).await
    }

    /// Store a token obtained elsewhere, optionally validating it first
    ///
    /// # Errors
    ///
    /// An `invalid_token` token error when `verify` is set and the provider reports the token
    /// inactive; introspection and I/O errors.
    pub async fn seed_token(
        &self,
        resource: ResourceKind,
        access_token: &str,
        refresh_token: &str,
        verify: bool,
    ) -> AuthResult<()> {
        if verify {
            self.client
                .ensure_valid(access_token, TokenTypeHint::AccessToken)
                .await?;
        }

        self.cache.lock().await.put_entry(
            &self.profile,
            resource.name(),
            access_token,
            refresh_token,
        )?;
        if verify {
            self.verified.lock().insert(resource);
        }
        Ok(())
    }

    /// Copy of the cached entry for `resource`
    pub async fn cached_entry(&self, resource: ResourceKind) -> Option<TokenEntry> {
        self.cache
            .lock()
            .await
            .get_entry(&self.profile, resource.name())
    }

    fn scopes(&self, resource: ResourceKind) -> &'static [&'static str] {
        match self.client.flow() {
            OAuthFlow::ClientCredentials => resource.service_scopes(),
            _ => resource.user_scopes(),
        }
    }

    async fn assess(&self, resource: ResourceKind) -> AuthResult<TokenState> {
        // A cleared access token leaves the entry in place with an empty string
        let Some(entry) = self
            .cached_entry(resource)
            .await
            .filter(|entry| !entry.access_token.is_empty())
        else {
            return Ok(TokenState::NoToken);
        };

        // Read-and-clear: the trust extends to this evaluation only
        let verification = if self.verified.lock().remove(&resource) {
            Verification::TrustIssued
        } else {
            Verification::Introspect
        };

        if verification == Verification::Introspect && !self.can_introspect() {
            debug!(%resource, "no introspection credentials, using cached token as is");
            return Ok(TokenState::CachedValid(entry));
        }

        if self
            .client
            .validate(&entry.access_token, TokenTypeHint::AccessToken, verification)
            .await?
        {
            return Ok(TokenState::CachedValid(entry));
        }

        if self.client.flow().supports_refresh() && !entry.refresh_token.is_empty() {
            Ok(TokenState::CachedExpiredRefreshable(entry))
        } else {
            Ok(TokenState::CachedExpiredTerminal)
        }
    }

    fn can_introspect(&self) -> bool {
        self.client.flow() != OAuthFlow::Manual || self.client.config().basic_credentials().is_some()
    }

    async fn acquire(&self, resource: ResourceKind) -> AuthResult<TokenPair> {
        let flow = self.client.flow();
        match flow {
            OAuthFlow::Password | OAuthFlow::ClientCredentials => {
                self.client
                    .acquire_token_by_credentials(self.scopes(resource))
                    .await
            }
            OAuthFlow::Pkce | OAuthFlow::AuthorizationCode | OAuthFlow::Implicit => {
                self.acquire_interactively(resource).await
            }
            OAuthFlow::Manual => Err(AuthError::token(
                "not_authenticated",
                format!(
                    "profile '{}' uses the manual flow and has no valid {resource} token; \
                     seed one with `atko auth seed`",
                    self.profile
                ),
            )),
        }
    }

    async fn acquire_interactively(&self, resource: ResourceKind) -> AuthResult<TokenPair> {
        let flow = self.client.flow();
        let listener = CallbackListener::bind().await?;
        let url = self
            .client
            .build_authorization_url(self.scopes(resource))
            .await?;

        info!(%flow, %resource, "waiting for authorization in the browser");
        self.browser.open(&url)?;
        let payload = listener
            .wait()
            .await
            .map_err(|e| with_authorize_url(e, &url))?;

        match (flow, payload) {
            (OAuthFlow::Implicit, CallbackPayload::AccessToken(access_token)) => {
                self.client
                    .ensure_valid(&access_token, TokenTypeHint::AccessToken)
                    .await?;
                Ok(TokenPair {
                    access_token,
                    refresh_token: String::new(),
                })
            }
            (OAuthFlow::Pkce | OAuthFlow::AuthorizationCode, CallbackPayload::Code(code)) => {
                self.client.exchange_code_for_token(&code).await
            }
            (flow, payload) => Err(AuthError::Token {
                code: "unexpected_callback".to_string(),
                message: format!("the '{flow}' flow cannot use a {payload:?} callback"),
                authorize_url: Some(url),
            }),
        }
    }

    async fn adopt(&self, resource: ResourceKind, pair: TokenPair) -> AuthResult<String> {
        self.cache.lock().await.put_entry(
            &self.profile,
            resource.name(),
            &pair.access_token,
            &pair.refresh_token,
        )?;
        self.verified.lock().insert(resource);
        Ok(pair.access_token)
    }
}

fn with_authorize_url(err: AuthError, url: &str) -> AuthError {
    match err {
        AuthError::Token {
            code,
            message,
            authorize_url: None,
        } => AuthError::Token {
            code,
            message,
            authorize_url: Some(url.to_string()),
        },
        other => other,
    }
}
