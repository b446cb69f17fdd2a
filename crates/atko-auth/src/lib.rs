//! # atko-auth - OAuth token lifecycle for the atko Okta client
//!
//! Acquires, caches, validates and renews bearer tokens, one per management resource, across
//! the OAuth grant flows an Okta org supports.
//!
//! ## Architecture
//!
//! - [`discovery`] - endpoint metadata from `/.well-known/openid-configuration`
//! - [`oauth2`] - the per-flow strategy: authorization URLs, token requests, PKCE, client
//!   assertions
//! - [`introspection`] - token validation through the introspection endpoint
//! - [`cache`] - the persisted `profile → resource → tokens` document
//! - [`callback`] - the one-shot local listener for authorization redirects
//! - [`manager`] - [`TokenLifecycleManager`], which ties the above together
//! - [`http_client`] - the HTTP transport shared with the REST client
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use atko_auth::{OAuthClient, OAuthConfig, ResourceKind, TokenCache, TokenLifecycleManager};
//!
//! # async fn example() -> Result<(), atko_auth::AuthError> {
//! let settings: HashMap<String, String> = [
//!     ("oauth_flow", "pkce"),
//!     ("client_id", "0oa1example"),
//!     ("redirect_uri", "http://localhost:12345/authorization-code/callback"),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_string(), v.to_string()))
//! .collect();
//!
//! let config = OAuthConfig::from_settings(&settings)?;
//! let client = OAuthClient::new("https://acme.okta.com", config)?;
//! let cache = TokenCache::load("/tmp/atko-cache.json")?;
//! let manager = TokenLifecycleManager::new("default", client, cache);
//!
//! let token = manager.ensure_authenticated(ResourceKind::Users).await?;
//! # let _ = token;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod cache;
pub mod callback;
pub mod config;
pub mod discovery;
pub mod error;
pub mod http_client;
pub mod introspection;
pub mod manager;
pub mod oauth2;
pub mod scopes;

pub use browser::{BrowserLauncher, PrintUrl, SystemBrowser};
pub use cache::{CacheField, CacheKey, TokenCache, TokenCacheFile, TokenEntry};
pub use callback::{CALLBACK_PORT, CallbackListener, CallbackPayload};
pub use config::{FlowParameters, OAuthConfig, OAuthFlow, SigningKey};
pub use discovery::{DiscoveryFetcher, DiscoveryInfo};
pub use error::{AuthError, AuthResult, ErrorCategory, TransportErrorKind};
pub use http_client::{HttpTransport, Page};
pub use introspection::{IntrospectionResponse, Verification};
pub use manager::{TokenLifecycleManager, TokenState};
pub use oauth2::{OAuthClient, PkceChallenge, TokenPair, TokenTypeHint};
pub use scopes::ResourceKind;
