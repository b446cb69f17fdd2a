//! # OpenID Connect discovery
//!
//! The flow strategy needs four endpoints from the provider's well-known configuration
//! document: authorization, token, userinfo and introspection. They are fetched with a
//! single GET to `{base_url}/.well-known/openid-configuration` (or the custom authorization
//! server's document when an `auth_server_id` is configured) and memoized for the lifetime
//! of the owning [`DiscoveryFetcher`]. Nothing is persisted and nothing is retried: a failed
//! fetch surfaces the transport error unchanged and the next call tries again.
//!
//! ```rust,no_run
//! use atko_auth::discovery::DiscoveryFetcher;
//! use atko_auth::http_client::HttpTransport;
//!
//! # async fn example() -> Result<(), atko_auth::AuthError> {
//! let fetcher = DiscoveryFetcher::new("https://acme.okta.com", None, HttpTransport::new()?);
//! let info = fetcher.get_discovery_info().await?;
//! println!("token endpoint: {}", info.token_endpoint);
//! # Ok(())
//! # }
//! ```

mod fetcher;
mod types;

pub use fetcher::DiscoveryFetcher;
pub use types::DiscoveryInfo;
