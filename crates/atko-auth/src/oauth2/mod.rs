//! OAuth 2.0 grant flows
//!
//! ## Submodules
//!
//! - `client` - [`OAuthClient`], the per-flow strategy for URLs and token requests
//! - `pkce` - verifier/challenge pairs (RFC 7636)
//! - `assertion` - signed client assertions (RFC 7523)
//! - `types` - token endpoint responses

pub mod assertion;
pub mod client;
pub mod pkce;
pub mod types;

pub use client::{AUTHORIZATION_STATE, OAuthClient};
pub use pkce::PkceChallenge;
pub use types::{TokenPair, TokenResponse, TokenTypeHint};
