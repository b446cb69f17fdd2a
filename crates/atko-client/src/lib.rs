//! # atko-client - Okta users and groups over REST
//!
//! Authenticated access to an Okta org's management API with either an API token or OAuth
//! access tokens managed by [`atko_auth`].
//!
//! ## Architecture
//!
//! ```text
//! UserManager / GroupManager      (resource operations, bulk results)
//!        ↓
//! OktaClient                      (base URL, Authorization header, curl tracing)
//!        ↓
//! atko_auth::HttpTransport        (reqwest, error mapping, Link paging)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use atko_client::{Credentials, DeepSearch, ListQuery, OktaClient, Resource};
//! use secrecy::SecretString;
//!
//! # async fn example() -> atko_client::ClientResult<()> {
//! let client = OktaClient::new(
//!     "https://acme.okta.com",
//!     Credentials::ApiToken(SecretString::new("00a1example".to_string())),
//! )?;
//!
//! let staged = client
//!     .users()
//!     .list(&ListQuery::filter("status eq \"STAGED\""), None, &DeepSearch::default())
//!     .await?;
//! for user in &staged {
//!     client.users().activate(user.id(), false).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod client;
pub mod error;
pub mod groups;
pub mod import;
pub mod models;
pub mod pagination;
pub mod search;
pub mod users;

pub use bulk::BulkResult;
pub use client::{Credentials, OktaClient, curl_command};
pub use error::{ClientError, ClientResult};
pub use groups::GroupManager;
pub use import::{ImportFormat, PasswordMode};
pub use models::{Group, Resource, User, display_value};
pub use pagination::{DEFAULT_LIMIT, ListQuery};
pub use search::DeepSearch;
pub use users::UserManager;
