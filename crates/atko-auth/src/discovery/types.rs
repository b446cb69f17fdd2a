//! Discovery document types

use serde::{Deserialize, Serialize};

/// Endpoints read from `/.well-known/openid-configuration`
///
/// All four fields are required; a document missing one of them is rejected while parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryInfo {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub introspection_endpoint: String,
    /// Issuer identifier, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}
