//! Memoizing discovery fetcher

use reqwest::header::HeaderMap;
use tokio::sync::OnceCell;
use tracing::debug;

use super::types::DiscoveryInfo;
use crate::error::{AuthError, AuthResult, TransportErrorKind};
use crate::http_client::HttpTransport;

const WELL_KNOWN: &str = ".well-known/openid-configuration";

/// Fetches the discovery document once and keeps it in memory
#[derive(Debug)]
pub struct DiscoveryFetcher {
    url: String,
    transport: HttpTransport,
    info: OnceCell<DiscoveryInfo>,
}

impl DiscoveryFetcher {
    /// Create a fetcher for the org authorization server, or for a custom server by id
    pub fn new(base_url: &str, auth_server_id: Option<&str>, transport: HttpTransport) -> Self {
        let base = base_url.trim_end_matches('/');
        let url = match auth_server_id {
            Some(id) => format!("{base}/oauth2/{id}/{WELL_KNOWN}"),
            None => format!("{base}/{WELL_KNOWN}"),
        };
        Self {
            url,
            transport,
            info: OnceCell::new(),
        }
    }

    /// URL of the discovery document
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Return the discovery document, fetching it on first use
    ///
    /// # Errors
    ///
    /// Propagates the transport's error unchanged; a document lacking one of the required
    /// endpoints is an invalid-body transport error.
    pub async fn get_discovery_info(&self) -> AuthResult<&DiscoveryInfo> {
        self.info
            .get_or_try_init(|| async {
                debug!(url = %self.url, "fetching discovery document");
                let page = self.transport.get(&self.url, HeaderMap::new()).await?;
                serde_json::from_value::<DiscoveryInfo>(page.body).map_err(|e| {
                    AuthError::Transport {
                        kind: TransportErrorKind::InvalidBody,
                        message: format!("discovery document: {e}"),
                    }
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn document(base: &str) -> serde_json::Value {
        json!({
            "issuer": base,
            "authorization_endpoint": format!("{base}/oauth2/v1/authorize"),
            "token_endpoint": format!("{base}/oauth2/v1/token"),
            "userinfo_endpoint": format!("{base}/oauth2/v1/userinfo"),
            "introspection_endpoint": format!("{base}/oauth2/v1/introspect"),
        })
    }

    #[tokio::test]
    async fn fetches_document_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document(&server.uri())))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = DiscoveryFetcher::new(&server.uri(), None, HttpTransport::new().unwrap());
        let first = fetcher.get_discovery_info().await.unwrap().clone();
        let second = fetcher.get_discovery_info().await.unwrap();

        assert_eq!(&first, second);
        assert!(first.token_endpoint.ends_with("/oauth2/v1/token"));
    }

    #[tokio::test]
    async fn custom_authorization_server_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/default/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document(&server.uri())))
            .mount(&server)
            .await;

        let fetcher = DiscoveryFetcher::new(
            &format!("{}/", server.uri()),
            Some("default"),
            HttpTransport::new().unwrap(),
        );
        assert!(fetcher.get_discovery_info().await.is_ok());
    }

    #[tokio::test]
    async fn incomplete_document_is_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authorization_endpoint": "https://x/authorize"
            })))
            .mount(&server)
            .await;

        let fetcher = DiscoveryFetcher::new(&server.uri(), None, HttpTransport::new().unwrap());
        let err = fetcher.get_discovery_info().await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Transport {
                kind: TransportErrorKind::InvalidBody,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn service_errors_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errorCode": "E0000007",
                "errorSummary": "Not found"
            })))
            .mount(&server)
            .await;

        let fetcher = DiscoveryFetcher::new(&server.uri(), None, HttpTransport::new().unwrap());
        let err = fetcher.get_discovery_info().await.unwrap_err();
        assert_eq!(err.code(), Some("E0000007"));
    }
}
