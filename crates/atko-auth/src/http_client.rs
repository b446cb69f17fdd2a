//! HTTP transport shared by the OAuth flows and the REST client
//!
//! Every call returns parsed JSON (or a status code for PUT/DELETE) and maps failures into
//! the [`AuthError`] taxonomy: reqwest failures become [`AuthError::Transport`], non-2xx
//! responses become [`AuthError::Service`] carrying the provider's error envelope.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LINK};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{AuthError, AuthResult, TransportErrorKind};

const USER_AGENT: &str = concat!("atko/", env!("CARGO_PKG_VERSION"));

/// One page of a GET response
#[derive(Debug, Clone)]
pub struct Page {
    pub body: Value,
    /// Path and query of the next page, from the `Link: <..>; rel="next"` header
    pub next: Option<String>,
}

/// Thin wrapper over [`reqwest::Client`] with the error mapping applied
#[derive(Clone, Debug)]
pub struct HttpTransport {
    inner: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default client settings
    ///
    /// # Errors
    ///
    /// Returns a transport error when the TLS backend cannot be initialised.
    pub fn new() -> AuthResult<Self> {
        let inner = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { inner })
    }

    /// Create from an existing reqwest client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { inner: client }
    }

    /// GET a JSON document, returning it with the next page link
    ///
    /// # Errors
    ///
    /// Transport errors, service errors for non-2xx statuses, or an invalid-body error when
    /// the response is not JSON.
    pub async fn get(&self, url: &str, headers: HeaderMap) -> AuthResult<Page> {
        debug!(method = "GET", url, "sending request");
        let response = send(self.inner.get(url).headers(with_accept(headers))).await?;
        let next = next_link(response.headers());
        let body = json_body(response).await?;
        Ok(Page { body, next })
    }

    /// POST an optional JSON body
    ///
    /// # Errors
    ///
    /// Same as [`HttpTransport::get`].
    pub async fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> AuthResult<Value> {
        debug!(method = "POST", url, "sending request");
        let mut request = self.inner.post(url).headers(with_accept(headers));
        if let Some(body) = body {
            request = request.json(body);
        }
        json_body(send(request).await?).await
    }

    /// POST an urlencoded form, optionally with HTTP Basic client authentication
    ///
    /// # Errors
    ///
    /// Same as [`HttpTransport::get`].
    pub async fn post_form(
        &self,
        url: &str,
        basic: Option<(&str, &str)>,
        form: &[(&str, &str)],
    ) -> AuthResult<Value> {
        debug!(method = "POST", url, "sending form request");
        let mut request = self
            .inner
            .post(url)
            .headers(with_accept(HeaderMap::new()))
            .form(form);
        if let Some((user, secret)) = basic {
            request = request.basic_auth(user, Some(secret));
        }
        json_body(send(request).await?).await
    }

    /// PUT an optional JSON body, returning the status code
    ///
    /// # Errors
    ///
    /// Transport errors or service errors for non-2xx statuses.
    pub async fn put_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> AuthResult<u16> {
        debug!(method = "PUT", url, "sending request");
        let mut request = self.inner.put(url).headers(with_accept(headers));
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(send(request).await?.status().as_u16())
    }

    /// DELETE a resource, returning the status code
    ///
    /// # Errors
    ///
    /// Transport errors or service errors for non-2xx statuses.
    pub async fn delete(&self, url: &str, headers: HeaderMap) -> AuthResult<u16> {
        debug!(method = "DELETE", url, "sending request");
        let response = send(self.inner.delete(url).headers(with_accept(headers))).await?;
        Ok(response.status().as_u16())
    }
}

fn with_accept(mut headers: HeaderMap) -> HeaderMap {
    headers
        .entry(ACCEPT)
        .or_insert(HeaderValue::from_static("application/json"));
    headers
}

async fn send(request: RequestBuilder) -> AuthResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "request rejected");
    Err(service_error(status.as_u16(), &body))
}

async fn json_body(response: Response) -> AuthResult<Value> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| AuthError::Transport {
        kind: TransportErrorKind::InvalidBody,
        message: e.to_string(),
    })
}

/// Map an error response onto [`AuthError::Service`]
pub(crate) fn service_error(status: u16, body: &str) -> AuthError {
    let Ok(info @ Value::Object(_)) = serde_json::from_str::<Value>(body) else {
        let message = if body.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            body.trim().to_string()
        };
        return AuthError::Service {
            status,
            code: "api_error".to_string(),
            message,
            info: Value::String(body.to_string()),
        };
    };

    let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_string);
    let code = text("errorCode")
        .or_else(|| text("error"))
        .unwrap_or_else(|| "unknown_error".to_string());
    let message = text("errorSummary")
        .or_else(|| text("error_description"))
        .unwrap_or_else(|| "Okta service error".to_string());

    AuthError::Service {
        status,
        code,
        message,
        info,
    }
}

/// Extract the `rel="next"` target of a `Link` header as a path relative to the host
pub(crate) fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|entry| {
            let mut parts = entry.split(';');
            let target = parts
                .next()?
                .trim()
                .strip_prefix('<')?
                .strip_suffix('>')?;
            parts
                .any(|param| matches!(param.trim(), "rel=\"next\"" | "rel=next"))
                .then(|| relative_to_host(target))
        })
}

fn relative_to_host(target: &str) -> String {
    match Url::parse(target) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => target.to_string(),
    }
}
