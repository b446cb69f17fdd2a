//! One-shot local listener for the authorization redirect
//!
//! Interactive flows send the user's browser back to `http://localhost:12345/...` once the
//! provider has authorized the client. The listener accepts that single request, reports it
//! through a oneshot channel, answers with a plain-text page and then shuts down.
//!
//! The request is one of:
//! - `GET ?code=...` for the authorization code flows
//! - `POST` with an `access_token` form field for the implicit flow (`response_mode=form_post`)
//! - either method carrying `error` and `error_description`, which aborts acquisition

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};

/// Fixed port registered in the redirect URIs of the OAuth applications
pub const CALLBACK_PORT: u16 = 12345;

/// What the authorization redirect delivered
#[derive(Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    /// Authorization code from the code flows
    Code(String),
    /// Access token posted by the implicit flow
    AccessToken(String),
}

impl std::fmt::Debug for CallbackPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(_) => f.write_str("Code([REDACTED])"),
            Self::AccessToken(_) => f.write_str("AccessToken([REDACTED])"),
        }
    }
}

type Outcome = AuthResult<CallbackPayload>;

#[derive(Clone)]
struct CallbackState {
    sender: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

/// Listener waiting for exactly one authorization callback
pub struct CallbackListener {
    local_addr: SocketAddr,
    result: oneshot::Receiver<Outcome>,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<std::io::Result<()>>,
}

impl CallbackListener {
    /// Bind `0.0.0.0:12345`
    ///
    /// # Errors
    ///
    /// [`AuthError::PortUnavailable`] when the port cannot be bound.
    pub async fn bind() -> AuthResult<Self> {
        Self::bind_addr(SocketAddr::from(([0, 0, 0, 0], CALLBACK_PORT))).await
    }

    /// Bind an explicit address
    ///
    /// # Errors
    ///
    /// [`AuthError::PortUnavailable`] when the address cannot be bound.
    pub async fn bind_addr(addr: SocketAddr) -> AuthResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AuthError::PortUnavailable {
                port: addr.port(),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;

        let (result_tx, result_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = CallbackState {
            sender: Arc::new(Mutex::new(Some(result_tx))),
        };
        let app = Router::new().fallback(receive).with_state(state);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        debug!(%local_addr, "callback listener started");
        Ok(Self {
            local_addr,
            result: result_rx,
            shutdown: shutdown_tx,
            server,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the callback, then tear the listener down
    ///
    /// There is no timeout: if the user never completes the browser flow this never returns.
    ///
    /// # Errors
    ///
    /// The token error reported by the provider, or a `callback_closed` token error when the
    /// listener stopped without receiving a callback.
    pub async fn wait(self) -> AuthResult<CallbackPayload> {
        let outcome = self.result.await.unwrap_or_else(|_| {
            Err(AuthError::token(
                "callback_closed",
                "the callback listener stopped before a response arrived",
            ))
        });

        let _ = self.shutdown.send(());
        match self.server.await {
            Ok(Err(e)) => warn!(error = %e, "callback listener failed while shutting down"),
            Err(e) => warn!(error = %e, "callback listener task aborted"),
            Ok(Ok(())) => debug!("callback listener stopped"),
        }
        outcome
    }
}

async fn receive(
    State(state): State<CallbackState>,
    method: Method,
    Query(mut params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if method == Method::POST {
        params.extend(url::form_urlencoded::parse(&body).into_owned());
    }

    let Some(outcome) = parse_callback(&params) else {
        // favicon and other stray requests
        return StatusCode::NOT_FOUND.into_response();
    };

    let message = match &outcome {
        Ok(_) => "Authentication complete. You may close this window.".to_string(),
        Err(e) => format!("Authentication failed: {e}\nYou may close this window."),
    };

    match state.sender.lock().take() {
        Some(sender) => {
            let _ = sender.send(outcome);
        }
        None => debug!("ignoring callback after the first one"),
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CONNECTION, "close"),
        ],
        message,
    )
        .into_response()
}

fn parse_callback(params: &HashMap<String, String>) -> Option<Outcome> {
    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .cloned()
            .unwrap_or_else(|| "authorization was not granted".to_string());
        return Some(Err(AuthError::token(error.clone(), description)));
    }
    if let Some(token) = params.get("access_token") {
        return Some(Ok(CallbackPayload::AccessToken(token.clone())));
    }
    params
        .get("code")
        .map(|code| Ok(CallbackPayload::Code(code.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn local_listener() -> (CallbackListener, String) {
        let listener = CallbackListener::bind_addr(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let base = format!("http://{}", listener.local_addr());
        (listener, base)
    }

    #[tokio::test]
    async fn receives_authorization_code() {
        let (listener, base) = local_listener().await;
        let response = tokio::spawn(async move {
            reqwest::get(format!("{base}/authorization-code/callback?code=abc123&state=atkostate"))
                .await
                .unwrap()
        });

        let payload = listener.wait().await.unwrap();
        assert_eq!(payload, CallbackPayload::Code("abc123".to_string()));

        let response = response.await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("close this window"));
    }

    #[tokio::test]
    async fn receives_posted_implicit_token() {
        let (listener, base) = local_listener().await;
        tokio::spawn(async move {
            reqwest::Client::new()
                .post(format!("{base}/implicit/callback"))
                .form(&[("access_token", "tok"), ("state", "atkostate")])
                .send()
                .await
        });

        let payload = listener.wait().await.unwrap();
        assert_eq!(payload, CallbackPayload::AccessToken("tok".to_string()));
    }

    #[tokio::test]
    async fn provider_error_is_token_error() {
        let (listener, base) = local_listener().await;
        tokio::spawn(async move {
            reqwest::get(format!(
                "{base}/callback?error=access_denied&error_description=user+cancelled"
            ))
            .await
        });

        let err = listener.wait().await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("access_denied"));
        assert!(text.contains("user cancelled"));
    }

    #[tokio::test]
    async fn stray_requests_do_not_consume_the_callback() {
        let (listener, base) = local_listener().await;
        tokio::spawn(async move {
            let favicon = reqwest::get(format!("{base}/favicon.ico")).await.unwrap();
            assert_eq!(favicon.status(), 404);
            reqwest::get(format!("{base}/callback?code=later")).await
        });

        let payload = listener.wait().await.unwrap();
        assert_eq!(payload, CallbackPayload::Code("later".to_string()));
    }

    #[tokio::test]
    async fn occupied_port_is_unavailable() {
        let (first, _) = local_listener().await;
        let err = CallbackListener::bind_addr(first.local_addr())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AuthError::PortUnavailable { .. }));
    }
}
