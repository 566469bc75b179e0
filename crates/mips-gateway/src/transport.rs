//! Transport Client
//!
//! Posts the checkout payload to the processor. Transport failures are
//! logged in full and surfaced as a bare `GatewayUnreachable`; HTTP
//! responses of any status hand back the raw body.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::error::{GatewayError, Result, TransportFailure};
use crate::request::CheckoutRequest;

/// Hard limit for one processor round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// `Basic base64(username:password)`
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let credentials = format!("{username}:{password}");
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    )
}

/// Outbound channel to the processor (Strategy pattern)
#[async_trait]
pub trait CheckoutTransport: Send + Sync {
    /// POST `payload` to `url` and return the raw response body
    async fn send(
        &self,
        url: &Url,
        payload: &CheckoutRequest,
        auth_header: &str,
        timeout: Duration,
    ) -> Result<String>;
}

/// reqwest-backed transport
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxy, TLS roots, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CheckoutTransport for HttpTransport {
    async fn send(
        &self,
        url: &Url,
        payload: &CheckoutRequest,
        auth_header: &str,
        timeout: Duration,
    ) -> Result<String> {
        let body = serde_json::to_vec(payload)?;
        let order_id = payload.order.id_order.as_str();

        let response = self
            .client
            .post(url.clone())
            .header(AUTHORIZATION, auth_header)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| unreachable(order_id, &e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| unreachable(order_id, &e))?;

        if status.is_success() {
            tracing::debug!(order_id, status = status.as_u16(), "MIPS checkout response received");
        } else {
            tracing::warn!(
                order_id,
                status = status.as_u16(),
                body = %text,
                "MIPS answered with a non-success status"
            );
        }

        Ok(text)
    }
}

fn unreachable(order_id: &str, err: &reqwest::Error) -> GatewayError {
    let failure = classify(err);
    tracing::error!(
        order_id,
        failure = %failure,
        error = %err,
        source = ?std::error::Error::source(err),
        "Connection to MIPS failed"
    );
    GatewayError::GatewayUnreachable(failure)
}

fn classify(err: &reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Connect
    } else if err.is_body() || err.is_decode() {
        TransportFailure::Body
    } else {
        TransportFailure::Request
    }
}
