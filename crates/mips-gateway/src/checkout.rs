//! MIPS Checkout Integration
//!
//! Implements the hosted iframe flow: build the payload, post it to the
//! environment's endpoint, hand the processor's markup back to the host.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::GatewayConfiguration;
use crate::correlation::{CorrelationSigner, TOKEN_PARAM};
use crate::endpoint::EndpointResolver;
use crate::error::{GatewayError, Result};
use crate::order::OrderSnapshot;
use crate::request;
use crate::returns::{InboundReturn, ReturnHandler, ReturnOutcome};
use crate::transport::{self, CheckoutTransport, HttpTransport, DEFAULT_TIMEOUT};

/// Processor response body, embeddable as-is
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutArtifact(String);

impl CheckoutArtifact {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for CheckoutArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CheckoutArtifact({} bytes)", self.0.len())
    }
}

/// Current display language of the host
pub trait LanguageResolver: Send + Sync {
    /// Language tag, e.g. `en`
    fn current_language(&self) -> String;
}

/// Always the same language
#[derive(Clone, Debug)]
pub struct FixedLanguage(pub String);

impl Default for FixedLanguage {
    fn default() -> Self {
        Self("en".into())
    }
}

impl LanguageResolver for FixedLanguage {
    fn current_language(&self) -> String {
        self.0.clone()
    }
}

/// Off-site checkout capability a host depends on
#[async_trait]
pub trait CheckoutSessionProvider: Send + Sync {
    /// Produce the embeddable checkout for `order`
    async fn create_checkout_session(
        &self,
        config: &GatewayConfiguration,
        order: &OrderSnapshot,
        return_url: &str,
    ) -> Result<CheckoutArtifact>;

    /// Classify the processor's return for `order_id`
    fn handle_return(&self, order_id: &str, inbound: &InboundReturn) -> ReturnOutcome;

    /// Provider name
    fn name(&self) -> &str;
}

/// MIPS checkout session adapter
pub struct MipsGateway {
    transport: Arc<dyn CheckoutTransport>,
    language: Arc<dyn LanguageResolver>,
    endpoints: EndpointResolver,
    timeout: Duration,
    signer: Option<CorrelationSigner>,
    returns: ReturnHandler,
}

impl MipsGateway {
    /// Create with explicit collaborators
    pub fn new(transport: Arc<dyn CheckoutTransport>, language: Arc<dyn LanguageResolver>) -> Self {
        Self {
            transport,
            language,
            endpoints: EndpointResolver::default(),
            timeout: DEFAULT_TIMEOUT,
            signer: None,
            returns: ReturnHandler::new(),
        }
    }

    /// reqwest transport, fixed language
    pub fn http(language: impl Into<String>) -> Self {
        Self::new(
            Arc::new(HttpTransport::new()),
            Arc::new(FixedLanguage(language.into())),
        )
    }

    pub fn with_endpoints(mut self, endpoints: EndpointResolver) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sign return URLs and require the signature on returns
    pub fn with_correlation(mut self, signer: CorrelationSigner) -> Self {
        self.returns = ReturnHandler::with_signer(signer.clone());
        self.signer = Some(signer);
        self
    }

    pub fn endpoints(&self) -> &EndpointResolver {
        &self.endpoints
    }

    fn return_url_for(&self, order_id: &str, return_url: &str) -> Result<String> {
        let Some(signer) = &self.signer else {
            return Ok(return_url.to_string());
        };
        let mut url = Url::parse(return_url)
            .map_err(|e| GatewayError::InvalidReturnUrl(format!("{return_url}: {e}")))?;
        url.query_pairs_mut()
            .append_pair(TOKEN_PARAM, &signer.issue(order_id));
        Ok(url.into())
    }
}

#[async_trait]
impl CheckoutSessionProvider for MipsGateway {
    async fn create_checkout_session(
        &self,
        config: &GatewayConfiguration,
        order: &OrderSnapshot,
        return_url: &str,
    ) -> Result<CheckoutArtifact> {
        let language = self.language.current_language();
        let return_url = self.return_url_for(&order.order_id, return_url)?;
        let payload = request::build(config, order, &return_url, &language)?;

        let url = self.endpoints.resolve(config.mode);
        let auth_header = transport::basic_auth_header(&config.basic_username, &config.basic_password);

        tracing::info!(
            order_id = %order.order_id,
            mode = %config.mode,
            language = %language,
            "Creating MIPS checkout session"
        );

        let body = self
            .transport
            .send(url, &payload, &auth_header, self.timeout)
            .await?;

        Ok(CheckoutArtifact(body))
    }

    fn handle_return(&self, order_id: &str, inbound: &InboundReturn) -> ReturnOutcome {
        self.returns.handle(order_id, inbound)
    }

    fn name(&self) -> &str {
        "MIPS"
    }
}
