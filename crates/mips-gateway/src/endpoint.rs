//! Endpoint Resolver
//!
//! Maps the environment mode to the processor's `load_payment_zone` URL.

use url::Url;

use crate::config::Mode;
use crate::error::{GatewayError, Result};

/// Default staging endpoint
pub const DEFAULT_TEST_URL: &str = "https://sandbox.mips.mu/api/load_payment_zone";

/// Default production endpoint
pub const DEFAULT_LIVE_URL: &str = "https://api.mips.mu/api/load_payment_zone";

/// Endpoint per environment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointResolver {
    test: Url,
    live: Url,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self {
            test: Url::parse(DEFAULT_TEST_URL).expect("default test URL is valid"),
            live: Url::parse(DEFAULT_LIVE_URL).expect("default live URL is valid"),
        }
    }
}

impl EndpointResolver {
    /// Create with explicit endpoints
    pub fn new(test: &str, live: &str) -> Result<Self> {
        Ok(Self {
            test: parse_endpoint(test)?,
            live: parse_endpoint(live)?,
        })
    }

    /// Create from `MIPS_TEST_URL` / `MIPS_LIVE_URL`, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let test = std::env::var("MIPS_TEST_URL").unwrap_or_else(|_| DEFAULT_TEST_URL.into());
        let live = std::env::var("MIPS_LIVE_URL").unwrap_or_else(|_| DEFAULT_LIVE_URL.into());
        Self::new(&test, &live)
    }

    /// Endpoint for a mode
    pub fn resolve(&self, mode: Mode) -> &Url {
        match mode {
            Mode::Test => &self.test,
            Mode::Live => &self.live,
        }
    }

    /// Endpoint for a raw mode value; anything but test/live is `UnknownMode`
    pub fn resolve_str(&self, mode: &str) -> Result<&Url> {
        Ok(self.resolve(mode.parse()?))
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| GatewayError::InvalidEndpoint(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::InvalidEndpoint(format!(
            "{raw}: unsupported scheme {}",
            url.scheme()
        )));
    }
    Ok(url)
}
