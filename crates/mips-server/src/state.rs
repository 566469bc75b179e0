//! Application State

use std::sync::Arc;

use mips_gateway::{CheckoutSessionProvider, GatewayConfiguration, GatewayError, Result, Url};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Off-site checkout provider (MIPS)
    pub provider: Arc<dyn CheckoutSessionProvider>,

    /// Merchant credentials, checked on every checkout
    pub gateway_config: Arc<GatewayConfiguration>,

    /// Public base URL the processor sends users back to
    pub public_base_url: Url,
}

impl AppState {
    /// Return URL handed to the processor for `order_id`
    ///
    /// The id is one percent-encoded path segment, so it cannot add a
    /// query, a fragment or extra segments to the URL.
    pub fn return_url(&self, order_id: &str) -> Result<String> {
        let mut url = self.public_base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidReturnUrl(self.public_base_url.to_string()))?
            .pop_if_empty()
            .push("payment")
            .push("return")
            .push(order_id);
        Ok(url.into())
    }
}
