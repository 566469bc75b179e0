//! Checkout Request Builder
//!
//! Assembles the `load_payment_zone` payload: the authentify block from the
//! merchant credentials, the order block from the snapshot, and the iframe
//! behaviour block.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::GatewayConfiguration;
use crate::error::{GatewayError, Result};
use crate::order::OrderSnapshot;

/// Fixed iframe height
pub const IFRAME_HEIGHT: &str = "700px";

/// Fixed iframe width
pub const IFRAME_WIDTH: &str = "100%";

/// Payload posted to the processor.
///
/// Field order is the wire order.
#[derive(Clone, Debug, Serialize)]
pub struct CheckoutRequest {
    pub authentify: Authentify,
    pub order: OrderBlock,
    pub iframe_behavior: IframeBehavior,
    pub request_mode: &'static str,
    pub touchpoint: &'static str,
}

#[derive(Clone, Serialize)]
pub struct Authentify {
    pub id_merchant: String,
    pub id_entity: String,
    pub id_operator: String,
    pub operator_password: String,
}

impl fmt::Debug for Authentify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentify")
            .field("id_merchant", &self.id_merchant)
            .field("id_entity", &self.id_entity)
            .field("id_operator", &self.id_operator)
            .field("operator_password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderBlock {
    pub id_order: String,
    pub currency: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct IframeBehavior {
    pub height: &'static str,
    pub width: &'static str,
    pub custom_redirection_url: String,
    pub language: String,
}

/// Build the payload for one checkout attempt.
///
/// Credentials are checked first so an incomplete configuration never
/// reaches the network. `return_url` and `language` are copied verbatim.
pub fn build(
    config: &GatewayConfiguration,
    order: &OrderSnapshot,
    return_url: &str,
    language: &str,
) -> Result<CheckoutRequest> {
    config.validate()?;

    if order.order_id.trim().is_empty() {
        return Err(GatewayError::InvalidOrder("order id is empty".into()));
    }
    if order.currency_code.trim().is_empty() {
        return Err(GatewayError::InvalidOrder("currency code is empty".into()));
    }
    if order.amount < Decimal::ZERO {
        return Err(GatewayError::InvalidOrder(format!(
            "amount {} is negative",
            order.amount
        )));
    }

    Ok(CheckoutRequest {
        authentify: Authentify {
            id_merchant: config.merchant_id.clone(),
            id_entity: config.entity_id.clone(),
            id_operator: config.operator_id.clone(),
            operator_password: config.operator_password.clone(),
        },
        order: OrderBlock {
            id_order: order.order_id.clone(),
            currency: order.currency_code.clone(),
            amount: order.amount,
        },
        iframe_behavior: IframeBehavior {
            height: IFRAME_HEIGHT,
            width: IFRAME_WIDTH,
            custom_redirection_url: return_url.to_string(),
            language: language.to_string(),
        },
        request_mode: "simple",
        touchpoint: "web",
    })
}
