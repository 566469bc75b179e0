//! Order snapshot handed over by the host

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Read-only projection of the host's order at checkout time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: String,

    /// ISO 4217 code
    pub currency_code: String,

    /// Already at the currency's minor-unit precision; sent unchanged
    #[serde(with = "exact_amount")]
    pub amount: Decimal,
}

impl OrderSnapshot {
    pub fn new(
        order_id: impl Into<String>,
        currency_code: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            currency_code: currency_code.into(),
            amount,
        }
    }

    /// Create from a textual amount, failing with `InvalidOrder` when the
    /// amount is not a number or cannot be held without rounding
    pub fn parse(
        order_id: impl Into<String>,
        currency_code: impl Into<String>,
        amount: &str,
    ) -> Result<Self> {
        Ok(Self::new(order_id, currency_code, parse_amount(amount)?))
    }
}

/// Parse an amount, rejecting anything `Decimal` would round
pub fn parse_amount(amount: &str) -> Result<Decimal> {
    Decimal::from_str_exact(amount)
        .map_err(|e| GatewayError::InvalidOrder(format!("amount {amount:?} is not exact: {e}")))
}

mod exact_amount {
    use rust_decimal::Decimal;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_amount(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_keeps_its_scale() {
        let order = OrderSnapshot::parse("1001", "USD", "49.990").unwrap();
        assert_eq!(order.amount.to_string(), "49.990");

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["amount"], "49.990");
    }

    #[test]
    fn test_amount_that_would_round_is_rejected() {
        let result = OrderSnapshot::parse("1001", "USD", "0.12345678901234567890123456789");
        assert!(matches!(result, Err(GatewayError::InvalidOrder(_))));

        let json = r#"{"order_id":"1001","currency_code":"USD","amount":"0.12345678901234567890123456789"}"#;
        assert!(serde_json::from_str::<OrderSnapshot>(json).is_err());
    }

    #[test]
    fn test_amount_must_be_numeric() {
        assert!(matches!(
            parse_amount("12,50"),
            Err(GatewayError::InvalidOrder(_))
        ));
        assert!(parse_amount("").is_err());
    }
}
