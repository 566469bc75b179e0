//! Gateway Error Types

use std::fmt;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// One or more credentials are empty
    #[error("Payment gateway configuration incomplete: missing {}", .missing.join(", "))]
    ConfigurationIncomplete { missing: Vec<&'static str> },

    /// Environment mode outside test/live
    #[error("Unknown gateway mode: {0:?}")]
    UnknownMode(String),

    /// Endpoint override is not an absolute URL
    #[error("Invalid gateway endpoint: {0}")]
    InvalidEndpoint(String),

    /// Order snapshot cannot be sent to the processor
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Return URL could not carry the correlation token
    #[error("Invalid return URL: {0}")]
    InvalidReturnUrl(String),

    /// Network, TLS or timeout failure talking to the processor.
    ///
    /// Only the failure class is kept here; upstream detail goes to the log.
    #[error("Connection to the payment processor failed ({0})")]
    GatewayUnreachable(TransportFailure),

    /// Lifecycle transition not allowed from a terminal state
    #[error("Cannot move payment from {from} on {status} callback")]
    InvalidTransition { from: String, status: String },

    /// Payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Classification of a transport-level failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    Connect,
    Request,
    Body,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportFailure::Timeout => "timeout",
            TransportFailure::Connect => "connect",
            TransportFailure::Request => "request",
            TransportFailure::Body => "body",
        };
        f.write_str(s)
    }
}

impl GatewayError {
    /// Check if re-rendering the payment form can help
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::GatewayUnreachable(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            GatewayError::GatewayUnreachable(_) => {
                "Connection to the payment processor failed. Please try again or contact an administrator to resolve the issue."
            }
            GatewayError::ConfigurationIncomplete { .. }
            | GatewayError::UnknownMode(_)
            | GatewayError::InvalidEndpoint(_) => {
                "Online payment is not configured. Please contact the site administrator."
            }
            GatewayError::InvalidOrder(_) => "This order cannot be paid online.",
            _ => "An error occurred processing your payment.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_listed() {
        let err = GatewayError::ConfigurationIncomplete {
            missing: vec!["id_merchant", "basic_password"],
        };
        assert_eq!(
            err.to_string(),
            "Payment gateway configuration incomplete: missing id_merchant, basic_password"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unreachable_is_retryable() {
        let err = GatewayError::GatewayUnreachable(TransportFailure::Timeout);
        assert!(err.is_retryable());
        assert!(err.user_message().contains("try again"));
    }
}
