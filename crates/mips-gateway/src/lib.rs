//! # mips-gateway
//!
//! Off-site checkout through the MIPS hosted payment page.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  POST payload   ┌─────────────────┐
//! │    Host     │────────────────▶│      MIPS       │
//! │ (checkout)  │◀────────────────│  load_payment   │
//! └─────────────┘  iframe markup  └─────────────────┘
//!        │                                 │
//!        │ embed                           │ redirect / callback
//!        ▼                                 ▼
//! ┌─────────────┐                 ┌─────────────────┐
//! │  End user   │────────────────▶│  Host return    │
//! │  (browser)  │                 │  URL → outcome  │
//! └─────────────┘                 └─────────────────┘
//! ```
//!
//! The host owns orders, payment records and rendering. This crate builds
//! the authenticated request, talks to the processor once per attempt, and
//! turns whatever comes back to the return URL into a [`ReturnOutcome`].
//! Unreadable returns are [`ReturnStatus::Unknown`], never success.
//! A [`ReturnStatus::Success`] read from a browser redirect is what the end
//! user's browser reports; confirm it with the processor before closing the
//! payment.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mips_gateway::{CheckoutSessionProvider, GatewayConfiguration, MipsGateway, OrderSnapshot};
//!
//! let config = GatewayConfiguration::from_env()?;
//! let gateway = MipsGateway::http("en");
//!
//! let artifact = gateway
//!     .create_checkout_session(&config, &order, "https://shop.example/checkout/1001/return")
//!     .await?;
//!
//! // Embed artifact.as_str() in the payment step
//! ```

mod checkout;
mod config;
mod correlation;
mod endpoint;
mod error;
mod order;
pub mod request;
mod returns;
pub mod transport;

pub use checkout::{
    CheckoutArtifact, CheckoutSessionProvider, FixedLanguage, LanguageResolver, MipsGateway,
};
pub use config::{GatewayConfiguration, Mode};
pub use correlation::{CorrelationSigner, TokenRejection, TOKEN_PARAM};
pub use endpoint::{EndpointResolver, DEFAULT_LIVE_URL, DEFAULT_TEST_URL};
pub use error::{GatewayError, Result, TransportFailure};
pub use order::{parse_amount, OrderSnapshot};
pub use request::CheckoutRequest;
pub use returns::{InboundReturn, PaymentState, ReturnHandler, ReturnOutcome, ReturnStatus};
pub use transport::{basic_auth_header, CheckoutTransport, HttpTransport, DEFAULT_TIMEOUT};
pub use url::Url;
