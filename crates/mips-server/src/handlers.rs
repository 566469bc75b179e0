//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use mips_gateway::{GatewayError, InboundReturn, OrderSnapshot, ReturnOutcome};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub mode: &'static str,
    pub gateway_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: String,
    pub currency: String,
    /// Decimal string, passed to the processor as given
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    /// Processor markup to embed in the payment step
    pub checkout: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: &GatewayError) -> ApiError {
    let (status, code) = match err {
        GatewayError::ConfigurationIncomplete { .. }
        | GatewayError::UnknownMode(_)
        | GatewayError::InvalidEndpoint(_) => (StatusCode::SERVICE_UNAVAILABLE, "PAYMENTS_NOT_CONFIGURED"),
        GatewayError::GatewayUnreachable(_) => (StatusCode::BAD_GATEWAY, "GATEWAY_UNREACHABLE"),
        GatewayError::InvalidOrder(_) | GatewayError::InvalidReturnUrl(_) => {
            (StatusCode::BAD_REQUEST, "INVALID_ORDER")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "CHECKOUT_ERROR"),
    };

    (
        status,
        Json(ErrorResponse {
            error: err.user_message().into(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        mode: state.gateway_config.mode.as_str(),
        gateway_configured: state.gateway_config.is_complete(),
    })
}

/// Create an off-site checkout session
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let order = OrderSnapshot::parse(payload.order_id, payload.currency, &payload.amount)
        .map_err(|e| api_error(&e))?;
    let return_url = state.return_url(&order.order_id).map_err(|e| api_error(&e))?;

    let artifact = state
        .provider
        .create_checkout_session(&state.gateway_config, &order, &return_url)
        .await
        .map_err(|e| {
            tracing::error!(order_id = %order.order_id, "Checkout error: {}", e);
            api_error(&e)
        })?;

    Ok(Json(CheckoutResponse {
        order_id: order.order_id,
        checkout: artifact.into_inner(),
    }))
}

/// Browser redirect back from the hosted page
///
/// The query comes from the end user's browser, so a `success` here is only
/// what the browser claims. Confirm it with the processor before closing the
/// payment.
pub async fn payment_return(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Json<ReturnOutcome> {
    let inbound = InboundReturn::from_query(query.as_deref().unwrap_or_default());
    Json(state.provider.handle_return(&order_id, &inbound))
}

/// Server-to-server callback (or POSTed redirect)
pub async fn payment_callback(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Json<ReturnOutcome> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let inbound = InboundReturn::from_body(content_type, &body)
        .with_query(query.as_deref().unwrap_or_default());
    Json(state.provider.handle_return(&order_id, &inbound))
}
