//! Return Handling
//!
//! Classifies what the processor sends back after the hosted page (browser
//! redirect or server-to-server callback). Everything inbound is untrusted:
//! anything that cannot be tied to the order or read as a clear status ends
//! up as `ReturnStatus::Unknown`.
//!
//! A correlation token proves the return belongs to a session this host
//! started. It says nothing about the status fields, which a browser
//! redirect lets the end user edit. Confirm a `Success` from a browser
//! return with the processor before closing the payment.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::correlation::{CorrelationSigner, TOKEN_PARAM};
use crate::error::{GatewayError, Result};

/// Keys that may carry the processor's status signal
const STATUS_KEYS: &[&str] = &[
    "status",
    "payment_status",
    "transaction_status",
    "result",
    "state",
];

/// Keys that may carry the order id
const ORDER_KEYS: &[&str] = &["id_order", "order_id"];

/// Outcome reported by the processor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Success,
    Failure,
    Pending,
    /// Needs manual reconciliation
    Unknown,
}

impl ReturnStatus {
    /// Map a processor status value
    pub fn from_signal(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "success" | "successful" | "succeeded" | "approved" | "paid" | "completed"
            | "captured" | "accepted" => ReturnStatus::Success,
            "failure" | "failed" | "fail" | "declined" | "refused" | "rejected" | "cancelled"
            | "canceled" | "error" | "expired" => ReturnStatus::Failure,
            "pending" | "processing" | "in_progress" | "waiting" | "initiated" => {
                ReturnStatus::Pending
            }
            _ => ReturnStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Success => "success",
            ReturnStatus::Failure => "failure",
            ReturnStatus::Pending => "pending",
            ReturnStatus::Unknown => "unknown",
        }
    }

    /// Whether the host can close the payment on this outcome
    pub fn is_final(&self) -> bool {
        matches!(self, ReturnStatus::Success | ReturnStatus::Failure)
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified return, handed to the host
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReturnOutcome {
    pub order_id: String,
    pub status: ReturnStatus,
    pub raw_payload: String,
    pub received_at: DateTime<Utc>,
}

/// Inbound return request, flattened to string fields
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboundReturn {
    fields: BTreeMap<String, String>,
    raw: String,
}

impl InboundReturn {
    /// From query-string or form pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let raw = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter())
            .finish();
        Self { fields, raw }
    }

    /// From a raw query string (`a=1&b=2`)
    pub fn from_query(query: &str) -> Self {
        let mut inbound = Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned());
        inbound.raw = query.to_string();
        inbound
    }

    /// From a request body; JSON objects and form bodies are understood,
    /// anything else yields no fields but is kept as the raw payload
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(body).into_owned();
        let is_json = content_type.is_some_and(|ct| ct.to_lowercase().contains("json"))
            || raw.trim_start().starts_with('{');

        let mut fields = BTreeMap::new();
        if is_json {
            match serde_json::from_slice::<serde_json::Value>(body) {
                Ok(value @ serde_json::Value::Object(_)) => flatten_json("", &value, &mut fields),
                Ok(_) => tracing::debug!("MIPS return body is JSON but not an object"),
                Err(e) => tracing::debug!(error = %e, "MIPS return body is not valid JSON"),
            }
        } else {
            fields.extend(url::form_urlencoded::parse(body).into_owned());
        }

        Self { fields, raw }
    }

    /// Add query parameters without overriding body fields
    pub fn with_query(mut self, query: &str) -> Self {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()).into_owned() {
            self.fields.entry(key).or_insert(value);
        }
        self
    }

    /// Case-insensitive field lookup
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Values for keys whose last dotted segment matches `key`
    fn fields_named<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(k, _)| {
                k.rsplit('.')
                    .next()
                    .is_some_and(|last| last.eq_ignore_ascii_case(key))
            })
            .map(|(_, v)| v.as_str())
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn flatten_json(prefix: &str, value: &serde_json::Value, out: &mut BTreeMap<String, String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_json(&path, nested, out);
            }
        }
        serde_json::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        serde_json::Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        serde_json::Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        serde_json::Value::Null | serde_json::Value::Array(_) => {}
    }
}

/// Maps inbound returns to outcomes
#[derive(Clone, Default)]
pub struct ReturnHandler {
    signer: Option<CorrelationSigner>,
}

impl ReturnHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a valid correlation token on every return
    pub fn with_signer(signer: CorrelationSigner) -> Self {
        Self {
            signer: Some(signer),
        }
    }

    pub fn handle(&self, order_id: &str, inbound: &InboundReturn) -> ReturnOutcome {
        let status = self.classify(order_id, inbound);

        tracing::info!(order_id, status = %status, "MIPS return classified");

        ReturnOutcome {
            order_id: order_id.to_string(),
            status,
            raw_payload: inbound.raw().to_string(),
            received_at: Utc::now(),
        }
    }

    fn classify(&self, order_id: &str, inbound: &InboundReturn) -> ReturnStatus {
        if let Some(signer) = &self.signer {
            let Some(token) = inbound.field(TOKEN_PARAM) else {
                tracing::warn!(order_id, "MIPS return without correlation token");
                return ReturnStatus::Unknown;
            };
            if let Err(rejection) = signer.verify(order_id, token) {
                tracing::warn!(order_id, ?rejection, "MIPS return with rejected correlation token");
                return ReturnStatus::Unknown;
            }
        }

        for key in ORDER_KEYS {
            if let Some(claimed) = inbound.fields_named(key).find(|v| v.trim() != order_id) {
                tracing::warn!(order_id, claimed, "MIPS return names a different order");
                return ReturnStatus::Unknown;
            }
        }

        let mut signals = STATUS_KEYS
            .iter()
            .flat_map(|key| inbound.fields_named(key))
            .map(ReturnStatus::from_signal)
            .filter(|s| *s != ReturnStatus::Unknown);

        let Some(first) = signals.next() else {
            tracing::debug!(order_id, "No recognizable status in MIPS return");
            return ReturnStatus::Unknown;
        };
        if signals.any(|other| other != first) {
            tracing::warn!(order_id, "Conflicting status fields in MIPS return");
            return ReturnStatus::Unknown;
        }
        first
    }
}

/// Off-site payment lifecycle as seen by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    /// Checkout artifact produced, waiting for the processor
    Initiated,
    Pending,
    Succeeded,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Initiated => "initiated",
            PaymentState::Pending => "pending",
            PaymentState::Succeeded => "succeeded",
            PaymentState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentState::Succeeded | PaymentState::Failed)
    }

    /// Apply a classified return.
    ///
    /// `Unknown` never moves the state. A terminal state accepts the same
    /// outcome again but refuses a contradicting one.
    pub fn apply(self, status: ReturnStatus) -> Result<Self> {
        let next = match (self, status) {
            (state, ReturnStatus::Unknown) => state,
            (PaymentState::Succeeded, ReturnStatus::Success) => PaymentState::Succeeded,
            (PaymentState::Failed, ReturnStatus::Failure) => PaymentState::Failed,
            (PaymentState::Succeeded | PaymentState::Failed, _) => {
                return Err(GatewayError::InvalidTransition {
                    from: self.as_str().to_string(),
                    status: status.as_str().to_string(),
                });
            }
            (_, ReturnStatus::Success) => PaymentState::Succeeded,
            (_, ReturnStatus::Failure) => PaymentState::Failed,
            (_, ReturnStatus::Pending) => PaymentState::Pending,
        };
        Ok(next)
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(inbound: &InboundReturn) -> ReturnStatus {
        ReturnHandler::new().handle("1001", inbound).status
    }

    #[test]
    fn test_status_signals() {
        assert_eq!(ReturnStatus::from_signal("SUCCESS"), ReturnStatus::Success);
        assert_eq!(ReturnStatus::from_signal(" approved "), ReturnStatus::Success);
        assert_eq!(ReturnStatus::from_signal("declined"), ReturnStatus::Failure);
        assert_eq!(ReturnStatus::from_signal("processing"), ReturnStatus::Pending);
        assert_eq!(ReturnStatus::from_signal("maybe"), ReturnStatus::Unknown);
        assert_eq!(ReturnStatus::from_signal(""), ReturnStatus::Unknown);
    }

    #[test]
    fn test_no_status_field_is_unknown() {
        let inbound = InboundReturn::from_pairs([("id_order", "1001"), ("amount", "49.99")]);
        assert_eq!(handle(&inbound), ReturnStatus::Unknown);
        assert_eq!(handle(&InboundReturn::default()), ReturnStatus::Unknown);
    }

    #[test]
    fn test_query_return() {
        let inbound = InboundReturn::from_query("id_order=1001&status=success");
        let outcome = ReturnHandler::new().handle("1001", &inbound);

        assert_eq!(outcome.status, ReturnStatus::Success);
        assert_eq!(outcome.order_id, "1001");
        assert_eq!(outcome.raw_payload, "id_order=1001&status=success");
    }

    #[test]
    fn test_json_callback_with_nested_status() {
        let body = br#"{"transaction":{"Status":"FAILED","id":"T9"},"id_order":1001}"#;
        let inbound = InboundReturn::from_body(Some("application/json"), body);
        assert_eq!(inbound.field("transaction.status"), Some("FAILED"));
        assert_eq!(handle(&inbound), ReturnStatus::Failure);
    }

    #[test]
    fn test_form_callback() {
        let inbound = InboundReturn::from_body(
            Some("application/x-www-form-urlencoded"),
            b"payment_status=pending&order_id=1001",
        );
        assert_eq!(handle(&inbound), ReturnStatus::Pending);
    }

    #[test]
    fn test_garbage_body_is_unknown() {
        let inbound = InboundReturn::from_body(Some("application/json"), b"{not json");
        assert!(inbound.is_empty());
        assert_eq!(inbound.raw(), "{not json");
        assert_eq!(handle(&inbound), ReturnStatus::Unknown);
    }

    #[test]
    fn test_other_order_is_unknown() {
        let inbound = InboundReturn::from_pairs([("id_order", "2002"), ("status", "success")]);
        assert_eq!(handle(&inbound), ReturnStatus::Unknown);
    }

    #[test]
    fn test_conflicting_statuses_are_unknown() {
        let inbound = InboundReturn::from_pairs([("status", "success"), ("result", "declined")]);
        assert_eq!(handle(&inbound), ReturnStatus::Unknown);

        let agreeing = InboundReturn::from_pairs([("status", "success"), ("result", "approved")]);
        assert_eq!(handle(&agreeing), ReturnStatus::Success);
    }

    #[test]
    fn test_body_fields_win_over_query() {
        let inbound = InboundReturn::from_body(Some("application/json"), br#"{"status":"failed"}"#)
            .with_query("status=success&mips_token=abc");
        assert_eq!(inbound.field("status"), Some("failed"));
        assert_eq!(inbound.field("mips_token"), Some("abc"));
    }

    #[test]
    fn test_token_required_when_signing() {
        let signer = CorrelationSigner::new(b"secret".to_vec());
        let handler = ReturnHandler::with_signer(signer.clone());

        let unsigned = InboundReturn::from_pairs([("status", "success")]);
        assert_eq!(handler.handle("1001", &unsigned).status, ReturnStatus::Unknown);

        let forged = InboundReturn::from_pairs([
            ("status", "success"),
            (TOKEN_PARAM, signer.issue("9999").as_str()),
        ]);
        assert_eq!(handler.handle("1001", &forged).status, ReturnStatus::Unknown);

        let token = signer.issue("1001");
        let genuine = InboundReturn::from_pairs([("status", "success"), (TOKEN_PARAM, token.as_str())]);
        assert_eq!(handler.handle("1001", &genuine).status, ReturnStatus::Success);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let state = PaymentState::Initiated;
        assert_eq!(state.apply(ReturnStatus::Unknown).unwrap(), PaymentState::Initiated);
        assert_eq!(state.apply(ReturnStatus::Pending).unwrap(), PaymentState::Pending);
        assert_eq!(state.apply(ReturnStatus::Failure).unwrap(), PaymentState::Failed);

        let pending = state.apply(ReturnStatus::Pending).unwrap();
        assert_eq!(pending.apply(ReturnStatus::Success).unwrap(), PaymentState::Succeeded);
    }

    #[test]
    fn test_terminal_states() {
        let done = PaymentState::Succeeded;
        assert!(done.is_terminal());
        assert_eq!(done.apply(ReturnStatus::Success).unwrap(), PaymentState::Succeeded);
        assert_eq!(done.apply(ReturnStatus::Unknown).unwrap(), PaymentState::Succeeded);
        assert!(matches!(
            done.apply(ReturnStatus::Failure),
            Err(GatewayError::InvalidTransition { .. })
        ));
        assert!(PaymentState::Failed.apply(ReturnStatus::Pending).is_err());
    }
}
