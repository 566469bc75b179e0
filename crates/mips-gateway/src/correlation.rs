//! Return Correlation Tokens
//!
//! The processor sends the end user back to the return URL with nothing but
//! the order id to go on. A signed token appended to that URL ties the
//! return to the checkout session that issued it.
//!
//! Format: `<nonce>.<issued_at>.<mac>` where the MAC is HMAC-SHA256 over
//! `order_id|nonce|issued_at`, hex encoded.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the token on the return URL
pub const TOKEN_PARAM: &str = "mips_token";

const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Why a token was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenRejection {
    Malformed,
    BadSignature,
    Expired,
    NotYetValid,
}

/// Issues and verifies correlation tokens
#[derive(Clone)]
pub struct CorrelationSigner {
    secret: Vec<u8>,
    max_age: Duration,
}

impl CorrelationSigner {
    /// Create with the default 24h validity
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            max_age: Duration::hours(24),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Issue a token for one checkout session of `order_id`
    pub fn issue(&self, order_id: &str) -> String {
        self.issue_at(order_id, Utc::now())
    }

    pub fn issue_at(&self, order_id: &str, now: DateTime<Utc>) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let issued_at = now.timestamp();
        let mac = self.mac(order_id, &nonce, issued_at).finalize().into_bytes();
        format!("{nonce}.{issued_at}.{}", hex::encode(mac))
    }

    /// Check that `token` was issued for `order_id` and is still fresh
    pub fn verify(&self, order_id: &str, token: &str) -> Result<(), TokenRejection> {
        self.verify_at(order_id, token, Utc::now())
    }

    pub fn verify_at(
        &self,
        order_id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenRejection> {
        let mut parts = token.split('.');
        let (Some(nonce), Some(issued_at), Some(mac), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenRejection::Malformed);
        };
        if nonce.is_empty() {
            return Err(TokenRejection::Malformed);
        }
        let issued_at: i64 = issued_at.parse().map_err(|_| TokenRejection::Malformed)?;
        let expected = hex::decode(mac).map_err(|_| TokenRejection::Malformed)?;

        // verify_slice compares in constant time
        self.mac(order_id, nonce, issued_at)
            .verify_slice(&expected)
            .map_err(|_| TokenRejection::BadSignature)?;

        let age = now.timestamp() - issued_at;
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(TokenRejection::NotYetValid);
        }
        if age > self.max_age.num_seconds() {
            return Err(TokenRejection::Expired);
        }
        Ok(())
    }

    fn mac(&self, order_id: &str, nonce: &str, issued_at: i64) -> HmacSha256 {
        // HMAC takes keys of any length
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(nonce.as_bytes());
        mac.update(b"|");
        mac.update(issued_at.to_string().as_bytes());
        mac
    }
}
