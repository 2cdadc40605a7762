//! Webhook signature verification.
//!
//! Implements the provider's signature scheme (HMAC-SHA256 over
//! `timestamp.payload`, hex-encoded in a `v1` header field) with
//! timestamp validation to reject replayed deliveries. Verification runs
//! against the raw request bytes; the payload is only decoded into a
//! [`ProviderEvent`] after the digest checks out.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::provider_event::ProviderEvent;

/// Maximum allowed age for webhook deliveries (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future-dated deliveries (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Errors raised while verifying a webhook delivery.
///
/// None of these are retryable; the endpoint acknowledges the delivery
/// regardless and the failure is only logged.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Signature digest did not match the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Delivery is older than the acceptance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Delivery timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Signature header or payload could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Parsed components of the `stripe-signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signature (HMAC-SHA256).
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses a signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<hex signature>`; unknown fields are
    /// ignored for forward compatibility.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::ParseError` if a required field is
    /// missing or malformed.
    pub fn parse(header: &str) -> Result<Self, VerificationError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                VerificationError::ParseError("invalid header format".to_string())
            })?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        VerificationError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        VerificationError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| VerificationError::ParseError("missing timestamp".to_string()))?;
        let v1_signature = v1_signature
            .ok_or_else(|| VerificationError::ParseError("missing v1 signature".to_string()))?;

        Ok(SignatureHeader {
            timestamp,
            v1_signature,
        })
    }
}

/// Raw event envelope as delivered by the provider.
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    livemode: bool,
    #[serde(default)]
    data: EventData,
}

#[derive(Debug, Default, Deserialize)]
struct EventData {
    #[serde(default)]
    object: serde_json::Value,
}

/// Verifier for inbound webhook deliveries.
pub struct WebhookVerifier {
    /// Webhook signing secret shared with the provider.
    secret: String,
}

impl WebhookVerifier {
    /// Creates a verifier with the given webhook signing secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies the delivery signature and decodes the event.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate timestamp is within acceptable range
    /// 3. Compute expected signature using HMAC-SHA256
    /// 4. Compare signatures using constant-time comparison
    /// 5. Decode the payload into a ProviderEvent
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - digest mismatch
    /// - `TimestampOutOfRange` - delivery older than 5 minutes
    /// - `InvalidTimestamp` - delivery timestamp in the future
    /// - `ParseError` - malformed header or payload
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<ProviderEvent, VerificationError> {
        // 1. Parse signature header
        let header = SignatureHeader::parse(signature_header)?;

        // 2. Validate timestamp
        self.validate_timestamp(header.timestamp)?;

        // 3. Compute expected signature
        let expected_signature = self.compute_signature(header.timestamp, payload);

        // 4. Compare signatures (constant-time)
        if !constant_time_compare(&expected_signature, &header.v1_signature) {
            return Err(VerificationError::InvalidSignature);
        }

        // 5. Decode event, keeping the raw envelope for the audit log
        let raw: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| VerificationError::ParseError(e.to_string()))?;
        let envelope: EventEnvelope = serde_json::from_value(raw.clone())
            .map_err(|e| VerificationError::ParseError(e.to_string()))?;

        Ok(ProviderEvent::new(
            envelope.id,
            envelope.event_type,
            envelope.created,
            envelope.livemode,
            &envelope.data.object,
            raw,
        ))
    }

    /// Validates that the timestamp is within acceptable bounds.
    fn validate_timestamp(&self, timestamp: i64) -> Result<(), VerificationError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        // Reject deliveries that are too old
        if age > MAX_EVENT_AGE_SECS {
            return Err(VerificationError::TimestampOutOfRange);
        }

        // Reject deliveries from the future (with clock skew tolerance)
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(VerificationError::InvalidTimestamp);
        }

        Ok(())
    }

    /// Computes the HMAC-SHA256 signature for a timestamp and payload.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));

        let mut mac =
            Hmac::<Sha256>::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key");
        mac.update(signed_payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the
/// expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes HMAC-SHA256 for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
