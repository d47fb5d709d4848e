//! Webhook signature verification and event parsing.
//!
//! Stripe signs each delivery with an HMAC-SHA256 over
//! `"{timestamp}.{payload}"` and sends it in the `Stripe-Signature` header
//! as `t=<unix>,v1=<hex>[,v1=<hex>…]`. Verification rejects deliveries
//! whose timestamp is outside a five-minute window to blunt replays.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age (and clock skew) of a signed delivery, in seconds.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Event types that mean "this checkout session has settled".
const SETTLEMENT_EVENTS: &[&str] = &[
  "checkout.session.completed",
  "checkout.session.async_payment_succeeded",
];

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// Returns `Ok(false)` for a well-formed header that does not match (wrong
/// secret, tampered payload, stale timestamp) and `Err` only when the
/// header cannot be parsed at all.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> Result<bool> {
  verify_signature_at(payload, header, secret, Utc::now().timestamp())
}

/// [`verify_signature`] with an injectable clock.
pub fn verify_signature_at(
  payload: &[u8],
  header: &str,
  secret: &str,
  now: i64,
) -> Result<bool> {
  let mut timestamp: Option<i64> = None;
  let mut candidates: Vec<Vec<u8>> = Vec::new();

  for part in header.split(',') {
    let Some((key, value)) = part.trim().split_once('=') else {
      return Err(Error::MalformedSignature);
    };
    match key {
      "t" => {
        timestamp =
          Some(value.parse().map_err(|_| Error::MalformedSignature)?);
      }
      "v1" => {
        candidates
          .push(hex::decode(value).map_err(|_| Error::MalformedSignature)?);
      }
      // Unknown schemes (e.g. v0 test signatures) are ignored.
      _ => {}
    }
  }

  let timestamp = timestamp.ok_or(Error::MalformedSignature)?;
  if candidates.is_empty() {
    return Err(Error::MalformedSignature);
  }

  if (now - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
    return Ok(false);
  }

  let mut signed = timestamp.to_string().into_bytes();
  signed.push(b'.');
  signed.extend_from_slice(payload);

  Ok(candidates.iter().any(|candidate| {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
      .expect("HMAC accepts any key length");
    mac.update(&signed);
    // Constant-time comparison.
    mac.verify_slice(candidate).is_ok()
  }))
}

// ─── Event parsing ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Event {
  #[serde(rename = "type")]
  kind: String,
  data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
  object: EventObject,
}

#[derive(Debug, Deserialize)]
struct EventObject {
  id: String,
}

/// Extract the checkout session id from a settlement event.
///
/// Returns `None` for verified-but-irrelevant event types; the caller
/// acknowledges those so the processor stops redelivering them.
pub fn settled_session_id(payload: &[u8]) -> Result<Option<String>> {
  let event: Event = serde_json::from_slice(payload)?;
  if SETTLEMENT_EVENTS.contains(&event.kind.as_str()) {
    Ok(Some(event.data.object.id))
  } else {
    Ok(None)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
