//! The `CheckoutGateway` trait — the seam to the external payment
//! processor.
//!
//! Implemented by `ecclesia-stripe` for production and by in-memory fakes
//! in tests. The donation id travels as opaque metadata on the session, so
//! no local lookup table keyed by session id is needed to recover it.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::donation::Donation;

/// Where the processor sends the donor after the hosted checkout.
#[derive(Debug, Clone)]
pub struct ReturnUrls {
  pub success: String,
  pub cancel:  String,
}

/// Result of creating a hosted checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSession {
  pub session_id: String,
  /// The hosted payment page to redirect the donor to.
  pub url:        String,
}

/// Overall state of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
  Open,
  Complete,
  Expired,
}

/// Settlement state of the payment behind a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
  Paid,
  Unpaid,
  NoPaymentRequired,
}

/// A previously created session as reported by the processor.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
  pub session_id:        String,
  pub state:             SessionState,
  pub payment:           PaymentState,
  pub payment_intent_id: Option<String>,
  /// Recovered from session metadata; `None` if the metadata is missing
  /// or unparseable.
  pub donation_id:       Option<Uuid>,
}

impl CheckoutSession {
  /// The processor considers this session settled.
  pub fn is_settled(&self) -> bool {
    self.state == SessionState::Complete && self.payment == PaymentState::Paid
  }
}

/// Abstraction over the external payment processor.
///
/// Any network or gateway failure surfaces as `Self::Error`; callers must
/// not assume partial success, and no local state may change on failure.
pub trait CheckoutGateway: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Request a hosted checkout session for a pending donation. The
  /// donation's id is embedded as metadata on the session.
  fn create_session<'a>(
    &'a self,
    donation: &'a Donation,
    urls: &'a ReturnUrls,
  ) -> impl Future<Output = Result<CreatedSession, Self::Error>> + Send + 'a;

  /// Fetch the current state of a previously created session.
  fn retrieve_session<'a>(
    &'a self,
    session_id: &'a str,
  ) -> impl Future<Output = Result<CheckoutSession, Self::Error>> + Send + 'a;
}
