//! Donation — a single contribution attempt against a project.
//!
//! A donation's amount is immutable once created. Its status moves
//! monotonically from [`DonationStatus::Pending`] to
//! [`DonationStatus::Complete`]; no other terminal state exists and a
//! donation is never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Lifecycle status of a donation. The only transition is
/// `Pending -> Complete`, performed exactly once by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
  Pending,
  Complete,
}

impl DonationStatus {
  pub fn is_complete(&self) -> bool { matches!(self, Self::Complete) }
}

/// Optional identity attached to a donation.
///
/// May be entirely absent (fully anonymous donation), or present but
/// flagged not-to-be-displayed via [`Donation::anonymous`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donor {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub email:      Option<String>,
  pub phone:      Option<String>,
}

/// A single contribution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
  pub donation_id:         Uuid,
  pub project_id:          String,
  /// Whole currency units; always positive.
  pub amount:              i64,
  pub status:              DonationStatus,
  pub donor:               Option<Donor>,
  /// Suppress the donor's name on public surfaces even when known.
  pub anonymous:           bool,
  pub message:             Option<String>,
  /// Checkout session id, set once the gateway session exists.
  pub checkout_session_id: Option<String>,
  /// Payment-intent id reported by the gateway at settlement.
  pub payment_intent_id:   Option<String>,
  /// Server-assigned; never changes after creation.
  pub created_at:          DateTime<Utc>,
}

/// Input to [`crate::store::DonationStore::create_donation`].
/// Ids, status, and `created_at` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewDonation {
  pub project_id: String,
  pub amount:     i64,
  pub donor:      Option<Donor>,
  pub anonymous:  bool,
  pub message:    Option<String>,
}

impl NewDonation {
  /// Convenience constructor for an anonymous donation with no message.
  pub fn new(project_id: impl Into<String>, amount: i64) -> Self {
    Self {
      project_id: project_id.into(),
      amount,
      donor: None,
      anonymous: true,
      message: None,
    }
  }

  /// Reject non-positive amounts. Stores call this before persisting;
  /// the API layer calls it before touching the store at all.
  pub fn validate(&self) -> Result<()> {
    if self.amount <= 0 {
      return Err(Error::InvalidAmount(self.amount));
    }
    Ok(())
  }
}

/// Settlement details recorded when a donation is marked complete.
#[derive(Debug, Clone)]
pub struct CompletedPayment {
  pub checkout_session_id: String,
  pub payment_intent_id:   Option<String>,
}
