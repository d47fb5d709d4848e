//! The `DonationStore` trait — authoritative state for every donation.
//!
//! Implemented by storage backends (e.g. `ecclesia-store-sqlite`). The
//! store is the single source of truth for "did this donation complete";
//! project `collected` caches are always rebuilt from it.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::donation::{CompletedPayment, Donation, NewDonation};

/// Abstraction over a donation store backend.
pub trait DonationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create and persist a new donation with status `pending` and no
  /// gateway ids. Rejects non-positive amounts.
  fn create_donation(
    &self,
    input: NewDonation,
  ) -> impl Future<Output = Result<Donation, Self::Error>> + Send + '_;

  /// Retrieve a donation by id. Returns `None` if not found.
  fn donation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Donation>, Self::Error>> + Send + '_;

  /// Record the checkout session id on a freshly created donation, once
  /// the gateway session exists.
  fn attach_checkout_session<'a>(
    &'a self,
    id: Uuid,
    session_id: &'a str,
  ) -> impl Future<Output = Result<Donation, Self::Error>> + Send + 'a;

  /// Transition a donation to `complete`, recording settlement details.
  ///
  /// **Idempotent**: if the donation is already complete this is a no-op
  /// returning the existing record unchanged, so a retried webhook or a
  /// repeated success-page visit cannot double-count. Implementations must
  /// use a conditional update (`WHERE status = 'pending'`) so concurrent
  /// calls observe exactly one transition.
  fn mark_complete(
    &self,
    id: Uuid,
    payment: CompletedPayment,
  ) -> impl Future<Output = Result<Donation, Self::Error>> + Send + '_;

  /// Sum of amounts of all **complete** donations for a project.
  /// Returns 0 when none exist.
  fn sum_completed<'a>(
    &'a self,
    project_id: &'a str,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + 'a;
}
