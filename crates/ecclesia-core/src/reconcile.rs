//! The reconciliation orchestrator — the single entry point invoked when a
//! donor returns from the hosted checkout (or a webhook redelivers the
//! settlement event).
//!
//! A reconciliation attempt terminates in one of three states: completed,
//! pending, or an error from the taxonomy in [`crate::error`]. The
//! orchestrator performs no retries itself; redelivery is safe because
//! [`DonationStore::mark_complete`] is idempotent and the aggregator
//! recomputes totals from source.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::CollectionAggregator,
  donation::{CompletedPayment, Donation},
  gateway::CheckoutGateway,
  store::DonationStore,
};

/// Terminal state of a successful reconciliation attempt.
#[derive(Debug, Clone)]
pub enum Confirmation {
  /// The payment is settled and the donation is (now) complete.
  Completed(Donation),
  /// The gateway has not settled the payment yet; nothing was mutated.
  /// The caller may show "processing" and invoke reconciliation again
  /// later.
  Pending(Donation),
}

impl Confirmation {
  pub fn donation(&self) -> &Donation {
    match self {
      Self::Completed(d) | Self::Pending(d) => d,
    }
  }
}

/// Verifies a checkout session, transitions the donation exactly once, and
/// triggers re-aggregation of project totals.
pub struct Reconciler<D, G> {
  donations:  Arc<D>,
  gateway:    Arc<G>,
  aggregator: CollectionAggregator<D>,
}

impl<D, G> Reconciler<D, G>
where
  D: DonationStore,
  G: CheckoutGateway,
{
  pub fn new(
    donations: Arc<D>,
    gateway: Arc<G>,
    aggregator: CollectionAggregator<D>,
  ) -> Self {
    Self { donations, gateway, aggregator }
  }

  pub fn aggregator(&self) -> &CollectionAggregator<D> { &self.aggregator }

  /// Run one reconciliation attempt for a returned session id.
  ///
  /// The only durable mutations are the donation's status transition and
  /// the project collected caches; a gateway failure leaves all local
  /// state untouched.
  pub async fn confirm(&self, session_id: &str) -> Result<Confirmation> {
    let session = self
      .gateway
      .retrieve_session(session_id)
      .await
      .map_err(Error::gateway)?;

    let donation_id = session.donation_id.ok_or_else(|| Error::MissingReference {
      session_id: session_id.to_owned(),
    })?;

    let donation = self.lookup(donation_id).await?;

    // A previous confirmation (page reload, racing webhook) already won;
    // totals already reflect this donation.
    if donation.status.is_complete() {
      tracing::debug!(%donation_id, session_id, "donation already complete");
      return Ok(Confirmation::Completed(donation));
    }

    if !session.is_settled() {
      tracing::info!(%donation_id, session_id, "payment not settled yet");
      return Ok(Confirmation::Pending(donation));
    }

    let completed = self
      .donations
      .mark_complete(donation_id, CompletedPayment {
        checkout_session_id: session.session_id.clone(),
        payment_intent_id:   session.payment_intent_id.clone(),
      })
      .await
      .map_err(Error::store)?;

    let report = self.aggregator.reconcile_all().await;
    tracing::info!(
      %donation_id,
      session_id,
      amount = completed.amount,
      project_id = %completed.project_id,
      reconciled = report.reconciled,
      failed = report.failures.len(),
      "donation confirmed"
    );

    Ok(Confirmation::Completed(completed))
  }

  async fn lookup(&self, donation_id: Uuid) -> Result<Donation> {
    self
      .donations
      .donation(donation_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::DonationNotFound(donation_id))
  }
}
