//! Handlers for the donation endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/donations` | Body: [`CreateBody`]; 201 + checkout redirect |
//! | `GET`  | `/api/donations/confirm` | `?session_id=` from the donor's return |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use ecclesia_core::{
  Error as CoreError,
  donation::{Donor, NewDonation},
  gateway::CheckoutGateway,
  reconcile::Confirmation,
  store::DonationStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Create ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /api/donations`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub project_id: String,
  /// Whole currency units; must be positive.
  pub amount:     i64,
  pub donor:      Option<Donor>,
  pub message:    Option<String>,
  #[serde(default)]
  pub anonymous:  bool,
}

/// Returned by `POST /api/donations`; the front end redirects the donor to
/// `checkout_url`.
#[derive(Debug, Serialize)]
pub struct DonationCreated {
  pub donation_id:  Uuid,
  pub session_id:   String,
  pub checkout_url: String,
}

/// `POST /api/donations`
pub async fn create<D, G>(
  State(state): State<AppState<D, G>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  D: DonationStore,
  G: CheckoutGateway,
{
  let input = NewDonation {
    project_id: body.project_id,
    amount:     body.amount,
    donor:      body.donor,
    anonymous:  body.anonymous,
    message:    body.message,
  };
  input
    .validate()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let donation = state
    .donations
    .create_donation(input)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let created = state
    .gateway
    .create_session(&donation, &state.config.return_urls())
    .await
    .map_err(|e| ApiError::Gateway(Box::new(e)))?;

  let donation = state
    .donations
    .attach_checkout_session(donation.donation_id, &created.session_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  tracing::info!(
    donation_id = %donation.donation_id,
    project_id = %donation.project_id,
    amount = donation.amount,
    session_id = %created.session_id,
    "donation created, redirecting to checkout"
  );

  Ok((StatusCode::CREATED, Json(DonationCreated {
    donation_id:  donation.donation_id,
    session_id:   created.session_id,
    checkout_url: created.url,
  })))
}

// ─── Confirm ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConfirmParams {
  pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
  /// `"completed"` or `"pending"`.
  pub status:      &'static str,
  pub donation_id: Uuid,
  pub project_id:  String,
  pub amount:      i64,
}

/// `GET /api/donations/confirm?session_id=<id>`
///
/// Invoked when the donor lands back on the success page. Safe to call any
/// number of times for the same session.
pub async fn confirm<D, G>(
  State(state): State<AppState<D, G>>,
  Query(params): Query<ConfirmParams>,
) -> Result<Json<ConfirmResponse>, ApiError>
where
  D: DonationStore,
  G: CheckoutGateway,
{
  match state.reconciler.confirm(&params.session_id).await {
    Ok(outcome) => {
      let status = match &outcome {
        Confirmation::Completed(_) => "completed",
        Confirmation::Pending(_) => "pending",
      };
      let donation = outcome.donation();
      Ok(Json(ConfirmResponse {
        status,
        donation_id: donation.donation_id,
        project_id: donation.project_id.clone(),
        amount: donation.amount,
      }))
    }
    Err(err @ (CoreError::MissingReference { .. } | CoreError::DonationNotFound(_))) => {
      // Keep the raw session id in the log for manual recovery; the donor
      // gets a neutral message.
      tracing::warn!(
        session_id = %params.session_id,
        error = %err,
        "donation return could not be matched"
      );
      Err(ApiError::NotFound("could not confirm your donation".to_owned()))
    }
    Err(CoreError::Gateway(source)) => Err(ApiError::Gateway(source)),
    Err(err) => Err(ApiError::Store(Box::new(err))),
  }
}
