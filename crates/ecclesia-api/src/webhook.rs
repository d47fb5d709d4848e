//! Handler for `POST /api/webhooks/stripe`.
//!
//! Webhook deliveries race the donor's own return to the success page;
//! both paths run the same reconciler, and its idempotency makes the race
//! harmless. The processor redelivers until it sees a 2xx, so verified
//! events this system does not act on are still acknowledged.

use axum::{extract::State, http::{HeaderMap, StatusCode}};
use bytes::Bytes;
use ecclesia_core::{
  Error as CoreError, gateway::CheckoutGateway, store::DonationStore,
};
use ecclesia_stripe::webhook::{settled_session_id, verify_signature};

use crate::{AppState, error::ApiError};

pub async fn stripe<D, G>(
  State(state): State<AppState<D, G>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<StatusCode, ApiError>
where
  D: DonationStore,
  G: CheckoutGateway,
{
  let signature = headers
    .get("stripe-signature")
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| ApiError::BadRequest("missing signature header".to_owned()))?;

  let verified = verify_signature(&body, signature, &state.config.webhook_secret)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  if !verified {
    return Err(ApiError::BadRequest("invalid signature".to_owned()));
  }

  let Some(session_id) = settled_session_id(&body)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?
  else {
    // Verified but not a settlement event; acknowledge and move on.
    return Ok(StatusCode::OK);
  };

  match state.reconciler.confirm(&session_id).await {
    Ok(_) => Ok(StatusCode::OK),
    // Redelivery cannot fix a session that points at no local donation;
    // acknowledge it and leave the session id in the log.
    Err(err @ (CoreError::MissingReference { .. } | CoreError::DonationNotFound(_))) => {
      tracing::warn!(%session_id, error = %err, "webhook event could not be matched");
      Ok(StatusCode::OK)
    }
    // A gateway hiccup is worth a retry; let the processor redeliver.
    Err(CoreError::Gateway(source)) => Err(ApiError::Gateway(source)),
    Err(err) => Err(ApiError::Store(Box::new(err))),
  }
}
