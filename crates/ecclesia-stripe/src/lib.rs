//! Stripe adapter for the Ecclesia donation platform.
//!
//! Implements [`CheckoutGateway`] over the Stripe HTTP API directly;
//! checkout session creation and retrieval are the only two calls this
//! system makes, which does not justify a full SDK dependency. The
//! donation id rides along as session metadata so it can be recovered on
//! the donor's return without a local lookup table.

pub mod error;
pub mod webhook;

pub use error::{Error, Result};

use std::{collections::HashMap, time::Duration};

use ecclesia_core::{
  donation::Donation,
  gateway::{
    CheckoutGateway, CheckoutSession, CreatedSession, PaymentState,
    ReturnUrls, SessionState,
  },
};
use serde::Deserialize;
use uuid::Uuid;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Connection settings for the Stripe API.
#[derive(Debug, Clone)]
pub struct StripeConfig {
  pub secret_key:     String,
  pub webhook_secret: String,
  /// ISO 4217 currency code for checkout line items (e.g. `"eur"`).
  pub currency:       String,
  /// Overridable for tests pointing at a local stub.
  pub api_base:       String,
}

impl StripeConfig {
  pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
    Self {
      secret_key:     secret_key.into(),
      webhook_secret: webhook_secret.into(),
      currency:       "eur".to_owned(),
      api_base:       DEFAULT_API_BASE.to_owned(),
    }
  }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// The production [`CheckoutGateway`] backed by the Stripe REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct StripeGateway {
  client: reqwest::Client,
  config: StripeConfig,
}

impl StripeGateway {
  pub fn new(config: StripeConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, config })
  }

  pub fn webhook_secret(&self) -> &str { &self.config.webhook_secret }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.config.api_base.trim_end_matches('/'))
  }

  async fn decode_or_api_error<T>(resp: reqwest::Response) -> Result<T>
  where
    T: for<'de> Deserialize<'de>,
  {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp.json::<T>().await?);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
      .map(|e| e.error.message)
      .unwrap_or(body);
    Err(Error::Api { status: status.as_u16(), message })
  }
}

impl CheckoutGateway for StripeGateway {
  type Error = Error;

  async fn create_session(
    &self,
    donation: &Donation,
    urls: &ReturnUrls,
  ) -> Result<CreatedSession> {
    let params = session_params(donation, urls, &self.config.currency);

    let resp = self
      .client
      .post(self.url("/v1/checkout/sessions"))
      .bearer_auth(&self.config.secret_key)
      .form(&params)
      .send()
      .await?;

    let payload: SessionPayload = Self::decode_or_api_error(resp).await?;
    payload.into_created()
  }

  async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession> {
    let resp = self
      .client
      .get(self.url(&format!("/v1/checkout/sessions/{session_id}")))
      .bearer_auth(&self.config.secret_key)
      .send()
      .await?;

    let payload: SessionPayload = Self::decode_or_api_error(resp).await?;
    Ok(payload.into_session())
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

/// Form parameters for `POST /v1/checkout/sessions`.
///
/// Donation amounts are stored in whole currency units; Stripe expects the
/// minor unit, hence the `* 100`.
fn session_params(
  donation: &Donation,
  urls: &ReturnUrls,
  currency: &str,
) -> Vec<(&'static str, String)> {
  vec![
    ("mode", "payment".to_owned()),
    ("success_url", urls.success.clone()),
    ("cancel_url", urls.cancel.clone()),
    ("line_items[0][quantity]", "1".to_owned()),
    ("line_items[0][price_data][currency]", currency.to_owned()),
    (
      "line_items[0][price_data][unit_amount]",
      (donation.amount * 100).to_string(),
    ),
    (
      "line_items[0][price_data][product_data][name]",
      format!("Donation ({})", donation.project_id),
    ),
    ("metadata[donation_id]", donation.donation_id.to_string()),
  ]
}

/// The subset of a checkout session object this system reads.
#[derive(Debug, Deserialize)]
struct SessionPayload {
  id:             String,
  #[serde(default)]
  url:            Option<String>,
  #[serde(default)]
  status:         Option<String>,
  #[serde(default)]
  payment_status: Option<String>,
  #[serde(default)]
  payment_intent: Option<String>,
  #[serde(default)]
  metadata:       HashMap<String, String>,
}

impl SessionPayload {
  /// Lift a freshly created session, requiring the hosted-payment URL.
  fn into_created(self) -> Result<CreatedSession> {
    let url = self
      .url
      .clone()
      .ok_or_else(|| Error::MissingRedirectUrl(self.id.clone()))?;
    Ok(CreatedSession { session_id: self.id, url })
  }

  fn into_session(self) -> CheckoutSession {
    let state = match self.status.as_deref() {
      Some("complete") => SessionState::Complete,
      Some("expired") => SessionState::Expired,
      _ => SessionState::Open,
    };
    let payment = match self.payment_status.as_deref() {
      Some("paid") => PaymentState::Paid,
      Some("no_payment_required") => PaymentState::NoPaymentRequired,
      _ => PaymentState::Unpaid,
    };
    let donation_id = self
      .metadata
      .get("donation_id")
      .and_then(|s| Uuid::parse_str(s).ok());

    CheckoutSession {
      session_id: self.id,
      state,
      payment,
      payment_intent_id: self.payment_intent,
      donation_id,
    }
  }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
  error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
  #[serde(default)]
  message: String,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
