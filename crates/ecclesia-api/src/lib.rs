//! JSON REST API for the Ecclesia donation platform.
//!
//! Exposes an axum [`Router`] generic over any
//! [`DonationStore`](ecclesia_core::store::DonationStore) and
//! [`CheckoutGateway`](ecclesia_core::gateway::CheckoutGateway), so tests
//! run against in-memory stores and a fake gateway while the server binary
//! wires up SQLite and Stripe. TLS and transport concerns are the
//! caller's responsibility.

pub mod donations;
pub mod error;
pub mod projects;
pub mod webhook;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use ecclesia_core::{
  aggregate::CollectionAggregator,
  gateway::{CheckoutGateway, ReturnUrls},
  reconcile::Reconciler,
  repository::ProjectRepository,
  store::DonationStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` (with
/// `ECCLESIA_`-prefixed environment overrides).
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// Where the processor sends the donor after payment. May contain the
  /// `{CHECKOUT_SESSION_ID}` placeholder.
  pub success_url:           String,
  pub cancel_url:            String,
  pub currency:              String,
  pub stripe_secret_key:     String,
  pub stripe_webhook_secret: String,
}

/// The slice of configuration the request handlers need.
#[derive(Clone)]
pub struct ApiConfig {
  pub success_url:    String,
  pub cancel_url:     String,
  pub webhook_secret: String,
}

impl ApiConfig {
  pub fn return_urls(&self) -> ReturnUrls {
    ReturnUrls {
      success: self.success_url.clone(),
      cancel:  self.cancel_url.clone(),
    }
  }
}

impl ServerConfig {
  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      success_url:    self.success_url.clone(),
      cancel_url:     self.cancel_url.clone(),
      webhook_secret: self.stripe_webhook_secret.clone(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<D, G> {
  pub donations:  Arc<D>,
  pub gateway:    Arc<G>,
  pub reconciler: Arc<Reconciler<D, G>>,
  pub config:     Arc<ApiConfig>,
}

// Manual impl: `D`/`G` need not be `Clone` themselves.
impl<D, G> Clone for AppState<D, G> {
  fn clone(&self) -> Self {
    Self {
      donations:  self.donations.clone(),
      gateway:    self.gateway.clone(),
      reconciler: self.reconciler.clone(),
      config:     self.config.clone(),
    }
  }
}

impl<D, G> AppState<D, G>
where
  D: DonationStore,
  G: CheckoutGateway,
{
  /// Wire up the aggregator and reconciler around the given backends.
  pub fn new(
    donations: Arc<D>,
    gateway: Arc<G>,
    repositories: Vec<Arc<dyn ProjectRepository>>,
    config: ApiConfig,
  ) -> Self {
    let aggregator = CollectionAggregator::new(donations.clone(), repositories);
    let reconciler =
      Arc::new(Reconciler::new(donations.clone(), gateway.clone(), aggregator));
    Self {
      donations,
      gateway,
      reconciler,
      config: Arc::new(config),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn router<D, G>(state: AppState<D, G>) -> Router
where
  D: DonationStore + 'static,
  G: CheckoutGateway + 'static,
{
  Router::new()
    // Donations
    .route("/api/donations", post(donations::create::<D, G>))
    .route("/api/donations/confirm", get(donations::confirm::<D, G>))
    // Webhooks
    .route("/api/webhooks/stripe", post(webhook::stripe::<D, G>))
    // Projects
    .route("/api/projects", get(projects::list::<D, G>))
    .route("/api/projects/{id}", get(projects::get_one::<D, G>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
