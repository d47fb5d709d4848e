//! Error taxonomy for the donation reconciliation core.
//!
//! Gateway and store internals never cross the orchestrator boundary
//! unmapped; they are wrapped in [`Error::Gateway`] and [`Error::Store`].

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Donation amounts must be positive whole currency units.
  /// Non-retryable; the caller must correct the input.
  #[error("invalid donation amount: {0}")]
  InvalidAmount(i64),

  /// The checkout session carries no recoverable donation id in its
  /// metadata, so it cannot be tied to a local record.
  #[error("session {session_id} has no donation reference")]
  MissingReference { session_id: String },

  #[error("donation not found: {0}")]
  DonationNotFound(Uuid),

  /// No repository adapter holds a project with this id.
  #[error("project not found: {0}")]
  ProjectNotFound(String),

  /// Failure communicating with the payment processor. Retryable by
  /// re-invoking reconciliation later; never mutates local state.
  #[error("payment gateway error: {0}")]
  Gateway(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend storage error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  /// Wrap a payment-gateway error.
  pub fn gateway<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Gateway(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
