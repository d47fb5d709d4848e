//! Error type for `ecclesia-stripe`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The API answered with a non-success status.
  #[error("stripe api error ({status}): {message}")]
  Api { status: u16, message: String },

  #[error("malformed webhook signature header")]
  MalformedSignature,

  /// The API accepted the session but returned no hosted-payment URL, so
  /// there is nothing to redirect the donor to.
  #[error("checkout session {0} has no redirect url")]
  MissingRedirectUrl(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
