//! Error type for `ecclesia-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] ecclesia_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown donation status: {0:?}")]
  UnknownStatus(String),

  #[error("donation not found: {0}")]
  DonationNotFound(uuid::Uuid),

  #[error("parish not found: {0}")]
  ParishNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
