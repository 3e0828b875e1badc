//! Error type for `rootguard-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Alert message text could not be converted to or from canonical JSON.
  #[error("core error: {0}")]
  Core(#[from] rootguard_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value the domain types reject, e.g. unknown enum text.
  #[error("decode error: {0}")]
  Decode(String),

  /// The partial unique index on open sessions rejected an insert.
  #[error("an irrigation session is already open")]
  OpenSessionExists,

  #[error("irrigation session {0} is not open")]
  SessionNotOpen(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
