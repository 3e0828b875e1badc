//! Error types for `rootguard-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A caller broke a contract the engine relies on, e.g. opening a second
  /// irrigation session while one is still open.
  #[error("invariant violation: {0}")]
  InvariantViolation(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// Rejected input. Raised before any state is touched.
  #[error("validation error: {0}")]
  Validation(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
