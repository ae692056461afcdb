//! Error types for `tani-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("account not found: {0}")]
  AccountNotFound(Uuid),

  #[error("listing not found: {0}")]
  ListingNotFound(Uuid),

  /// A stored document failed required-field validation on read. Surfaced as
  /// an error rather than patched over with defaults.
  #[error("malformed {collection} document {id}: {reason}")]
  MalformedDocument {
    collection: &'static str,
    id:         String,
    reason:     String,
  },

  /// The backing store could not answer. Distinct from any "not found"
  /// outcome; callers must not collapse the two.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap an arbitrary backend failure.
  pub fn store(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(cause))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
