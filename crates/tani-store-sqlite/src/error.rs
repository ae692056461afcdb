//! Error type for `tani-store-sqlite`.
//!
//! Domain outcomes (email taken, listing not found) are reported directly as
//! [`tani_core::Error`] variants by the store; this type covers the backend
//! failures underneath, and converts into the core error at the trait seam.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored row failed required-field validation on read.
  #[error("malformed {collection} document {id}: {reason}")]
  MalformedDocument {
    collection: &'static str,
    id:         String,
    reason:     String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for tani_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::MalformedDocument {
        collection,
        id,
        reason,
      } => Self::MalformedDocument {
        collection,
        id,
        reason,
      },
      other => Self::store(other),
    }
  }
}
