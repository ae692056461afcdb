//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Store failures map to `502` — the document store is an upstream
/// collaborator, and its unavailability is never folded into a "not found"
/// or default-role answer.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("not signed in")]
  Unauthorized,

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("{0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<tani_core::Error> for ApiError {
  fn from(e: tani_core::Error) -> Self {
    match e {
      tani_core::Error::EmailTaken(email) => ApiError::EmailTaken(email),
      tani_core::Error::AccountNotFound(id) => {
        ApiError::NotFound(format!("account {id} not found"))
      }
      tani_core::Error::ListingNotFound(id) => {
        ApiError::NotFound(format!("listing {id} not found"))
      }
      other => ApiError::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::InvalidCredentials | ApiError::Unauthorized => {
        StatusCode::UNAUTHORIZED
      }
      ApiError::EmailTaken(_) => StatusCode::CONFLICT,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Store(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
