//! In-process bearer-token sessions.

use std::{
  collections::HashMap,
  sync::{PoisonError, RwLock},
};

use axum::http::{HeaderMap, header};
use tani_core::session::Session;
use uuid::Uuid;

/// Issued bearer tokens and their live sessions.
///
/// Tokens are opaque UUIDs. A session lives until its token is revoked; there
/// is no server-side expiry.
pub struct SessionRegistry {
  inner: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
  pub fn new() -> Self {
    Self {
      inner: RwLock::new(HashMap::new()),
    }
  }

  /// Issue a fresh token for `session`.
  pub fn issue(&self, session: Session) -> String {
    let token = Uuid::new_v4().hyphenated().to_string();
    self
      .inner
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(token.clone(), session);
    token
  }

  pub fn get(&self, token: &str) -> Option<Session> {
    self
      .inner
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(token)
      .cloned()
  }

  /// Revoke a token. Returns whether it was live; revoking an unknown token
  /// is a no-op.
  pub fn revoke(&self, token: &str) -> bool {
    self
      .inner
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(token)
      .is_some()
  }
}

impl Default for SessionRegistry {
  fn default() -> Self {
    Self::new()
  }
}

/// The bearer token from an `Authorization` header, if any.
pub fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
}
