//! The identity provider's account directory.
//!
//! Accounts hold credentials and nothing else. Everything role-specific
//! lives in the profile collections; see [`crate::profile`].

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// A password account. `password_hash` is an argon2 PHC string; plaintext
/// never crosses this seam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub subject_id:    Uuid,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`Directory::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:         String,
  pub password_hash: String,
}

/// Abstraction over the identity provider's account storage.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait Directory: Send + Sync {
  /// Create an account. Fails with [`crate::Error::EmailTaken`] if the email
  /// is already registered.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account>> + Send + '_;

  /// Retrieve an account by subject id. Returns `None` if not found.
  fn account(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>>> + Send + '_;

  /// Retrieve an account by email address (case-insensitive).
  fn account_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>>> + Send + 'a;

  /// Delete an account.
  ///
  /// This is the compensating action taken when a profile write fails after
  /// account creation succeeded: the email must be free for a retry. Fails
  /// with [`crate::Error::AccountNotFound`] if the account does not exist.
  fn delete_account(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}
