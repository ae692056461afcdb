//! Session types and the shared session-state publisher.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

/// The live authentication state for one subject, as issued by the identity
/// layer. Observed by guards, never mutated by them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub subject_id:   Uuid,
  pub email:        String,
  pub display_name: Option<String>,
}

/// What the identity layer currently reports.
///
/// `Unknown` covers the interval before the first report has arrived.
/// Observers must not confuse it with `SignedOut`: nothing is admitted and
/// nothing is redirected until the state is known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
  #[default]
  Unknown,
  SignedOut,
  SignedIn(Session),
}

impl SessionState {
  pub fn session(&self) -> Option<&Session> {
    match self {
      Self::SignedIn(s) => Some(s),
      _ => None,
    }
  }
}

// ─── Publisher ───────────────────────────────────────────────────────────────

/// The single session-state publisher all route guards subscribe to.
///
/// One hub exists per observed identity. Every guard shares it instead of
/// re-subscribing to the raw provider, so a sign-in or sign-out is reported
/// once and fans out. Dropping a receiver ends that observation.
#[derive(Debug, Clone)]
pub struct SessionHub {
  tx: watch::Sender<SessionState>,
}

impl SessionHub {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(SessionState::Unknown);
    Self { tx }
  }

  /// Subscribe to session-state changes. The receiver immediately holds the
  /// most recently published state.
  pub fn subscribe(&self) -> watch::Receiver<SessionState> {
    self.tx.subscribe()
  }

  pub fn signed_in(&self, session: Session) {
    self.tx.send_replace(SessionState::SignedIn(session));
  }

  pub fn signed_out(&self) {
    self.tx.send_replace(SessionState::SignedOut);
  }

  /// The most recently published state.
  pub fn current(&self) -> SessionState {
    self.tx.borrow().clone()
  }
}

impl Default for SessionHub {
  fn default() -> Self {
    Self::new()
  }
}
