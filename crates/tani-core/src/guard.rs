//! Route guarding: the per-mount admission state machine.
//!
//! A guard instance is created for each protected screen mount. It subscribes
//! to the session publisher, resolves the subject's role once a session is
//! reported, and either admits or emits a single redirect. Instances are
//! single-use; a remount constructs a fresh guard.

use tokio::sync::watch;

use crate::{
  Error, resolver,
  profile::{Profile, Role},
  session::{Session, SessionState},
  store::MarketStore,
};

// ─── Redirect targets ────────────────────────────────────────────────────────

/// Where a rejected subject is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
  Login,
  BuyerCatalog,
  SellerDashboard,
}

impl RedirectTarget {
  pub fn path(self) -> &'static str {
    match self {
      Self::Login => "/login",
      Self::BuyerCatalog => "/catalog",
      Self::SellerDashboard => "/seller/dashboard",
    }
  }

  /// The home screen for a subject's actual role; no role means login.
  pub fn home(role: Option<Role>) -> Self {
    match role {
      Some(Role::Buyer) => Self::BuyerCatalog,
      Some(Role::Seller) => Self::SellerDashboard,
      None => Self::Login,
    }
  }
}

// ─── State machine ───────────────────────────────────────────────────────────

/// The guard's lifecycle. `Admitted` and `Redirecting` are terminal for the
/// instance.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
  Initializing,
  AwaitingSession,
  ResolvingRole(Session),
  Admitted(Session, Option<Profile>),
  Redirecting(RedirectTarget),
}

impl GuardState {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Admitted(..) | Self::Redirecting(_))
  }
}

/// Admission state machine for one protected screen mount.
///
/// Drive it directly with [`RouteGuard::subscribe`],
/// [`RouteGuard::on_session`], and [`RouteGuard::on_resolution`], or let
/// [`admission`] drive it from a session subscription. Terminal states latch:
/// reports arriving after admission or redirect are ignored, and the redirect
/// side effect is handed out at most once.
#[derive(Debug)]
pub struct RouteGuard {
  required: Option<Role>,
  state:    GuardState,
  emitted:  bool,
}

impl RouteGuard {
  /// A guard for a screen requiring `required`. `None` admits any signed-in
  /// subject without a role lookup.
  pub fn new(required: Option<Role>) -> Self {
    Self {
      required,
      state: GuardState::Initializing,
      emitted: false,
    }
  }

  pub fn required_role(&self) -> Option<Role> {
    self.required
  }

  pub fn state(&self) -> &GuardState {
    &self.state
  }

  /// Transition out of `Initializing` once the session subscription is live.
  pub fn subscribe(&mut self) -> &GuardState {
    if matches!(self.state, GuardState::Initializing) {
      self.state = GuardState::AwaitingSession;
    }
    &self.state
  }

  /// Feed a session report. `Unknown` keeps the guard waiting; the first
  /// definite report decides whether role resolution starts.
  pub fn on_session(&mut self, report: &SessionState) -> &GuardState {
    if !matches!(self.state, GuardState::AwaitingSession) {
      return &self.state;
    }
    match report {
      SessionState::Unknown => {}
      SessionState::SignedOut => {
        self.state = GuardState::Redirecting(RedirectTarget::Login);
      }
      SessionState::SignedIn(session) => {
        self.state = GuardState::ResolvingRole(session.clone());
      }
    }
    &self.state
  }

  /// Feed the outcome of role resolution.
  ///
  /// A resolution failure always redirects to login — it is never folded
  /// into "no role". A mismatch redirects to the subject's actual home.
  pub fn on_resolution(
    &mut self,
    outcome: Result<Option<Profile>, Error>,
  ) -> &GuardState {
    let GuardState::ResolvingRole(session) = &self.state else {
      return &self.state;
    };
    let session = session.clone();

    self.state = match outcome {
      Err(_) => GuardState::Redirecting(RedirectTarget::Login),
      Ok(profile) => match self.required {
        None => GuardState::Admitted(session, profile),
        Some(required) => {
          let actual = profile.as_ref().map(Profile::role);
          if actual == Some(required) {
            GuardState::Admitted(session, profile)
          } else {
            GuardState::Redirecting(RedirectTarget::home(actual))
          }
        }
      },
    };
    &self.state
  }

  /// Hand out the redirect side effect. Yields `Some` at most once per guard
  /// instance.
  pub fn take_redirect(&mut self) -> Option<RedirectTarget> {
    match (&self.state, self.emitted) {
      (GuardState::Redirecting(target), false) => {
        self.emitted = true;
        Some(*target)
      }
      _ => None,
    }
  }
}

// ─── Admission driver ────────────────────────────────────────────────────────

/// Terminal outcome of [`admission`].
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
  Admitted(Session, Option<Profile>),
  Redirect(RedirectTarget),
}

/// Drive a [`RouteGuard`] from a session subscription until it settles.
///
/// Waits out `Unknown`, resolves the role once a session is reported, and
/// returns the terminal outcome. Dropping or aborting the returned future is
/// "unmount": the subscription ends with the receiver, and a resolution still
/// in flight is discarded without any state update or redirect.
pub async fn admission<S: MarketStore>(
  mut sessions: watch::Receiver<SessionState>,
  store: &S,
  required: Option<Role>,
) -> Admission {
  let mut guard = RouteGuard::new(required);
  guard.subscribe();

  loop {
    let report = sessions.borrow_and_update().clone();
    guard.on_session(&report);

    match guard.state().clone() {
      GuardState::Initializing | GuardState::AwaitingSession => {
        // Publisher has not reported yet; wait for the next change. A closed
        // channel means the publisher is gone, which reads as signed out.
        if sessions.changed().await.is_err() {
          guard.on_session(&SessionState::SignedOut);
        }
      }
      GuardState::ResolvingRole(session) => {
        let outcome = if guard.required_role().is_none() {
          Ok(None)
        } else {
          resolver::resolve(store, session.subject_id).await
        };
        guard.on_resolution(outcome);
      }
      GuardState::Admitted(session, profile) => {
        return Admission::Admitted(session, profile);
      }
      GuardState::Redirecting(target) => {
        guard.take_redirect();
        return Admission::Redirect(target);
      }
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use uuid::Uuid;

  use super::{Admission, GuardState, RedirectTarget, RouteGuard, admission};
  use crate::{
    Error,
    profile::Role,
    session::{Session, SessionHub, SessionState},
    teststore::StubStore,
  };

  fn session(subject_id: Uuid) -> Session {
    Session {
      subject_id,
      email: "subject@example.com".to_string(),
      display_name: None,
    }
  }

  // ── Machine transitions ─────────────────────────────────────────────────

  #[test]
  fn subscribe_leaves_initializing() {
    let mut guard = RouteGuard::new(Some(Role::Buyer));
    assert_eq!(*guard.state(), GuardState::Initializing);
    guard.subscribe();
    assert_eq!(*guard.state(), GuardState::AwaitingSession);
  }

  #[test]
  fn unknown_report_keeps_waiting() {
    let mut guard = RouteGuard::new(Some(Role::Buyer));
    guard.subscribe();
    guard.on_session(&SessionState::Unknown);
    assert_eq!(*guard.state(), GuardState::AwaitingSession);
    assert_eq!(guard.take_redirect(), None);
  }

  #[test]
  fn signed_out_redirects_to_login_exactly_once() {
    let mut guard = RouteGuard::new(Some(Role::Buyer));
    guard.subscribe();
    guard.on_session(&SessionState::SignedOut);

    assert_eq!(guard.take_redirect(), Some(RedirectTarget::Login));
    // The side effect is single-shot.
    assert_eq!(guard.take_redirect(), None);
  }

  #[test]
  fn resolution_failure_redirects_to_login() {
    let mut guard = RouteGuard::new(Some(Role::Buyer));
    guard.subscribe();
    guard.on_session(&SessionState::SignedIn(session(Uuid::new_v4())));
    guard.on_resolution(Err(Error::store(std::io::Error::other("offline"))));

    assert_eq!(guard.take_redirect(), Some(RedirectTarget::Login));
  }

  #[test]
  fn terminal_state_ignores_later_reports() {
    let subject = Uuid::new_v4();
    let mut guard = RouteGuard::new(None);
    guard.subscribe();
    guard.on_session(&SessionState::SignedIn(session(subject)));
    guard.on_resolution(Ok(None));
    assert!(matches!(guard.state(), GuardState::Admitted(..)));

    // A sign-out arriving after admission does not restart the machine.
    guard.on_session(&SessionState::SignedOut);
    assert!(matches!(guard.state(), GuardState::Admitted(..)));
    assert_eq!(guard.take_redirect(), None);
  }

  // ── Admission driver ────────────────────────────────────────────────────

  #[tokio::test]
  async fn no_session_redirects_to_login() {
    let hub = SessionHub::new();
    hub.signed_out();
    let store = StubStore::default();

    let outcome = admission(hub.subscribe(), &store, Some(Role::Buyer)).await;
    assert_eq!(outcome, Admission::Redirect(RedirectTarget::Login));
  }

  #[tokio::test]
  async fn matching_role_is_admitted() {
    let subject = Uuid::new_v4();
    let hub = SessionHub::new();
    hub.signed_in(session(subject));
    let store = StubStore::default().with_buyer(subject);

    let outcome = admission(hub.subscribe(), &store, Some(Role::Buyer)).await;
    match outcome {
      Admission::Admitted(s, Some(profile)) => {
        assert_eq!(s.subject_id, subject);
        assert_eq!(profile.role(), Role::Buyer);
      }
      other => panic!("expected admission, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn no_required_role_admits_without_lookups() {
    let subject = Uuid::new_v4();
    let hub = SessionHub::new();
    hub.signed_in(session(subject));
    let store = StubStore::default();

    let outcome = admission(hub.subscribe(), &store, None).await;
    assert!(matches!(outcome, Admission::Admitted(_, None)));
    assert_eq!(store.lookups(), 0);
  }

  #[tokio::test]
  async fn seller_on_buyer_screen_goes_to_dashboard() {
    let subject = Uuid::new_v4();
    let hub = SessionHub::new();
    hub.signed_in(session(subject));
    let store = StubStore::default().with_seller(subject);

    let outcome = admission(hub.subscribe(), &store, Some(Role::Buyer)).await;
    assert_eq!(outcome, Admission::Redirect(RedirectTarget::SellerDashboard));
  }

  #[tokio::test]
  async fn buyer_on_seller_screen_goes_to_catalog() {
    let subject = Uuid::new_v4();
    let hub = SessionHub::new();
    hub.signed_in(session(subject));
    let store = StubStore::default().with_buyer(subject);

    let outcome = admission(hub.subscribe(), &store, Some(Role::Seller)).await;
    assert_eq!(outcome, Admission::Redirect(RedirectTarget::BuyerCatalog));
  }

  #[tokio::test]
  async fn profileless_subject_goes_to_login() {
    let hub = SessionHub::new();
    hub.signed_in(session(Uuid::new_v4()));
    let store = StubStore::default();

    let outcome = admission(hub.subscribe(), &store, Some(Role::Seller)).await;
    assert_eq!(outcome, Admission::Redirect(RedirectTarget::Login));
  }

  #[tokio::test]
  async fn lookup_failure_goes_to_login_not_a_default_role() {
    let hub = SessionHub::new();
    hub.signed_in(session(Uuid::new_v4()));
    let store = StubStore::default().failing();

    let outcome = admission(hub.subscribe(), &store, Some(Role::Buyer)).await;
    assert_eq!(outcome, Admission::Redirect(RedirectTarget::Login));
  }

  #[tokio::test]
  async fn waits_out_unknown_session_state() {
    let subject = Uuid::new_v4();
    let hub = SessionHub::new();
    let store = Arc::new(StubStore::default().with_buyer(subject));

    let rx = hub.subscribe();
    let task = {
      let store = Arc::clone(&store);
      tokio::spawn(async move {
        admission(rx, store.as_ref(), Some(Role::Buyer)).await
      })
    };

    // Nothing has been reported yet; the guard must not have settled.
    hub.signed_in(session(subject));
    let outcome = task.await.unwrap();
    assert!(matches!(outcome, Admission::Admitted(..)));
  }

  #[tokio::test]
  async fn dropped_publisher_reads_as_signed_out() {
    let hub = SessionHub::new();
    let rx = hub.subscribe();
    drop(hub);
    let store = StubStore::default();

    let outcome = admission(rx, &store, Some(Role::Buyer)).await;
    assert_eq!(outcome, Admission::Redirect(RedirectTarget::Login));
  }

  #[tokio::test]
  async fn unmount_discards_in_flight_resolution() {
    let subject = Uuid::new_v4();
    let hub = SessionHub::new();
    hub.signed_in(session(subject));
    let store = Arc::new(StubStore::default().with_buyer(subject).gated());

    let rx = hub.subscribe();
    let task = {
      let store = Arc::clone(&store);
      tokio::spawn(async move {
        admission(rx, store.as_ref(), Some(Role::Buyer)).await
      })
    };

    // Wait until the lookup is parked inside the store, then unmount.
    store.entered.notified().await;
    task.abort();
    let joined = task.await;
    assert!(joined.unwrap_err().is_cancelled());

    // Releasing the store afterwards must not complete the discarded lookup.
    store.release();
    tokio::task::yield_now().await;
    assert_eq!(store.lookups(), 0);
  }
}
