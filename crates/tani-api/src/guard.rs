//! Admission extractors — the HTTP rendition of the route guard.
//!
//! Each extractor drives one fresh [`RouteGuard`] instance for its request,
//! with the bearer session as the session report. A rejected request is
//! answered with `303 See Other` and a `Location` header pointing at the
//! guard's redirect target; no protected body is produced in any state other
//! than admission.

use axum::{
  extract::FromRequestParts,
  http::{HeaderValue, StatusCode, header, request::Parts},
  response::{IntoResponse, Response},
};
use tani_core::{
  directory::Directory,
  guard::{GuardState, RedirectTarget, RouteGuard},
  profile::{BuyerProfile, Profile, Role, SellerProfile},
  resolver,
  session::{Session, SessionState},
  store::MarketStore,
};

use crate::{AppState, sessions};

// ─── Rejection ───────────────────────────────────────────────────────────────

/// Rejection carrying the guard's redirect.
#[derive(Debug)]
pub struct GuardRedirect(pub RedirectTarget);

impl IntoResponse for GuardRedirect {
  fn into_response(self) -> Response {
    let mut res = StatusCode::SEE_OTHER.into_response();
    res
      .headers_mut()
      .insert(header::LOCATION, HeaderValue::from_static(self.0.path()));
    res
  }
}

// ─── Shared admission flow ───────────────────────────────────────────────────

/// Drive a fresh guard for this request.
async fn admit<D, S>(
  parts: &Parts,
  state: &AppState<D, S>,
  required: Role,
) -> Result<(Session, Option<Profile>), GuardRedirect>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  let report =
    match sessions::bearer(&parts.headers).and_then(|t| state.sessions.get(t))
    {
      Some(session) => SessionState::SignedIn(session),
      None => SessionState::SignedOut,
    };

  let mut guard = RouteGuard::new(Some(required));
  guard.subscribe();
  guard.on_session(&report);

  if let GuardState::ResolvingRole(session) = guard.state().clone() {
    let outcome = resolver::resolve(state.store.as_ref(), session.subject_id).await;
    if let Err(e) = &outcome {
      tracing::warn!(
        subject = %session.subject_id,
        error = %e,
        "role resolution failed"
      );
    }
    guard.on_resolution(outcome);
  }

  match guard.state().clone() {
    GuardState::Admitted(session, profile) => Ok((session, profile)),
    _ => Err(GuardRedirect(
      guard.take_redirect().unwrap_or(RedirectTarget::Login),
    )),
  }
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// Present in a handler once the subject has resolved as a buyer.
pub struct BuyerAdmitted(pub Session, pub BuyerProfile);

impl<D, S> FromRequestParts<AppState<D, S>> for BuyerAdmitted
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  type Rejection = GuardRedirect;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<D, S>,
  ) -> Result<Self, Self::Rejection> {
    let (session, profile) = admit(parts, state, Role::Buyer).await?;
    match profile {
      Some(Profile::Buyer(buyer)) => Ok(BuyerAdmitted(session, buyer)),
      // The machine admits only on a matching role; anything else here is a
      // guard bug, handled as a plain rejection.
      _ => Err(GuardRedirect(RedirectTarget::Login)),
    }
  }
}

/// Present in a handler once the subject has resolved as a seller.
pub struct SellerAdmitted(pub Session, pub SellerProfile);

impl<D, S> FromRequestParts<AppState<D, S>> for SellerAdmitted
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  type Rejection = GuardRedirect;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<D, S>,
  ) -> Result<Self, Self::Rejection> {
    let (session, profile) = admit(parts, state, Role::Seller).await?;
    match profile {
      Some(Profile::Seller(seller)) => Ok(SellerAdmitted(session, seller)),
      _ => Err(GuardRedirect(RedirectTarget::Login)),
    }
  }
}
