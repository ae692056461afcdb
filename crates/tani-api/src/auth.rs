//! Authentication routes: registration, login, logout, session context.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/auth/register/buyer` | Writes a buyer profile |
//! | `POST` | `/api/auth/register/seller` | Writes a seller profile |
//! | `POST` | `/api/auth/login` | Returns token, role, and role home |
//! | `POST` | `/api/auth/logout` | Revokes the bearer token |
//! | `GET`  | `/api/auth/session` | Session context incl. resolved role |

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use chrono::Utc;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tani_core::{
  directory::{Directory, NewAccount},
  guard::RedirectTarget,
  profile::{BuyerProfile, PriceTier, Role, SellerProfile},
  resolver,
  session::Session,
  store::MarketStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, sessions};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn require(field: &'static str, value: &str) -> Result<(), ApiError> {
  if value.trim().is_empty() {
    return Err(ApiError::Validation(format!(
      "missing required field: {field}"
    )));
  }
  Ok(())
}

fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

// ─── Registration ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBuyerBody {
  pub email:                 String,
  pub password:              String,
  pub national_id:           String,
  pub business_registration: String,
  pub tier:                  PriceTier,
}

#[derive(Debug, Deserialize)]
pub struct RegisterSellerBody {
  pub email:       String,
  pub password:    String,
  pub national_id: String,
  pub farmer_id:   String,
}

#[derive(Debug, Serialize)]
pub struct Registered {
  pub subject_id: Uuid,
}

/// `POST /api/auth/register/buyer`
///
/// Creates the account, then writes the buyer profile. Registration does not
/// sign the subject in.
pub async fn register_buyer<D, S>(
  State(state): State<AppState<D, S>>,
  Json(body): Json<RegisterBuyerBody>,
) -> Result<impl IntoResponse, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  require("email", &body.email)?;
  require("password", &body.password)?;
  require("national_id", &body.national_id)?;
  require("business_registration", &body.business_registration)?;

  let hash = hash_password(&body.password)?;
  let account = state
    .directory
    .create_account(NewAccount {
      email:         body.email.clone(),
      password_hash: hash,
    })
    .await?;

  let profile = BuyerProfile {
    subject_id: account.subject_id,
    national_id: body.national_id,
    business_registration: body.business_registration,
    tier: body.tier,
    email: body.email,
    created_at: Utc::now(),
  };

  if let Err(e) = state.store.put_buyer_profile(profile).await {
    roll_back_account(state.directory.as_ref(), account.subject_id, &e).await;
    return Err(e.into());
  }

  tracing::info!(subject = %account.subject_id, "buyer registered");
  Ok((
    StatusCode::CREATED,
    Json(Registered {
      subject_id: account.subject_id,
    }),
  ))
}

/// `POST /api/auth/register/seller`
pub async fn register_seller<D, S>(
  State(state): State<AppState<D, S>>,
  Json(body): Json<RegisterSellerBody>,
) -> Result<impl IntoResponse, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  require("email", &body.email)?;
  require("password", &body.password)?;
  require("national_id", &body.national_id)?;
  require("farmer_id", &body.farmer_id)?;

  let hash = hash_password(&body.password)?;
  let account = state
    .directory
    .create_account(NewAccount {
      email:         body.email.clone(),
      password_hash: hash,
    })
    .await?;

  let profile = SellerProfile {
    subject_id:  account.subject_id,
    national_id: body.national_id,
    farmer_id:   body.farmer_id,
    email:       body.email,
    created_at:  Utc::now(),
  };

  if let Err(e) = state.store.put_seller_profile(profile).await {
    roll_back_account(state.directory.as_ref(), account.subject_id, &e).await;
    return Err(e.into());
  }

  tracing::info!(subject = %account.subject_id, "seller registered");
  Ok((
    StatusCode::CREATED,
    Json(Registered {
      subject_id: account.subject_id,
    }),
  ))
}

/// Delete the account created moments ago. An account without a profile
/// would resolve to no role and block the email from ever retrying.
async fn roll_back_account<D: Directory>(
  directory: &D,
  subject_id: Uuid,
  cause: &tani_core::Error,
) {
  tracing::warn!(
    subject = %subject_id,
    error = %cause,
    "profile write failed; deleting the just-created account"
  );
  if let Err(e) = directory.delete_account(subject_id).await {
    tracing::error!(
      subject = %subject_id,
      error = %e,
      "compensating account delete failed"
    );
  }
}

// ─── Login / logout ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoggedIn {
  pub token:      String,
  pub subject_id: Uuid,
  pub role:       Option<Role>,
  /// The role home the client should navigate to.
  pub redirect:   &'static str,
}

/// `POST /api/auth/login`
///
/// Verifies the password, issues a bearer token, and resolves the subject's
/// role once — screens read the result instead of re-deriving it. A failed
/// resolution is a store error, not a default role.
pub async fn login<D, S>(
  State(state): State<AppState<D, S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<LoggedIn>, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  require("email", &body.email)?;
  require("password", &body.password)?;

  let account = state
    .directory
    .account_by_email(&body.email)
    .await?
    .ok_or(ApiError::InvalidCredentials)?;

  let parsed = PasswordHash::new(&account.password_hash)
    .map_err(|_| ApiError::InvalidCredentials)?;
  Argon2::default()
    .verify_password(body.password.as_bytes(), &parsed)
    .map_err(|_| ApiError::InvalidCredentials)?;

  let role = resolver::resolve_role(state.store.as_ref(), account.subject_id)
    .await?;

  let session = Session {
    subject_id:   account.subject_id,
    email:        account.email.clone(),
    display_name: None,
  };
  let token = state.sessions.issue(session);

  Ok(Json(LoggedIn {
    token,
    subject_id: account.subject_id,
    role,
    redirect: RedirectTarget::home(role).path(),
  }))
}

/// `POST /api/auth/logout`
pub async fn logout<D, S>(
  State(state): State<AppState<D, S>>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  let token = sessions::bearer(&headers).ok_or(ApiError::Unauthorized)?;
  state.sessions.revoke(token);
  Ok(StatusCode::NO_CONTENT)
}

// ─── Session context ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SessionContext {
  pub authenticated: bool,
  pub subject_id:    Option<Uuid>,
  pub email:         Option<String>,
  pub role:          Option<Role>,
}

/// `GET /api/auth/session`
///
/// The one canonical place clients query the session and its resolved role.
/// An absent session is a clean unauthenticated context, never an error.
pub async fn session_context<D, S>(
  State(state): State<AppState<D, S>>,
  headers: HeaderMap,
) -> Result<Json<SessionContext>, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  let session = sessions::bearer(&headers).and_then(|t| state.sessions.get(t));

  let context = match session {
    None => SessionContext {
      authenticated: false,
      subject_id:    None,
      email:         None,
      role:          None,
    },
    Some(s) => {
      let role =
        resolver::resolve_role(state.store.as_ref(), s.subject_id).await?;
      SessionContext {
        authenticated: true,
        subject_id:    Some(s.subject_id),
        email:         Some(s.email),
        role,
      }
    }
  };

  Ok(Json(context))
}
