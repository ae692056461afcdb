//! HTTP server for the Tani produce marketplace.
//!
//! Exposes an axum [`Router`] backed by any
//! [`Directory`](tani_core::directory::Directory) +
//! [`MarketStore`](tani_core::store::MarketStore) pair: password registration
//! with a compensating account delete, bearer-token login with role-based
//! redirect targets, and role-guarded catalog and seller routes.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod guard;
pub mod seller;
pub mod sessions;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tani_core::{directory::Directory, store::MarketStore};
use tower_http::trace::TraceLayer;

use sessions::SessionRegistry;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<D, S> {
  pub directory: Arc<D>,
  pub store:     Arc<S>,
  pub sessions:  Arc<SessionRegistry>,
  pub config:    Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the marketplace API.
pub fn router<D, S>(state: AppState<D, S>) -> Router
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/api/auth/register/buyer",  post(auth::register_buyer::<D, S>))
    .route("/api/auth/register/seller", post(auth::register_seller::<D, S>))
    .route("/api/auth/login",           post(auth::login::<D, S>))
    .route("/api/auth/logout",          post(auth::logout::<D, S>))
    .route("/api/auth/session",         get(auth::session_context::<D, S>))
    .route("/api/catalog",              get(catalog::browse::<D, S>))
    .route("/api/catalog/{id}",         get(catalog::detail::<D, S>))
    .route(
      "/api/seller/listings",
      get(seller::list_own::<D, S>).post(seller::create::<D, S>),
    )
    .route(
      "/api/seller/listings/{id}",
      get(seller::get_one::<D, S>)
        .put(seller::update::<D, S>)
        .delete(seller::delete::<D, S>),
    )
    .route(
      "/api/seller/fair-prices/{product}",
      get(seller::fair_price::<D, S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::atomic::{AtomicBool, Ordering};

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use tani_core::{
    listing::{FairPrice, Listing, ListingUpdate, NewListing},
    profile::{BuyerProfile, SellerProfile},
    session::Session,
    store::{ListingQuery, MarketStore},
  };
  use tani_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  fn test_config() -> Arc<ServerConfig> {
    Arc::new(ServerConfig {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from(":memory:"),
    })
  }

  async fn make_state() -> AppState<SqliteStore, SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState {
      directory: Arc::new(store.clone()),
      store:     Arc::new(store),
      sessions:  Arc::new(SessionRegistry::new()),
      config:    test_config(),
    }
  }

  async fn send<D, S>(
    state: AppState<D, S>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> axum::response::Response
  where
    D: Directory + Clone + Send + Sync + 'static,
    S: MarketStore + Clone + Send + Sync + 'static,
  {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder =
        builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    router(state).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn seller_body(email: &str) -> Value {
    json!({
      "email": email,
      "password": "hunter2",
      "national_id": "3201011234560001",
      "farmer_id": "F-0042",
    })
  }

  fn buyer_body(email: &str, tier: &str) -> Value {
    json!({
      "email": email,
      "password": "hunter2",
      "national_id": "3201019876540002",
      "business_registration": "8120000000001",
      "tier": tier,
    })
  }

  async fn register_seller<D, S>(state: &AppState<D, S>, email: &str)
  where
    D: Directory + Clone + Send + Sync + 'static,
    S: MarketStore + Clone + Send + Sync + 'static,
  {
    let resp = send(
      state.clone(),
      "POST",
      "/api/auth/register/seller",
      None,
      Some(seller_body(email)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  async fn register_buyer<D, S>(state: &AppState<D, S>, email: &str, tier: &str)
  where
    D: Directory + Clone + Send + Sync + 'static,
    S: MarketStore + Clone + Send + Sync + 'static,
  {
    let resp = send(
      state.clone(),
      "POST",
      "/api/auth/register/buyer",
      None,
      Some(buyer_body(email, tier)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  async fn login<D, S>(state: &AppState<D, S>, email: &str) -> String
  where
    D: Directory + Clone + Send + Sync + 'static,
    S: MarketStore + Clone + Send + Sync + 'static,
  {
    let resp = send(
      state.clone(),
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": email, "password": "hunter2" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    body["token"].as_str().unwrap().to_string()
  }

  fn location(resp: &axum::response::Response) -> &str {
    resp
      .headers()
      .get(header::LOCATION)
      .and_then(|v| v.to_str().ok())
      .unwrap_or("")
  }

  // ── Registration and login ──────────────────────────────────────────────

  #[tokio::test]
  async fn seller_login_redirects_to_dashboard() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;

    let resp = send(
      state,
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": "tono@example.com", "password": "hunter2" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["role"], "seller");
    assert_eq!(body["redirect"], "/seller/dashboard");
  }

  #[tokio::test]
  async fn buyer_login_redirects_to_catalog() {
    let state = make_state().await;
    register_buyer(&state, "sari@example.com", "normal").await;

    let resp = send(
      state,
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": "sari@example.com", "password": "hunter2" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["role"], "buyer");
    assert_eq!(body["redirect"], "/catalog");
  }

  #[tokio::test]
  async fn wrong_password_is_unauthorized() {
    let state = make_state().await;
    register_buyer(&state, "sari@example.com", "normal").await;

    let resp = send(
      state,
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": "sari@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn unknown_email_is_unauthorized() {
    let state = make_state().await;
    let resp = send(
      state,
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": "nobody@example.com", "password": "hunter2" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn registration_with_empty_field_is_rejected() {
    let state = make_state().await;
    let mut body = seller_body("tono@example.com");
    body["farmer_id"] = json!("");

    let resp = send(
      state,
      "POST",
      "/api/auth/register/seller",
      None,
      Some(body),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn duplicate_email_conflicts() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;

    let resp = send(
      state,
      "POST",
      "/api/auth/register/seller",
      None,
      Some(seller_body("tono@example.com")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn logout_revokes_the_token() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;
    let token = login(&state, "tono@example.com").await;

    let resp = send(
      state.clone(),
      "POST",
      "/api/auth/logout",
      Some(&token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(
      state,
      "GET",
      "/api/seller/listings",
      Some(&token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
  }

  #[tokio::test]
  async fn session_context_reports_the_resolved_role() {
    let state = make_state().await;
    register_buyer(&state, "sari@example.com", "bulk").await;
    let token = login(&state, "sari@example.com").await;

    let resp =
      send(state.clone(), "GET", "/api/auth/session", Some(&token), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["role"], "buyer");

    let resp = send(state, "GET", "/api/auth/session", None, None).await;
    let body = json_body(resp).await;
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["role"], Value::Null);
  }

  // ── Route guarding ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn unauthenticated_catalog_redirects_to_login() {
    let state = make_state().await;
    let resp = send(state, "GET", "/api/catalog", None, None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
  }

  #[tokio::test]
  async fn seller_browsing_catalog_is_sent_to_dashboard() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;
    let token = login(&state, "tono@example.com").await;

    let resp = send(state, "GET", "/api/catalog", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/seller/dashboard");
  }

  #[tokio::test]
  async fn buyer_hitting_seller_routes_is_sent_to_catalog() {
    let state = make_state().await;
    register_buyer(&state, "sari@example.com", "normal").await;
    let token = login(&state, "sari@example.com").await;

    let resp =
      send(state, "GET", "/api/seller/listings", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/catalog");
  }

  #[tokio::test]
  async fn profileless_session_is_sent_to_login() {
    let state = make_state().await;
    // A live session whose subject has no profile document at all.
    let token = state.sessions.issue(Session {
      subject_id:   Uuid::new_v4(),
      email:        "ghost@example.com".to_string(),
      display_name: None,
    });

    let resp = send(state, "GET", "/api/catalog", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
  }

  // ── Listings ────────────────────────────────────────────────────────────

  async fn create_listings<D, S>(
    state: &AppState<D, S>,
    token: &str,
    body: Value,
  ) -> Vec<Listing>
  where
    D: Directory + Clone + Send + Sync + 'static,
    S: MarketStore + Clone + Send + Sync + 'static,
  {
    let resp = send(
      state.clone(),
      "POST",
      "/api/seller/listings",
      Some(token),
      Some(body),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    serde_json::from_value(json_body(resp).await).unwrap()
  }

  #[tokio::test]
  async fn create_snapshots_fair_prices_per_tier() {
    let state = make_state().await;
    state
      .store
      .put_fair_price(FairPrice {
        product_name: "Rice".into(),
        normal:       12_500,
        bulk:         11_000,
      })
      .await
      .unwrap();

    register_seller(&state, "tono@example.com").await;
    let token = login(&state, "tono@example.com").await;

    let created = create_listings(
      &state,
      &token,
      json!({
        "product_name": "Rice",
        "stock": 40,
        "harvest_date": "2026-07-01",
        "normal_price": 13_000,
        "bulk_price": 11_500,
      }),
    )
    .await;

    assert_eq!(created.len(), 2);
    let normal = created.iter().find(|l| l.fair_price == Some(12_500));
    let bulk = created.iter().find(|l| l.fair_price == Some(11_000));
    assert!(normal.is_some() && bulk.is_some());
  }

  #[tokio::test]
  async fn create_without_a_reference_price_leaves_it_empty() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;
    let token = login(&state, "tono@example.com").await;

    let created = create_listings(
      &state,
      &token,
      json!({
        "product_name": "Durian",
        "stock": 5,
        "harvest_date": "2026-07-01",
        "normal_price": 90_000,
      }),
    )
    .await;

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].fair_price, None);
  }

  #[tokio::test]
  async fn create_requires_at_least_one_tier_price() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;
    let token = login(&state, "tono@example.com").await;

    let resp = send(
      state,
      "POST",
      "/api/seller/listings",
      Some(&token),
      Some(json!({
        "product_name": "Rice",
        "stock": 40,
        "harvest_date": "2026-07-01",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn catalog_is_filtered_by_buyer_tier() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;
    let seller_token = login(&state, "tono@example.com").await;
    create_listings(
      &state,
      &seller_token,
      json!({
        "product_name": "Rice",
        "stock": 40,
        "harvest_date": "2026-07-01",
        "normal_price": 13_000,
        "bulk_price": 11_500,
      }),
    )
    .await;

    register_buyer(&state, "sari@example.com", "bulk").await;
    let buyer_token = login(&state, "sari@example.com").await;

    let resp =
      send(state, "GET", "/api/catalog", Some(&buyer_token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listings: Vec<Listing> =
      serde_json::from_value(json_body(resp).await).unwrap();

    // The bulk buyer sees only the wholesale entry.
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].price, 11_500);
  }

  #[tokio::test]
  async fn catalog_detail_returns_the_listing() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;
    let seller_token = login(&state, "tono@example.com").await;
    let created = create_listings(
      &state,
      &seller_token,
      json!({
        "product_name": "Rice",
        "stock": 40,
        "harvest_date": "2026-07-01",
        "normal_price": 13_000,
      }),
    )
    .await;

    register_buyer(&state, "sari@example.com", "normal").await;
    let buyer_token = login(&state, "sari@example.com").await;

    let resp = send(
      state.clone(),
      "GET",
      &format!("/api/catalog/{}", created[0].listing_id),
      Some(&buyer_token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(
      state,
      "GET",
      &format!("/api/catalog/{}", Uuid::new_v4()),
      Some(&buyer_token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn seller_routes_hide_foreign_listings() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;
    let owner_token = login(&state, "tono@example.com").await;
    let created = create_listings(
      &state,
      &owner_token,
      json!({
        "product_name": "Rice",
        "stock": 40,
        "harvest_date": "2026-07-01",
        "normal_price": 13_000,
      }),
    )
    .await;
    let listing_id = created[0].listing_id;

    let resp = send(
      state.clone(),
      "POST",
      "/api/auth/register/seller",
      None,
      Some(json!({
        "email": "joko@example.com",
        "password": "hunter2",
        "national_id": "3201010000000003",
        "farmer_id": "F-0099",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let other_token = login(&state, "joko@example.com").await;

    for (method, body) in [
      ("GET", None),
      ("PUT", Some(json!({ "price": 1 }))),
      ("DELETE", None),
    ] {
      let resp = send(
        state.clone(),
        method,
        &format!("/api/seller/listings/{listing_id}"),
        Some(&other_token),
        body,
      )
      .await;
      assert_eq!(resp.status(), StatusCode::NOT_FOUND, "method {method}");
    }

    // The owner still sees it.
    let resp = send(
      state,
      "GET",
      &format!("/api/seller/listings/{listing_id}"),
      Some(&owner_token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn owner_updates_and_deletes_a_listing() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;
    let token = login(&state, "tono@example.com").await;
    let created = create_listings(
      &state,
      &token,
      json!({
        "product_name": "Rice",
        "stock": 40,
        "harvest_date": "2026-07-01",
        "normal_price": 13_000,
      }),
    )
    .await;
    let listing_id = created[0].listing_id;

    let resp = send(
      state.clone(),
      "PUT",
      &format!("/api/seller/listings/{listing_id}"),
      Some(&token),
      Some(json!({ "price": 14_000, "stock": 35 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Listing =
      serde_json::from_value(json_body(resp).await).unwrap();
    assert_eq!(updated.price, 14_000);
    assert_eq!(updated.stock, 35);

    let resp = send(
      state.clone(),
      "DELETE",
      &format!("/api/seller/listings/{listing_id}"),
      Some(&token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(
      state,
      "GET",
      &format!("/api/seller/listings/{listing_id}"),
      Some(&token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn fair_price_lookup_is_404_without_an_entry() {
    let state = make_state().await;
    register_seller(&state, "tono@example.com").await;
    let token = login(&state, "tono@example.com").await;

    let resp = send(
      state.clone(),
      "GET",
      "/api/seller/fair-prices/Durian",
      Some(&token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    state
      .store
      .put_fair_price(FairPrice {
        product_name: "Durian".into(),
        normal:       90_000,
        bulk:         80_000,
      })
      .await
      .unwrap();

    let resp = send(
      state,
      "GET",
      "/api/seller/fair-prices/Durian",
      Some(&token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["normal"], 90_000);
  }

  // ── Registration rollback ───────────────────────────────────────────────

  /// Delegates to an inner store, refusing the first seller-profile write.
  #[derive(Clone)]
  struct FlakyProfileStore {
    inner:     SqliteStore,
    fail_next: Arc<AtomicBool>,
  }

  impl MarketStore for FlakyProfileStore {
    async fn buyer_profile(
      &self,
      subject_id: Uuid,
    ) -> tani_core::Result<Option<BuyerProfile>> {
      self.inner.buyer_profile(subject_id).await
    }

    async fn seller_profile(
      &self,
      subject_id: Uuid,
    ) -> tani_core::Result<Option<SellerProfile>> {
      self.inner.seller_profile(subject_id).await
    }

    async fn put_buyer_profile(
      &self,
      profile: BuyerProfile,
    ) -> tani_core::Result<()> {
      self.inner.put_buyer_profile(profile).await
    }

    async fn put_seller_profile(
      &self,
      profile: SellerProfile,
    ) -> tani_core::Result<()> {
      if self.fail_next.swap(false, Ordering::SeqCst) {
        return Err(tani_core::Error::store(std::io::Error::other(
          "profile write refused",
        )));
      }
      self.inner.put_seller_profile(profile).await
    }

    async fn insert_listing(
      &self,
      input: NewListing,
    ) -> tani_core::Result<Listing> {
      self.inner.insert_listing(input).await
    }

    async fn listing(
      &self,
      listing_id: Uuid,
    ) -> tani_core::Result<Option<Listing>> {
      self.inner.listing(listing_id).await
    }

    async fn listings(
      &self,
      query: &ListingQuery,
    ) -> tani_core::Result<Vec<Listing>> {
      self.inner.listings(query).await
    }

    async fn update_listing(
      &self,
      listing_id: Uuid,
      update: ListingUpdate,
    ) -> tani_core::Result<Listing> {
      self.inner.update_listing(listing_id, update).await
    }

    async fn delete_listing(&self, listing_id: Uuid) -> tani_core::Result<()> {
      self.inner.delete_listing(listing_id).await
    }

    async fn fair_price(
      &self,
      product_name: &str,
    ) -> tani_core::Result<Option<FairPrice>> {
      self.inner.fair_price(product_name).await
    }

    async fn put_fair_price(&self, fair: FairPrice) -> tani_core::Result<()> {
      self.inner.put_fair_price(fair).await
    }
  }

  #[tokio::test]
  async fn failed_profile_write_rolls_back_the_account() {
    let sqlite = SqliteStore::open_in_memory().await.unwrap();
    let state = AppState {
      directory: Arc::new(sqlite.clone()),
      store:     Arc::new(FlakyProfileStore {
        inner:     sqlite.clone(),
        fail_next: Arc::new(AtomicBool::new(true)),
      }),
      sessions:  Arc::new(SessionRegistry::new()),
      config:    test_config(),
    };

    let resp = send(
      state.clone(),
      "POST",
      "/api/auth/register/seller",
      None,
      Some(seller_body("dewi@example.com")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    // The compensating delete freed the email.
    assert!(
      sqlite
        .account_by_email("dewi@example.com")
        .await
        .unwrap()
        .is_none()
    );

    // Retrying the same address now succeeds end to end.
    let resp = send(
      state.clone(),
      "POST",
      "/api/auth/register/seller",
      None,
      Some(seller_body("dewi@example.com")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let token = login(&state, "dewi@example.com").await;

    let resp =
      send(state, "GET", "/api/seller/listings", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
