//! Seller-facing listing routes.
//!
//! All operations are scoped to the admitted seller. A listing owned by a
//! different seller is reported as not found rather than forbidden, so the
//! routes leak nothing about other sellers' inventory.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tani_core::{
  directory::Directory,
  listing::{FairPrice, Listing, ListingUpdate, NewListing},
  profile::PriceTier,
  store::{ListingQuery, MarketStore},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, guard::SellerAdmitted};

// ─── Own listings ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OwnListingsParams {
  pub tier: Option<PriceTier>,
}

/// `GET /api/seller/listings[?tier=normal|bulk]`
pub async fn list_own<D, S>(
  State(state): State<AppState<D, S>>,
  SellerAdmitted(_session, seller): SellerAdmitted,
  Query(params): Query<OwnListingsParams>,
) -> Result<Json<Vec<Listing>>, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  let query = ListingQuery {
    seller_id: Some(seller.subject_id),
    tier: params.tier,
    ..Default::default()
  };

  Ok(Json(state.store.listings(&query).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateListingBody {
  pub product_name: String,
  pub stock:        u32,
  pub harvest_date: NaiveDate,
  pub normal_price: Option<i64>,
  pub bulk_price:   Option<i64>,
}

/// `POST /api/seller/listings`
///
/// Creates one listing per supplied price tier, snapshotting the product's
/// current reference price for that tier. At least one tier price is
/// required.
pub async fn create<D, S>(
  State(state): State<AppState<D, S>>,
  SellerAdmitted(_session, seller): SellerAdmitted,
  Json(body): Json<CreateListingBody>,
) -> Result<impl IntoResponse, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  if body.product_name.trim().is_empty() {
    return Err(ApiError::Validation(
      "missing required field: product_name".to_string(),
    ));
  }
  if body.normal_price.is_none() && body.bulk_price.is_none() {
    return Err(ApiError::Validation(
      "at least one of normal_price or bulk_price is required".to_string(),
    ));
  }

  let fair = state.store.fair_price(&body.product_name).await?;

  let mut created = Vec::new();
  for (tier, price) in [
    (PriceTier::Normal, body.normal_price),
    (PriceTier::Bulk, body.bulk_price),
  ] {
    let Some(price) = price else { continue };

    let listing = state
      .store
      .insert_listing(NewListing {
        product_name: body.product_name.clone(),
        tier,
        price,
        fair_price: fair.as_ref().map(|f| f.for_tier(tier)),
        stock: body.stock,
        harvest_date: body.harvest_date,
        seller_id: seller.subject_id,
        seller_email: seller.email.clone(),
      })
      .await?;
    created.push(listing);
  }

  tracing::info!(
    seller = %seller.subject_id,
    product = %body.product_name,
    count = created.len(),
    "listings created"
  );
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Single listing ──────────────────────────────────────────────────────────

/// Fetch a listing and check it belongs to `seller_id`; foreign and missing
/// listings are indistinguishable to the caller.
async fn owned_listing<S>(
  store: &S,
  seller_id: Uuid,
  listing_id: Uuid,
) -> Result<Listing, ApiError>
where
  S: MarketStore,
{
  store
    .listing(listing_id)
    .await?
    .filter(|l| l.seller_id == seller_id)
    .ok_or_else(|| ApiError::NotFound(format!("listing {listing_id} not found")))
}

/// `GET /api/seller/listings/:id`
pub async fn get_one<D, S>(
  State(state): State<AppState<D, S>>,
  SellerAdmitted(_session, seller): SellerAdmitted,
  Path(id): Path<Uuid>,
) -> Result<Json<Listing>, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  let listing = owned_listing(state.store.as_ref(), seller.subject_id, id).await?;
  Ok(Json(listing))
}

/// `PUT /api/seller/listings/:id` — body: any of `price`, `stock`,
/// `harvest_date`.
pub async fn update<D, S>(
  State(state): State<AppState<D, S>>,
  SellerAdmitted(_session, seller): SellerAdmitted,
  Path(id): Path<Uuid>,
  Json(body): Json<ListingUpdate>,
) -> Result<Json<Listing>, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  owned_listing(state.store.as_ref(), seller.subject_id, id).await?;
  let updated = state.store.update_listing(id, body).await?;
  Ok(Json(updated))
}

/// `DELETE /api/seller/listings/:id`
pub async fn delete<D, S>(
  State(state): State<AppState<D, S>>,
  SellerAdmitted(_session, seller): SellerAdmitted,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  owned_listing(state.store.as_ref(), seller.subject_id, id).await?;
  state.store.delete_listing(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Reference prices ────────────────────────────────────────────────────────

/// `GET /api/seller/fair-prices/:product`
///
/// The reference prices consulted by the add-listing form. A product without
/// an entry is a 404, not a zero price.
pub async fn fair_price<D, S>(
  State(state): State<AppState<D, S>>,
  SellerAdmitted(_session, _seller): SellerAdmitted,
  Path(product): Path<String>,
) -> Result<Json<FairPrice>, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .fair_price(&product)
    .await?
    .map(Json)
    .ok_or_else(|| {
      ApiError::NotFound(format!("no reference price for {product:?}"))
    })
}
