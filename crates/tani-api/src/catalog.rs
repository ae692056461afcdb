//! Buyer-facing catalog routes.
//!
//! The browse query is pinned to the admitted buyer's price tier: a bulk
//! buyer sees wholesale listings, a normal buyer per-unit listings. The tier
//! comes from the validated profile, never from a request parameter.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use tani_core::{
  directory::Directory,
  listing::Listing,
  store::{ListingQuery, MarketStore},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, guard::BuyerAdmitted};

#[derive(Debug, Deserialize)]
pub struct BrowseParams {
  pub product_name: Option<String>,
  pub min_price:    Option<i64>,
  pub max_price:    Option<i64>,
}

/// `GET /api/catalog[?product_name=&min_price=&max_price=]`
pub async fn browse<D, S>(
  State(state): State<AppState<D, S>>,
  BuyerAdmitted(_session, buyer): BuyerAdmitted,
  Query(params): Query<BrowseParams>,
) -> Result<Json<Vec<Listing>>, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  let query = ListingQuery {
    tier: Some(buyer.tier),
    product_name: params.product_name,
    min_price: params.min_price,
    max_price: params.max_price,
    ..Default::default()
  };

  Ok(Json(state.store.listings(&query).await?))
}

/// `GET /api/catalog/:id`
pub async fn detail<D, S>(
  State(state): State<AppState<D, S>>,
  BuyerAdmitted(_session, _buyer): BuyerAdmitted,
  Path(id): Path<Uuid>,
) -> Result<Json<Listing>, ApiError>
where
  D: Directory + Clone + Send + Sync + 'static,
  S: MarketStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .listing(id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("listing {id} not found")))
}
