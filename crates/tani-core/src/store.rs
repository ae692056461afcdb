//! The `MarketStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `tani-store-sqlite`)
//! standing in for the hosted document store. Higher layers (`tani-api`)
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Result,
  listing::{FairPrice, Listing, ListingUpdate, NewListing},
  profile::{BuyerProfile, PriceTier, SellerProfile},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`MarketStore::listings`].
#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
  /// Restrict to one price tier (a buyer browses exactly their own).
  pub tier:         Option<PriceTier>,
  /// Restrict to listings owned by one seller.
  pub seller_id:    Option<Uuid>,
  /// Case-insensitive substring match on the product name.
  pub product_name: Option<String>,
  pub min_price:    Option<i64>,
  pub max_price:    Option<i64>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the marketplace document store.
///
/// Profile reads return `Ok(None)` for a clean miss and `Err` when the store
/// could not answer; the role resolver depends on that distinction.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait MarketStore: Send + Sync {
  // ── Profiles ──────────────────────────────────────────────────────────

  /// Retrieve the buyer profile for a subject, if one exists.
  fn buyer_profile(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<BuyerProfile>>> + Send + '_;

  /// Retrieve the seller profile for a subject, if one exists.
  fn seller_profile(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<SellerProfile>>> + Send + '_;

  /// Write a buyer profile document, keyed by its subject id.
  fn put_buyer_profile(
    &self,
    profile: BuyerProfile,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Write a seller profile document, keyed by its subject id.
  fn put_seller_profile(
    &self,
    profile: SellerProfile,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Listings ──────────────────────────────────────────────────────────

  /// Persist a new listing and return it with its assigned id and
  /// timestamps.
  fn insert_listing(
    &self,
    input: NewListing,
  ) -> impl Future<Output = Result<Listing>> + Send + '_;

  /// Retrieve a listing by id. Returns `None` if not found.
  fn listing(
    &self,
    listing_id: Uuid,
  ) -> impl Future<Output = Result<Option<Listing>>> + Send + '_;

  /// List listings matching `query`, newest first.
  fn listings<'a>(
    &'a self,
    query: &'a ListingQuery,
  ) -> impl Future<Output = Result<Vec<Listing>>> + Send + 'a;

  /// Apply a partial update and return the updated listing. Fails with
  /// [`crate::Error::ListingNotFound`] if the listing does not exist.
  fn update_listing(
    &self,
    listing_id: Uuid,
    update: ListingUpdate,
  ) -> impl Future<Output = Result<Listing>> + Send + '_;

  /// Delete a listing. Fails with [`crate::Error::ListingNotFound`] if the
  /// listing does not exist.
  fn delete_listing(
    &self,
    listing_id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Reference prices ──────────────────────────────────────────────────

  /// The pre-populated reference prices for a product, if any.
  fn fair_price<'a>(
    &'a self,
    product_name: &'a str,
  ) -> impl Future<Output = Result<Option<FairPrice>>> + Send + 'a;

  /// Insert or replace a product's reference prices (seeding/ops path).
  fn put_fair_price(
    &self,
    fair: FairPrice,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}
