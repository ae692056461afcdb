//! Catalog listings and reference prices.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::PriceTier;

/// A seller's offering of one product at one price tier. A product sold both
/// per-unit and wholesale appears as two listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
  pub listing_id:   Uuid,
  pub product_name: String,
  pub tier:         PriceTier,
  /// Asking price per unit, in minor currency units.
  pub price:        i64,
  /// Reference price snapshotted at listing time; `None` when the product had
  /// no reference entry.
  pub fair_price:   Option<i64>,
  pub stock:        u32,
  pub harvest_date: NaiveDate,
  pub seller_id:    Uuid,
  pub seller_email: String,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

/// Input to [`crate::store::MarketStore::insert_listing`]. `listing_id` and
/// both timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewListing {
  pub product_name: String,
  pub tier:         PriceTier,
  pub price:        i64,
  pub fair_price:   Option<i64>,
  pub stock:        u32,
  pub harvest_date: NaiveDate,
  pub seller_id:    Uuid,
  pub seller_email: String,
}

/// Partial update applied to an existing listing; `None` fields are left
/// untouched. `updated_at` is bumped by the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingUpdate {
  pub price:        Option<i64>,
  pub stock:        Option<u32>,
  pub harvest_date: Option<NaiveDate>,
}

/// Pre-populated reference prices for a product, one value per tier.
/// Read-only from the marketplace's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairPrice {
  pub product_name: String,
  pub normal:       i64,
  pub bulk:         i64,
}

impl FairPrice {
  pub fn for_tier(&self, tier: PriceTier) -> i64 {
    match tier {
      PriceTier::Normal => self.normal,
      PriceTier::Bulk => self.bulk,
    }
  }
}
