//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, calendar dates as ISO 8601
//! dates, tiers as lowercase discriminants, and UUIDs as hyphenated lowercase
//! strings.

use chrono::{DateTime, NaiveDate, Utc};
use tani_core::{
  directory::Account,
  listing::Listing,
  profile::{BuyerProfile, PriceTier, SellerProfile},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String {
  d.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── PriceTier ───────────────────────────────────────────────────────────────

pub fn encode_tier(t: PriceTier) -> &'static str {
  match t {
    PriceTier::Normal => "normal",
    PriceTier::Bulk => "bulk",
  }
}

/// `None` for anything but the two known discriminants; callers turn that
/// into a malformed-document error with collection and id context.
pub fn decode_tier(s: &str) -> Option<PriceTier> {
  match s {
    "normal" => Some(PriceTier::Normal),
    "bulk" => Some(PriceTier::Bulk),
    _ => None,
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `accounts` row.
pub struct RawAccount {
  pub subject_id:    String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawAccount {
  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      subject_id:    decode_uuid(&self.subject_id)?,
      email:         self.email,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `buyer_profiles` row.
pub struct RawBuyerProfile {
  pub subject_id:            String,
  pub national_id:           String,
  pub business_registration: String,
  pub tier:                  String,
  pub email:                 String,
  pub created_at:            String,
}

impl RawBuyerProfile {
  pub fn into_profile(self) -> Result<BuyerProfile> {
    let tier = decode_tier(&self.tier).ok_or_else(|| Error::MalformedDocument {
      collection: "buyer_profiles",
      id:         self.subject_id.clone(),
      reason:     format!("unknown tier: {:?}", self.tier),
    })?;

    Ok(BuyerProfile {
      subject_id: decode_uuid(&self.subject_id)?,
      national_id: self.national_id,
      business_registration: self.business_registration,
      tier,
      email: self.email,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `seller_profiles` row.
pub struct RawSellerProfile {
  pub subject_id:  String,
  pub national_id: String,
  pub farmer_id:   String,
  pub email:       String,
  pub created_at:  String,
}

impl RawSellerProfile {
  pub fn into_profile(self) -> Result<SellerProfile> {
    Ok(SellerProfile {
      subject_id:  decode_uuid(&self.subject_id)?,
      national_id: self.national_id,
      farmer_id:   self.farmer_id,
      email:       self.email,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `listings` row.
pub struct RawListing {
  pub listing_id:   String,
  pub product_name: String,
  pub tier:         String,
  pub price:        i64,
  pub fair_price:   Option<i64>,
  pub stock:        u32,
  pub harvest_date: String,
  pub seller_id:    String,
  pub seller_email: String,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawListing {
  pub fn into_listing(self) -> Result<Listing> {
    let tier = decode_tier(&self.tier).ok_or_else(|| Error::MalformedDocument {
      collection: "listings",
      id:         self.listing_id.clone(),
      reason:     format!("unknown tier: {:?}", self.tier),
    })?;

    Ok(Listing {
      listing_id: decode_uuid(&self.listing_id)?,
      product_name: self.product_name,
      tier,
      price: self.price,
      fair_price: self.fair_price,
      stock: self.stock,
      harvest_date: decode_date(&self.harvest_date)?,
      seller_id: decode_uuid(&self.seller_id)?,
      seller_email: self.seller_email,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
