//! Buyer and seller profile documents.
//!
//! A subject's role is determined by which profile document exists for it,
//! not by a discriminant on the session. Registration writes exactly one
//! profile; a subject is expected to have at most one of the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role a subject plays in the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Buyer,
  Seller,
}

/// Price tier: per-unit retail sales or wholesale lots. Doubles as the buyer
/// classification — a bulk buyer browses bulk listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
  Normal,
  Bulk,
}

/// A produce buyer, keyed by the owning subject. Created once at
/// registration; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerProfile {
  pub subject_id:            Uuid,
  pub national_id:           String,
  pub business_registration: String,
  pub tier:                  PriceTier,
  pub email:                 String,
  pub created_at:            DateTime<Utc>,
}

/// A farmer selling through the marketplace. Same lifecycle shape as
/// [`BuyerProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerProfile {
  pub subject_id:  Uuid,
  pub national_id: String,
  pub farmer_id:   String,
  pub email:       String,
  pub created_at:  DateTime<Utc>,
}

/// A subject's role-specific document, tagged by the collection it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Profile {
  Buyer(BuyerProfile),
  Seller(SellerProfile),
}

impl Profile {
  pub fn role(&self) -> Role {
    match self {
      Self::Buyer(_) => Role::Buyer,
      Self::Seller(_) => Role::Seller,
    }
  }

  pub fn subject_id(&self) -> Uuid {
    match self {
      Self::Buyer(p) => p.subject_id,
      Self::Seller(p) => p.subject_id,
    }
  }
}
