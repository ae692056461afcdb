//! [`SqliteStore`] — the SQLite implementation of [`Directory`] and
//! [`MarketStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tani_core::{
  directory::{Account, Directory, NewAccount},
  listing::{FairPrice, Listing, ListingUpdate, NewListing},
  profile::{BuyerProfile, SellerProfile},
  store::{ListingQuery, MarketStore},
};
use uuid::Uuid;

use crate::{
  Error,
  encode::{
    RawAccount, RawBuyerProfile, RawListing, RawSellerProfile, encode_date,
    encode_dt, encode_tier, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Accounts, profiles, listings, and reference prices backed by a single
/// SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> crate::Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Directory impl ──────────────────────────────────────────────────────────

impl Directory for SqliteStore {
  async fn create_account(
    &self,
    input: NewAccount,
  ) -> tani_core::Result<Account> {
    let account = Account {
      subject_id:    Uuid::new_v4(),
      email:         input.email,
      password_hash: input.password_hash,
      created_at:    Utc::now(),
    };

    let id_str = encode_uuid(account.subject_id);
    let email  = account.email.clone();
    let hash   = account.password_hash.clone();
    let at_str = encode_dt(account.created_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if exists {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO accounts (subject_id, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, email, hash, at_str],
        )?;
        Ok(true)
      })
      .await
      .map_err(Error::from)?;

    if !inserted {
      return Err(tani_core::Error::EmailTaken(account.email));
    }
    Ok(account)
  }

  async fn account(
    &self,
    subject_id: Uuid,
  ) -> tani_core::Result<Option<Account>> {
    let id_str = encode_uuid(subject_id);

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, email, password_hash, created_at
               FROM accounts WHERE subject_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawAccount {
                  subject_id:    row.get(0)?,
                  email:         row.get(1)?,
                  password_hash: row.get(2)?,
                  created_at:    row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawAccount::into_account).transpose()?)
  }

  async fn account_by_email(
    &self,
    email: &str,
  ) -> tani_core::Result<Option<Account>> {
    let email = email.to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, email, password_hash, created_at
               FROM accounts WHERE email = ?1",
              rusqlite::params![email],
              |row| {
                Ok(RawAccount {
                  subject_id:    row.get(0)?,
                  email:         row.get(1)?,
                  password_hash: row.get(2)?,
                  created_at:    row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawAccount::into_account).transpose()?)
  }

  async fn delete_account(&self, subject_id: Uuid) -> tani_core::Result<()> {
    let id_str = encode_uuid(subject_id);

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM accounts WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await
      .map_err(Error::from)?;

    if rows == 0 {
      return Err(tani_core::Error::AccountNotFound(subject_id));
    }
    Ok(())
  }
}

// ─── MarketStore impl ────────────────────────────────────────────────────────

impl MarketStore for SqliteStore {
  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn buyer_profile(
    &self,
    subject_id: Uuid,
  ) -> tani_core::Result<Option<BuyerProfile>> {
    let id_str = encode_uuid(subject_id);

    let raw: Option<RawBuyerProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, national_id, business_registration, tier,
                      email, created_at
               FROM buyer_profiles WHERE subject_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawBuyerProfile {
                  subject_id:            row.get(0)?,
                  national_id:           row.get(1)?,
                  business_registration: row.get(2)?,
                  tier:                  row.get(3)?,
                  email:                 row.get(4)?,
                  created_at:            row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawBuyerProfile::into_profile).transpose()?)
  }

  async fn seller_profile(
    &self,
    subject_id: Uuid,
  ) -> tani_core::Result<Option<SellerProfile>> {
    let id_str = encode_uuid(subject_id);

    let raw: Option<RawSellerProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, national_id, farmer_id, email, created_at
               FROM seller_profiles WHERE subject_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawSellerProfile {
                  subject_id:  row.get(0)?,
                  national_id: row.get(1)?,
                  farmer_id:   row.get(2)?,
                  email:       row.get(3)?,
                  created_at:  row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawSellerProfile::into_profile).transpose()?)
  }

  async fn put_buyer_profile(
    &self,
    profile: BuyerProfile,
  ) -> tani_core::Result<()> {
    let id_str   = encode_uuid(profile.subject_id);
    let tier_str = encode_tier(profile.tier).to_owned();
    let at_str   = encode_dt(profile.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO buyer_profiles
             (subject_id, national_id, business_registration, tier, email,
              created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            profile.national_id,
            profile.business_registration,
            tier_str,
            profile.email,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from)?;
    Ok(())
  }

  async fn put_seller_profile(
    &self,
    profile: SellerProfile,
  ) -> tani_core::Result<()> {
    let id_str = encode_uuid(profile.subject_id);
    let at_str = encode_dt(profile.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO seller_profiles
             (subject_id, national_id, farmer_id, email, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            id_str,
            profile.national_id,
            profile.farmer_id,
            profile.email,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from)?;
    Ok(())
  }

  // ── Listings ──────────────────────────────────────────────────────────────

  async fn insert_listing(
    &self,
    input: NewListing,
  ) -> tani_core::Result<Listing> {
    let now = Utc::now();
    let listing = Listing {
      listing_id:   Uuid::new_v4(),
      product_name: input.product_name,
      tier:         input.tier,
      price:        input.price,
      fair_price:   input.fair_price,
      stock:        input.stock,
      harvest_date: input.harvest_date,
      seller_id:    input.seller_id,
      seller_email: input.seller_email,
      created_at:   now,
      updated_at:   now,
    };

    let id_str        = encode_uuid(listing.listing_id);
    let product_name  = listing.product_name.clone();
    let tier_str      = encode_tier(listing.tier).to_owned();
    let price         = listing.price;
    let fair_price    = listing.fair_price;
    let stock         = listing.stock;
    let date_str      = encode_date(listing.harvest_date);
    let seller_id_str = encode_uuid(listing.seller_id);
    let seller_email  = listing.seller_email.clone();
    let at_str        = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO listings (
             listing_id, product_name, tier, price, fair_price, stock,
             harvest_date, seller_id, seller_email, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            product_name,
            tier_str,
            price,
            fair_price,
            stock,
            date_str,
            seller_id_str,
            seller_email,
            at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from)?;

    Ok(listing)
  }

  async fn listing(
    &self,
    listing_id: Uuid,
  ) -> tani_core::Result<Option<Listing>> {
    let id_str = encode_uuid(listing_id);

    let raw: Option<RawListing> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT listing_id, product_name, tier, price, fair_price,
                      stock, harvest_date, seller_id, seller_email,
                      created_at, updated_at
               FROM listings WHERE listing_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawListing {
                  listing_id:   row.get(0)?,
                  product_name: row.get(1)?,
                  tier:         row.get(2)?,
                  price:        row.get(3)?,
                  fair_price:   row.get(4)?,
                  stock:        row.get(5)?,
                  harvest_date: row.get(6)?,
                  seller_id:    row.get(7)?,
                  seller_email: row.get(8)?,
                  created_at:   row.get(9)?,
                  updated_at:   row.get(10)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(raw.map(RawListing::into_listing).transpose()?)
  }

  async fn listings(
    &self,
    query: &ListingQuery,
  ) -> tani_core::Result<Vec<Listing>> {
    let tier_str     = query.tier.map(encode_tier).map(str::to_owned);
    let seller_str   = query.seller_id.map(encode_uuid);
    let name_pattern = query.product_name.as_deref().map(|n| format!("%{n}%"));
    let min_price    = query.min_price;
    let max_price    = query.max_price;
    let limit_val    = query.limit.unwrap_or(100) as i64;
    let offset_val   = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawListing> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; parameter slots are fixed.
        let mut conds: Vec<&'static str> = vec![];
        if tier_str.is_some() {
          conds.push("tier = ?1");
        }
        if seller_str.is_some() {
          conds.push("seller_id = ?2");
        }
        if name_pattern.is_some() {
          conds.push("product_name LIKE ?3");
        }
        if min_price.is_some() {
          conds.push("price >= ?4");
        }
        if max_price.is_some() {
          conds.push("price <= ?5");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT listing_id, product_name, tier, price, fair_price, stock,
                  harvest_date, seller_id, seller_email, created_at, updated_at
           FROM listings
           {where_clause}
           ORDER BY created_at DESC
           LIMIT ?6 OFFSET ?7"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              tier_str.as_deref(),
              seller_str.as_deref(),
              name_pattern.as_deref(),
              min_price,
              max_price,
              limit_val,
              offset_val,
            ],
            |row| {
              Ok(RawListing {
                listing_id:   row.get(0)?,
                product_name: row.get(1)?,
                tier:         row.get(2)?,
                price:        row.get(3)?,
                fair_price:   row.get(4)?,
                stock:        row.get(5)?,
                harvest_date: row.get(6)?,
                seller_id:    row.get(7)?,
                seller_email: row.get(8)?,
                created_at:   row.get(9)?,
                updated_at:   row.get(10)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await
      .map_err(Error::from)?;

    let listings = raws
      .into_iter()
      .map(RawListing::into_listing)
      .collect::<crate::Result<Vec<_>>>()?;
    Ok(listings)
  }

  async fn update_listing(
    &self,
    listing_id: Uuid,
    update: ListingUpdate,
  ) -> tani_core::Result<Listing> {
    let Some(mut listing) = self.listing(listing_id).await? else {
      return Err(tani_core::Error::ListingNotFound(listing_id));
    };

    if let Some(price) = update.price {
      listing.price = price;
    }
    if let Some(stock) = update.stock {
      listing.stock = stock;
    }
    if let Some(date) = update.harvest_date {
      listing.harvest_date = date;
    }
    listing.updated_at = Utc::now();

    let id_str   = encode_uuid(listing_id);
    let price    = listing.price;
    let stock    = listing.stock;
    let date_str = encode_date(listing.harvest_date);
    let at_str   = encode_dt(listing.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE listings
           SET price = ?2, stock = ?3, harvest_date = ?4, updated_at = ?5
           WHERE listing_id = ?1",
          rusqlite::params![id_str, price, stock, date_str, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from)?;

    Ok(listing)
  }

  async fn delete_listing(&self, listing_id: Uuid) -> tani_core::Result<()> {
    let id_str = encode_uuid(listing_id);

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM listings WHERE listing_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await
      .map_err(Error::from)?;

    if rows == 0 {
      return Err(tani_core::Error::ListingNotFound(listing_id));
    }
    Ok(())
  }

  // ── Reference prices ──────────────────────────────────────────────────────

  async fn fair_price(
    &self,
    product_name: &str,
  ) -> tani_core::Result<Option<FairPrice>> {
    let name = product_name.to_owned();

    let fair: Option<FairPrice> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT product_name, normal, bulk
               FROM fair_prices WHERE product_name = ?1",
              rusqlite::params![name],
              |row| {
                Ok(FairPrice {
                  product_name: row.get(0)?,
                  normal:       row.get(1)?,
                  bulk:         row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::from)?;

    Ok(fair)
  }

  async fn put_fair_price(&self, fair: FairPrice) -> tani_core::Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO fair_prices (product_name, normal, bulk)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![fair.product_name, fair.normal, fair.bulk],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from)?;
    Ok(())
  }
}
