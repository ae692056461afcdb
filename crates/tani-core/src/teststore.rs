//! A scriptable in-memory store for resolver and guard tests.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{
  Error, Result,
  listing::{FairPrice, Listing, ListingUpdate, NewListing},
  profile::{BuyerProfile, PriceTier, SellerProfile},
  store::{ListingQuery, MarketStore},
};

/// In-memory profile collections plus failure and latency knobs. Listing
/// methods are unimplemented — resolver and guard never touch them.
#[derive(Default)]
pub(crate) struct StubStore {
  buyers:    Mutex<HashMap<Uuid, BuyerProfile>>,
  sellers:   Mutex<HashMap<Uuid, SellerProfile>>,
  fail:      bool,
  gate:      Option<Arc<Notify>>,
  /// Signalled when a profile lookup has started.
  pub entered: Arc<Notify>,
  completed: AtomicUsize,
}

impl StubStore {
  pub fn with_buyer(self, subject_id: Uuid) -> Self {
    self.buyers.lock().unwrap().insert(
      subject_id,
      BuyerProfile {
        subject_id,
        national_id: "3201011234560001".to_string(),
        business_registration: "8120000000001".to_string(),
        tier: PriceTier::Normal,
        email: "buyer@example.com".to_string(),
        created_at: Utc::now(),
      },
    );
    self
  }

  pub fn with_seller(self, subject_id: Uuid) -> Self {
    self.sellers.lock().unwrap().insert(
      subject_id,
      SellerProfile {
        subject_id,
        national_id: "3201019876540002".to_string(),
        farmer_id: "F-0042".to_string(),
        email: "seller@example.com".to_string(),
        created_at: Utc::now(),
      },
    );
    self
  }

  /// Every profile lookup fails with a store error.
  pub fn failing(mut self) -> Self {
    self.fail = true;
    self
  }

  /// Profile lookups park until [`StubStore::release`] is called.
  pub fn gated(mut self) -> Self {
    self.gate = Some(Arc::new(Notify::new()));
    self
  }

  pub fn release(&self) {
    if let Some(gate) = &self.gate {
      gate.notify_waiters();
    }
  }

  /// Number of profile lookups that ran to completion.
  pub fn lookups(&self) -> usize {
    self.completed.load(Ordering::SeqCst)
  }

  async fn enter(&self) -> Result<()> {
    self.entered.notify_one();
    if let Some(gate) = &self.gate {
      gate.notified().await;
    }
    if self.fail {
      return Err(Error::store(std::io::Error::other("store offline")));
    }
    self.completed.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

impl MarketStore for StubStore {
  async fn buyer_profile(&self, subject_id: Uuid) -> Result<Option<BuyerProfile>> {
    self.enter().await?;
    Ok(self.buyers.lock().unwrap().get(&subject_id).cloned())
  }

  async fn seller_profile(&self, subject_id: Uuid) -> Result<Option<SellerProfile>> {
    self.enter().await?;
    Ok(self.sellers.lock().unwrap().get(&subject_id).cloned())
  }

  async fn put_buyer_profile(&self, _: BuyerProfile) -> Result<()> {
    unimplemented!()
  }

  async fn put_seller_profile(&self, _: SellerProfile) -> Result<()> {
    unimplemented!()
  }

  async fn insert_listing(&self, _: NewListing) -> Result<Listing> {
    unimplemented!()
  }

  async fn listing(&self, _: Uuid) -> Result<Option<Listing>> {
    unimplemented!()
  }

  async fn listings(&self, _: &ListingQuery) -> Result<Vec<Listing>> {
    unimplemented!()
  }

  async fn update_listing(&self, _: Uuid, _: ListingUpdate) -> Result<Listing> {
    unimplemented!()
  }

  async fn delete_listing(&self, _: Uuid) -> Result<()> {
    unimplemented!()
  }

  async fn fair_price(&self, _: &str) -> Result<Option<FairPrice>> {
    unimplemented!()
  }

  async fn put_fair_price(&self, _: FairPrice) -> Result<()> {
    unimplemented!()
  }
}
