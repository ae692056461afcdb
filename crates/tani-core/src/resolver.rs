//! Role resolution: map a subject to buyer, seller, or neither by checking
//! which profile document exists.

use uuid::Uuid;

use crate::{
  Result,
  profile::{Profile, Role},
  store::MarketStore,
};

/// Look up which profile document exists for `subject_id`.
///
/// At most two lookups, issued sequentially with the buyer collection first —
/// if both documents somehow exist, the subject deterministically resolves as
/// a buyer. `Ok(None)` means the subject has no profile; a failed lookup is
/// returned as `Err` and must never be treated as `None`. Read-only.
pub async fn resolve<S: MarketStore>(
  store: &S,
  subject_id: Uuid,
) -> Result<Option<Profile>> {
  if let Some(buyer) = store.buyer_profile(subject_id).await? {
    return Ok(Some(Profile::Buyer(buyer)));
  }
  if let Some(seller) = store.seller_profile(subject_id).await? {
    return Ok(Some(Profile::Seller(seller)));
  }
  Ok(None)
}

/// Role-only variant of [`resolve`].
pub async fn resolve_role<S: MarketStore>(
  store: &S,
  subject_id: Uuid,
) -> Result<Option<Role>> {
  Ok(resolve(store, subject_id).await?.map(|p| p.role()))
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::{resolve, resolve_role};
  use crate::{Error, profile::Role, teststore::StubStore};

  #[tokio::test]
  async fn buyer_profile_resolves_as_buyer() {
    let subject = Uuid::new_v4();
    let store = StubStore::default().with_buyer(subject);

    let role = resolve_role(&store, subject).await.unwrap();
    assert_eq!(role, Some(Role::Buyer));
  }

  #[tokio::test]
  async fn seller_profile_resolves_as_seller() {
    let subject = Uuid::new_v4();
    let store = StubStore::default().with_seller(subject);

    let role = resolve_role(&store, subject).await.unwrap();
    assert_eq!(role, Some(Role::Seller));
  }

  #[tokio::test]
  async fn no_profile_resolves_as_none() {
    let store = StubStore::default();
    let role = resolve_role(&store, Uuid::new_v4()).await.unwrap();
    assert_eq!(role, None);
  }

  #[tokio::test]
  async fn both_profiles_resolve_as_buyer() {
    // Invariant violation; the buyer-first ordering is the tie break.
    let subject = Uuid::new_v4();
    let store = StubStore::default().with_buyer(subject).with_seller(subject);

    let role = resolve_role(&store, subject).await.unwrap();
    assert_eq!(role, Some(Role::Buyer));
  }

  #[tokio::test]
  async fn buyer_hit_skips_seller_lookup() {
    let subject = Uuid::new_v4();
    let store = StubStore::default().with_buyer(subject);

    resolve(&store, subject).await.unwrap();
    assert_eq!(store.lookups(), 1);
  }

  #[tokio::test]
  async fn store_failure_is_an_error_not_none() {
    let subject = Uuid::new_v4();
    let store = StubStore::default().failing();

    let err = resolve(&store, subject).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
  }
}
