//! SQLite backend for the Tani marketplace stores.
//!
//! Implements both [`tani_core::directory::Directory`] (the identity
//! provider's account storage) and [`tani_core::store::MarketStore`] (the
//! document store) over a single database file. Wraps [`tokio_rusqlite`] so
//! all database access runs on a dedicated thread without blocking the async
//! runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
