//! SQL schema for the Tani SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    subject_id    TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- At most one profile row per subject, in at most one of the two tables.
-- Nothing enforces the cross-table half of that invariant; the resolver's
-- buyer-first ordering is the tie break if it is ever violated.
CREATE TABLE IF NOT EXISTS buyer_profiles (
    subject_id            TEXT PRIMARY KEY,
    national_id           TEXT NOT NULL,
    business_registration TEXT NOT NULL,
    tier                  TEXT NOT NULL,   -- 'normal' | 'bulk'
    email                 TEXT NOT NULL,
    created_at            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS seller_profiles (
    subject_id  TEXT PRIMARY KEY,
    national_id TEXT NOT NULL,
    farmer_id   TEXT NOT NULL,
    email       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS listings (
    listing_id   TEXT PRIMARY KEY,
    product_name TEXT NOT NULL,
    tier         TEXT NOT NULL,    -- 'normal' | 'bulk'
    price        INTEGER NOT NULL,
    fair_price   INTEGER,          -- reference price at listing time, if known
    stock        INTEGER NOT NULL,
    harvest_date TEXT NOT NULL,    -- ISO 8601 calendar date
    seller_id    TEXT NOT NULL,
    seller_email TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fair_prices (
    product_name TEXT PRIMARY KEY COLLATE NOCASE,
    normal       INTEGER NOT NULL,
    bulk         INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS listings_tier_idx   ON listings(tier);
CREATE INDEX IF NOT EXISTS listings_seller_idx ON listings(seller_id);

PRAGMA user_version = 1;
";
