//! SQL schema for the revwatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- latest_review_id is checked at COMMIT so the install transaction can delete
-- the old review before the pointer moves to its replacement.
CREATE TABLE IF NOT EXISTS profiles (
    profile_id       TEXT PRIMARY KEY CHECK (length(profile_id) BETWEEN 1 AND 100),
    display_name     TEXT NOT NULL,
    latest_review_id TEXT REFERENCES reviews(review_id) DEFERRABLE INITIALLY DEFERRED,
    created_at       TEXT NOT NULL
);

-- At most one row per profile: superseded reviews are deleted, not kept.
CREATE TABLE IF NOT EXISTS reviews (
    review_id     TEXT PRIMARY KEY,
    profile_id    TEXT NOT NULL REFERENCES profiles(profile_id),
    place_id      TEXT NOT NULL,
    place_name    TEXT NOT NULL,
    star_rating   INTEGER NOT NULL CHECK (star_rating BETWEEN 0 AND 5),
    body          TEXT NOT NULL,
    body_original TEXT,            -- NULL when identical to body
    crawled_at    TEXT NOT NULL,   -- RFC 3339 UTC
    UNIQUE (profile_id)
);

CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id  TEXT PRIMARY KEY,
    group_id         TEXT NOT NULL,
    channel_id       TEXT NOT NULL,
    profile_id       TEXT NOT NULL REFERENCES profiles(profile_id),
    deliver_original INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    UNIQUE (group_id, profile_id)
);

CREATE INDEX IF NOT EXISTS subscriptions_profile_idx ON subscriptions(profile_id);

PRAGMA user_version = 1;
";
