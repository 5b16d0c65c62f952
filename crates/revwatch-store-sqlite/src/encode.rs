//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 strings (nanoseconds, `Z`) so that
//! text order matches time order. UUIDs are hyphenated lowercase strings and
//! booleans are 0/1 integers.

use chrono::{DateTime, SecondsFormat, Utc};
use revwatch_core::{
  profile::Profile,
  review::Review,
  subscription::Subscription,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Column lists ─────────────────────────────────────────────────────────────

/// Column order read by [`RawProfile::from_row`]; `p` aliases `profiles`.
pub const PROFILE_COLUMNS: &str =
  "p.profile_id, p.display_name, p.latest_review_id, p.created_at";

/// Column order read by [`RawReview::from_row`]; `r` aliases `reviews`.
pub const REVIEW_COLUMNS: &str = "r.review_id, r.profile_id, r.place_id, \
   r.place_name, r.star_rating, r.body, r.body_original, r.crawled_at";

/// Column order read by [`RawSubscription::from_row`]; `s` aliases
/// `subscriptions`.
pub const SUBSCRIPTION_COLUMNS: &str = "s.subscription_id, s.group_id, \
   s.channel_id, s.profile_id, s.deliver_original, s.created_at";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub profile_id:       String,
  pub display_name:     String,
  pub latest_review_id: Option<String>,
  pub created_at:       String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      profile_id:       row.get(offset)?,
      display_name:     row.get(offset + 1)?,
      latest_review_id: row.get(offset + 2)?,
      created_at:       row.get(offset + 3)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      profile_id:       self.profile_id,
      display_name:     self.display_name,
      latest_review_id: self
        .latest_review_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `reviews` row.
pub struct RawReview {
  pub review_id:     String,
  pub profile_id:    String,
  pub place_id:      String,
  pub place_name:    String,
  pub star_rating:   i64,
  pub body:          String,
  pub body_original: Option<String>,
  pub crawled_at:    String,
}

impl RawReview {
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:     row.get(offset)?,
      profile_id:    row.get(offset + 1)?,
      place_id:      row.get(offset + 2)?,
      place_name:    row.get(offset + 3)?,
      star_rating:   row.get(offset + 4)?,
      body:          row.get(offset + 5)?,
      body_original: row.get(offset + 6)?,
      crawled_at:    row.get(offset + 7)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    let star_rating = u8::try_from(self.star_rating)
      .map_err(|_| Error::Corrupt(format!("star rating {}", self.star_rating)))?;

    Ok(Review {
      review_id: decode_uuid(&self.review_id)?,
      profile_id: self.profile_id,
      place_id: self.place_id,
      place_name: self.place_name,
      star_rating,
      body: self.body,
      body_original_language: self.body_original,
      crawled_at: decode_dt(&self.crawled_at)?,
    })
  }
}

/// Raw values read directly from a `subscriptions` row.
pub struct RawSubscription {
  pub subscription_id:  String,
  pub group_id:         String,
  pub channel_id:       String,
  pub profile_id:       String,
  pub deliver_original: bool,
  pub created_at:       String,
}

impl RawSubscription {
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      subscription_id:  row.get(offset)?,
      group_id:         row.get(offset + 1)?,
      channel_id:       row.get(offset + 2)?,
      profile_id:       row.get(offset + 3)?,
      deliver_original: row.get(offset + 4)?,
      created_at:       row.get(offset + 5)?,
    })
  }

  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      subscription_id:           decode_uuid(&self.subscription_id)?,
      group_id:                  self.group_id,
      channel_id:                self.channel_id,
      profile_id:                self.profile_id,
      deliver_original_language: self.deliver_original,
      created_at:                decode_dt(&self.created_at)?,
    })
  }
}
