//! Review: a snapshot of the most recent review posted by a profile.
//!
//! Exactly one review is "current" per profile. There is no history: when a
//! newer review is found the previous row is deleted in the same transaction
//! that installs the replacement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const MAX_STAR_RATING: u8 = 5;

/// Upper bound (in characters) on either review body.
pub const MAX_BODY_LEN: usize = 4200;

/// Upper bound on place identifiers and names.
pub const MAX_PLACE_LEN: usize = 100;

/// A persisted review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
  pub review_id:              Uuid,
  pub profile_id:             String,
  pub place_id:               String,
  pub place_name:             String,
  pub star_rating:            u8,
  /// Body as displayed (possibly machine translated).
  pub body:                   String,
  /// Body in the language the author wrote it in, when it differs.
  pub body_original_language: Option<String>,
  /// When the crawler captured this review; the sole freshness input.
  pub crawled_at:             DateTime<Utc>,
}

impl Review {
  /// The text a subscriber should receive.
  pub fn body_for(&self, original_language: bool) -> &str {
    match (&self.body_original_language, original_language) {
      (Some(original), true) if !original.trim().is_empty() => original,
      _ => &self.body,
    }
  }
}

/// A review as reported by the crawler, before it has an id or a capture
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSnapshot {
  pub place_id:               String,
  pub place_name:             String,
  pub star_rating:            u8,
  pub body:                   String,
  #[serde(default)]
  pub body_original_language: Option<String>,
}

impl ReviewSnapshot {
  /// Validate the rating and identity fields, and clamp text to the stored
  /// limits.
  pub fn normalized(self) -> Result<Self> {
    if self.star_rating > MAX_STAR_RATING {
      return Err(Error::StarRatingOutOfRange(self.star_rating));
    }
    if self.place_id.trim().is_empty() {
      return Err(Error::EmptyField("place_id"));
    }

    let place_name = match self.place_name.trim() {
      "" => "Unknown Place".to_owned(),
      name => truncate(name, MAX_PLACE_LEN),
    };

    Ok(Self {
      place_id: truncate(self.place_id.trim(), MAX_PLACE_LEN),
      place_name,
      star_rating: self.star_rating,
      body: truncate(&self.body, MAX_BODY_LEN),
      body_original_language: self
        .body_original_language
        .filter(|b| !b.trim().is_empty())
        .map(|b| truncate(&b, MAX_BODY_LEN)),
    })
  }

  /// Whether this snapshot describes the same review as `stored`.
  pub fn same_content_as(&self, stored: &Review) -> bool {
    self.place_id == stored.place_id
      && self.star_rating == stored.star_rating
      && self.body == stored.body
      && self.body_original_language == stored.body_original_language
  }

  /// Assign an id and capture time.
  pub fn into_review(self, profile_id: &str, crawled_at: DateTime<Utc>) -> Review {
    Review {
      review_id: Uuid::new_v4(),
      profile_id: profile_id.to_owned(),
      place_id: self.place_id,
      place_name: self.place_name,
      star_rating: self.star_rating,
      body: self.body,
      body_original_language: self.body_original_language,
      crawled_at,
    }
  }
}

fn truncate(s: &str, max: usize) -> String { s.chars().take(max).collect() }
