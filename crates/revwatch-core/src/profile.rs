//! Profile: a tracked external contributor whose reviews are monitored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Upper bound on external profile identifiers and display names.
pub const MAX_PROFILE_ID_LEN: usize = 100;

/// A tracked profile and its pointer to the current review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  /// Stable external identifier; primary key.
  pub profile_id:       String,
  /// Fetched once at first discovery and never refreshed.
  pub display_name:     String,
  /// `None` until a review has ever been found. Only the review-install
  /// transaction moves this pointer.
  pub latest_review_id: Option<Uuid>,
  pub created_at:       DateTime<Utc>,
}

/// What the crawler reports about a profile it has never seen before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
  pub profile_id:   String,
  pub display_name: String,
}

/// A profile bundled with its current review, as returned by the sweep query.
#[derive(Debug, Clone)]
pub struct TrackedProfile {
  pub profile:       Profile,
  pub latest_review: Option<crate::review::Review>,
}

impl TrackedProfile {
  pub fn last_crawled_at(&self) -> Option<DateTime<Utc>> {
    self.latest_review.as_ref().map(|r| r.crawled_at)
  }
}

/// Reject identifiers that are empty (after trimming), over the length limit,
/// or that could address a different path on the scraper (`/`, `\`, `?`,
/// `#`, control characters, or a bare `.` / `..`).
pub fn validate_profile_id(profile_id: &str) -> Result<()> {
  let trimmed = profile_id.trim();
  if trimmed.is_empty() {
    return Err(Error::EmptyProfileId);
  }
  let len = trimmed.chars().count();
  if len > MAX_PROFILE_ID_LEN {
    return Err(Error::ProfileIdTooLong(len));
  }
  let malformed = matches!(trimmed, "." | "..")
    || trimmed
      .chars()
      .any(|c| matches!(c, '/' | '\\' | '?' | '#') || c.is_control());
  if malformed {
    return Err(Error::ProfileIdMalformed(trimmed.to_owned()));
  }
  Ok(())
}

impl ProfileSnapshot {
  /// Trim the display name to the stored limit; an empty name falls back to
  /// the profile id.
  pub fn normalized(mut self) -> Self {
    let name = self.display_name.trim();
    self.display_name = if name.is_empty() {
      self.profile_id.clone()
    } else {
      name.chars().take(MAX_PROFILE_ID_LEN).collect()
    };
    self
  }
}
