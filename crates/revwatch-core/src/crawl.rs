//! The `Crawler` trait, the scraping collaborator.
//!
//! How a profile page is scraped is not this crate's concern; implementors
//! only promise to report what they found or fail with a [`CrawlFailure`].

use std::{future::Future, time::Duration};

use thiserror::Error;

use crate::{
  profile::{Profile, ProfileSnapshot},
  review::ReviewSnapshot,
};

/// Any reason a crawl produced no usable answer. Always recoverable: the
/// caller treats it as "no update this cycle".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlFailure {
  #[error("crawl timed out after {0:?}")]
  Timeout(Duration),

  #[error("network error: {0}")]
  Network(String),

  #[error("scraper returned status {status}: {message}")]
  Status { status: u16, message: String },

  #[error("profile {0} does not exist")]
  ProfileNotFound(String),

  #[error("could not parse scraped data: {0}")]
  Parse(String),
}

impl From<crate::Error> for CrawlFailure {
  fn from(err: crate::Error) -> Self { CrawlFailure::Parse(err.to_string()) }
}

/// Abstraction over the scraper.
///
/// All methods return `Send` futures so the scan loop can run on a
/// multi-threaded runtime.
pub trait Crawler: Send + Sync {
  /// Look up a profile that is not tracked yet.
  fn fetch_profile(
    &self,
    profile_id: &str,
  ) -> impl Future<Output = Result<ProfileSnapshot, CrawlFailure>> + Send;

  /// Fetch the most recent review posted by `profile`. `Ok(None)` means the
  /// profile has no reviews (or the scraper found none).
  fn fetch_latest_review(
    &self,
    profile: &Profile,
  ) -> impl Future<Output = Result<Option<ReviewSnapshot>, CrawlFailure>> + Send;
}
