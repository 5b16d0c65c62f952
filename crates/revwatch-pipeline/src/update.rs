//! The review update transaction for a single profile.
//!
//! Read the current review, decide via the recheck window whether to crawl,
//! crawl with a timeout, and, if the scraped review differs from the stored
//! one, install it with a compare-and-swap on the profile's pointer. No
//! storage transaction is held across the crawl; the install itself is one
//! atomic write, so a failed crawl leaves nothing behind and a concurrent
//! writer turns this update into a no-op instead of a second current review.

use std::{sync::Arc, time::Duration};

use revwatch_core::{
  crawl::{CrawlFailure, Crawler},
  freshness::FreshnessPolicy,
  profile::Profile,
  review::{Review, ReviewSnapshot},
  store::{InstallOutcome, ReviewStore},
};
use tracing::{debug, info, warn};

use crate::{
  clock::Clock,
  error::{Error, Result},
};

pub struct ReviewUpdater<S, C> {
  store:         Arc<S>,
  crawler:       Arc<C>,
  policy:        FreshnessPolicy,
  crawl_timeout: Duration,
  clock:         Arc<dyn Clock>,
}

impl<S, C> Clone for ReviewUpdater<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:         Arc::clone(&self.store),
      crawler:       Arc::clone(&self.crawler),
      policy:        self.policy,
      crawl_timeout: self.crawl_timeout,
      clock:         Arc::clone(&self.clock),
    }
  }
}

impl<S, C> ReviewUpdater<S, C>
where
  S: ReviewStore,
  C: Crawler,
{
  pub fn new(
    store: Arc<S>,
    crawler: Arc<C>,
    policy: FreshnessPolicy,
    crawl_timeout: Duration,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self { store, crawler, policy, crawl_timeout, clock }
  }

  pub fn policy(&self) -> &FreshnessPolicy { &self.policy }

  /// Bring `profile`'s current review up to date.
  ///
  /// Returns the newly installed review, or `None` when nothing changed:
  /// the stored review is still fresh, the profile has no reviews, the
  /// scraped review matches the stored one, or another writer installed a
  /// review first. Crawl failures and timeouts surface as
  /// [`Error::Crawl`] with storage untouched.
  pub async fn update_latest(&self, profile: &Profile) -> Result<Option<Review>> {
    let profile_id = profile.profile_id.as_str();
    let current = self
      .store
      .current_review(profile_id)
      .await
      .map_err(Error::store)?;

    let last_crawled = current.as_ref().map(|r| r.crawled_at);
    if !self.policy.should_recheck(last_crawled, self.clock.now()) {
      debug!(profile_id, "current review still fresh; skipping crawl");
      return Ok(None);
    }

    let scraped = self.crawl(profile).await?;
    let Some(snapshot) = scraped else {
      debug!(profile_id, "profile has no reviews");
      return Ok(None);
    };
    let snapshot = snapshot.normalized().map_err(CrawlFailure::from)?;
    let crawled_at = self.clock.now();

    if let Some(stored) = &current
      && snapshot.same_content_as(stored)
    {
      self
        .store
        .touch_review(stored.review_id, crawled_at)
        .await
        .map_err(Error::store)?;
      debug!(profile_id, "latest review unchanged");
      return Ok(None);
    }

    let review = snapshot.into_review(profile_id, crawled_at);
    let expected = current.map(|r| r.review_id);
    match self
      .store
      .install_review(review.clone(), expected)
      .await
      .map_err(Error::store)?
    {
      InstallOutcome::Installed { replaced } => {
        info!(
          profile_id,
          review_id = %review.review_id,
          ?replaced,
          "installed new latest review"
        );
        Ok(Some(review))
      }
      InstallOutcome::Conflict { current } => {
        warn!(
          profile_id,
          ?expected,
          ?current,
          "current review changed during crawl; discarding result"
        );
        Ok(None)
      }
    }
  }

  async fn crawl(&self, profile: &Profile) -> Result<Option<ReviewSnapshot>> {
    match tokio::time::timeout(self.crawl_timeout, self.crawler.fetch_latest_review(profile))
      .await
    {
      Ok(result) => Ok(result?),
      Err(_) => Err(CrawlFailure::Timeout(self.crawl_timeout).into()),
    }
  }
}
