//! Request-path operations used by the HTTP API.

use std::{sync::Arc, time::Duration};

use revwatch_core::{
  crawl::{CrawlFailure, Crawler},
  profile::{Profile, ProfileSnapshot, validate_profile_id},
  review::Review,
  store::ReviewStore,
  subscription::{NewSubscription, SubscribeOutcome},
};
use tracing::{info, warn};

use crate::{
  clock::Clock,
  error::{Error, Result},
  queue::{NotificationEvent, QueueSender},
  update::ReviewUpdater,
};

pub struct ReviewService<S, C> {
  store:         Arc<S>,
  crawler:       Arc<C>,
  updater:       ReviewUpdater<S, C>,
  queue:         QueueSender,
  crawl_timeout: Duration,
  clock:         Arc<dyn Clock>,
}

impl<S, C> ReviewService<S, C>
where
  S: ReviewStore,
  C: Crawler,
{
  pub fn new(
    store: Arc<S>,
    crawler: Arc<C>,
    updater: ReviewUpdater<S, C>,
    queue: QueueSender,
    crawl_timeout: Duration,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self { store, crawler, updater, queue, crawl_timeout, clock }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Return the tracked profile, fetching and persisting it on first sight.
  pub async fn ensure_profile_tracked(&self, profile_id: &str) -> Result<Profile> {
    validate_profile_id(profile_id)?;
    let profile_id = profile_id.trim();

    if let Some(profile) = self.store.get_profile(profile_id).await.map_err(Error::store)? {
      return Ok(profile);
    }

    let fetched = tokio::time::timeout(self.crawl_timeout, self.crawler.fetch_profile(profile_id))
      .await
      .map_err(|_| CrawlFailure::Timeout(self.crawl_timeout))??;
    let snapshot = ProfileSnapshot {
      profile_id:   profile_id.to_owned(),
      display_name: fetched.display_name,
    }
    .normalized();

    let profile = self
      .store
      .add_profile(snapshot, self.clock.now())
      .await
      .map_err(Error::store)?;
    info!(profile_id, display_name = %profile.display_name, "now tracking profile");
    Ok(profile)
  }

  /// The profile's current review, refreshed first if it is stale.
  ///
  /// A failed refresh is logged and the stored review returned. A refresh
  /// that installs a new review also queues it for the profile's followers.
  /// `None` means no review has been captured yet.
  pub async fn get_latest_review(&self, profile_id: &str) -> Result<Option<Review>> {
    let profile = self.ensure_profile_tracked(profile_id).await?;

    match self.updater.update_latest(&profile).await {
      Ok(Some(review)) => {
        self.queue.enqueue(NotificationEvent::new_review(&profile, review));
      }
      Ok(None) => {}
      Err(Error::Crawl(e)) => {
        warn!(profile_id = %profile.profile_id, error = %e, "refresh failed; serving stored review");
      }
      Err(e) => return Err(e),
    }

    self
      .store
      .current_review(&profile.profile_id)
      .await
      .map_err(Error::store)
  }

  /// Follow a profile from a group's channel. Re-following updates the
  /// channel and language flag in place. A brand-new follow of a profile
  /// that already has a review gets that review delivered once.
  pub async fn subscribe(
    &self,
    group_id: &str,
    channel_id: &str,
    profile_id: &str,
    deliver_original_language: bool,
  ) -> Result<SubscribeOutcome> {
    let group_id = non_empty("group_id", group_id)?;
    let channel_id = non_empty("channel_id", channel_id)?;
    let profile = self.ensure_profile_tracked(profile_id).await?;

    let input = NewSubscription {
      group_id:   group_id.to_owned(),
      channel_id: channel_id.to_owned(),
      profile_id: profile.profile_id.clone(),
      deliver_original_language,
    };
    let outcome = self
      .store
      .subscribe(input, self.clock.now())
      .await
      .map_err(Error::store)?;

    let subscription = outcome.subscription();
    info!(
      subscription_id = %subscription.subscription_id,
      group_id,
      profile_id = %profile.profile_id,
      created = outcome.is_created(),
      "subscription saved"
    );

    if outcome.is_created()
      && let Some(review) = self
        .store
        .current_review(&profile.profile_id)
        .await
        .map_err(Error::store)?
    {
      self.queue.enqueue(NotificationEvent::welcome(
        &profile,
        review,
        subscription.subscription_id,
      ));
    }

    Ok(outcome)
  }

  /// Stop following. Returns whether a subscription existed.
  pub async fn unsubscribe(&self, group_id: &str, profile_id: &str) -> Result<bool> {
    let removed = self
      .store
      .unsubscribe(group_id.trim(), profile_id.trim())
      .await
      .map_err(Error::store)?;
    if removed {
      info!(group_id, profile_id, "subscription removed");
    }
    Ok(removed)
  }

  /// Profiles the group currently follows, by display name.
  pub async fn followed_profiles(&self, group_id: &str) -> Result<Vec<Profile>> {
    self
      .store
      .followed_profiles(group_id.trim())
      .await
      .map_err(Error::store)
  }
}

fn non_empty<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
  let value = value.trim();
  if value.is_empty() {
    return Err(revwatch_core::Error::EmptyField(field).into());
  }
  Ok(value)
}
