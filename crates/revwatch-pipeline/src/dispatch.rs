//! Fan-out of queued notifications to subscriptions.
//!
//! Every subscription is resolved against the messaging platform before
//! sending. A group or channel that no longer exists deletes the
//! subscription; transient platform errors are only logged.
//!
//! Within one [`Dispatcher::drain`] pass a review reaches each subscription at
//! most once, even when a sweep event and a welcome event both target it.

use std::{collections::HashSet, sync::Arc};

use revwatch_core::{
  messaging::{Messenger, Resolution},
  store::ReviewStore,
  subscription::Subscription,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  format::Formatter,
  queue::{Audience, NotificationEvent, QueueReceiver},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
  pub events:    usize,
  pub delivered: usize,
  /// Subscriptions deleted because their destination is gone.
  pub pruned:    usize,
  pub failed:    usize,
  /// Targets skipped because they already received the same review.
  pub repeats:   usize,
}

impl DispatchReport {
  fn absorb(&mut self, other: DispatchReport) {
    self.events += other.events;
    self.delivered += other.delivered;
    self.pruned += other.pruned;
    self.failed += other.failed;
    self.repeats += other.repeats;
  }
}

/// `(review_id, subscription_id)` pairs sent during one pass.
type Sent = HashSet<(Uuid, Uuid)>;

pub struct Dispatcher<S, M> {
  store:     Arc<S>,
  messenger: Arc<M>,
  formatter: Formatter,
}

impl<S, M> Dispatcher<S, M>
where
  S: ReviewStore,
  M: Messenger,
{
  pub fn new(store: Arc<S>, messenger: Arc<M>, formatter: Formatter) -> Self {
    Self { store, messenger, formatter }
  }

  /// Deliver every event currently pending in `queue`. Errors are logged per
  /// event; the pass always runs to the end of the queue.
  pub async fn drain(&self, queue: &mut QueueReceiver) -> DispatchReport {
    let mut report = DispatchReport::default();
    let mut sent = Sent::new();
    while let Some(event) = queue.try_next() {
      match self.dispatch_unsent(&event, &mut sent).await {
        Ok(r) => report.absorb(r),
        Err(e) => {
          report.events += 1;
          report.failed += 1;
          warn!(
            profile_id = %event.review.profile_id,
            error = %e,
            "dispatch failed"
          );
        }
      }
    }
    if report.events > 0 {
      info!(
        events = report.events,
        delivered = report.delivered,
        pruned = report.pruned,
        failed = report.failed,
        repeats = report.repeats,
        "dispatch pass finished"
      );
    }
    report
  }

  /// Deliver one event to its audience.
  pub async fn dispatch(&self, event: &NotificationEvent) -> Result<DispatchReport> {
    self.dispatch_unsent(event, &mut Sent::new()).await
  }

  async fn dispatch_unsent(
    &self,
    event: &NotificationEvent,
    sent: &mut Sent,
  ) -> Result<DispatchReport> {
    let profile_id = event.review.profile_id.as_str();
    let targets: Vec<Subscription> = match event.audience {
      Audience::AllSubscribers => self
        .store
        .subscriptions_for_profile(profile_id)
        .await
        .map_err(Error::store)?,
      Audience::Subscription(id) => self
        .store
        .get_subscription(id)
        .await
        .map_err(Error::store)?
        .into_iter()
        .filter(|s| s.profile_id == profile_id)
        .collect(),
    };

    let mut report = DispatchReport { events: 1, ..DispatchReport::default() };
    for sub in targets {
      let key = (event.review.review_id, sub.subscription_id);
      if sent.contains(&key) {
        report.repeats += 1;
        debug!(subscription_id = %sub.subscription_id, "review already sent this pass");
        continue;
      }
      if self.deliver_to(&sub, event, &mut report).await {
        sent.insert(key);
      }
    }
    Ok(report)
  }

  /// Returns whether the message was sent.
  async fn deliver_to(
    &self,
    sub: &Subscription,
    event: &NotificationEvent,
    report: &mut DispatchReport,
  ) -> bool {
    let subscription_id = sub.subscription_id;
    let resolution = self
      .messenger
      .resolve_destination(&sub.group_id, &sub.channel_id)
      .await;

    let destination = match resolution {
      Ok(Resolution::Found(destination)) => destination,
      Ok(gone @ (Resolution::GroupNotFound | Resolution::ChannelNotFound)) => {
        match self.store.delete_subscription(subscription_id).await {
          Ok(_) => {
            report.pruned += 1;
            info!(
              %subscription_id,
              group_id = %sub.group_id,
              channel_id = %sub.channel_id,
              ?gone,
              "destination gone; subscription removed"
            );
          }
          Err(e) => {
            report.failed += 1;
            warn!(%subscription_id, error = %e, "could not remove stale subscription");
          }
        }
        return false;
      }
      Err(e) => {
        report.failed += 1;
        warn!(%subscription_id, error = %e, "could not resolve destination");
        return false;
      }
    };

    let notification = self.formatter.render(event, sub.deliver_original_language);
    match self.messenger.send(&destination, &notification).await {
      Ok(()) => {
        report.delivered += 1;
        debug!(%subscription_id, "notification delivered");
        true
      }
      Err(e) => {
        report.failed += 1;
        warn!(%subscription_id, error = %e, "delivery failed");
        false
      }
    }
  }
}
