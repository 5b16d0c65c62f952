//! In-process notification queue between the scanner and the dispatcher.
//!
//! Unbounded and ephemeral: events that are still pending when the process
//! exits are lost. The sender half is cloneable so the request path can
//! enqueue welcome deliveries alongside the sweep. [`NotificationQueue`]
//! bundles both halves so a restarted orchestrator keeps draining the same
//! queue.

use std::sync::Arc;

use revwatch_core::{profile::Profile, review::Review};
use tokio::sync::{Mutex, MutexGuard, mpsc};
use uuid::Uuid;

/// Who a [`NotificationEvent`] is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
  /// Every subscription of the review's profile, looked up at dispatch time.
  AllSubscribers,
  /// One subscription only (the welcome delivery after a new follow).
  Subscription(Uuid),
}

/// "This review should be delivered."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
  pub review:               Review,
  pub profile_display_name: String,
  pub audience:             Audience,
}

impl NotificationEvent {
  /// A freshly installed review, for all of the profile's followers.
  pub fn new_review(profile: &Profile, review: Review) -> Self {
    Self {
      review,
      profile_display_name: profile.display_name.clone(),
      audience: Audience::AllSubscribers,
    }
  }

  /// The current review, sent once to a subscription that was just created.
  pub fn welcome(profile: &Profile, review: Review, subscription_id: Uuid) -> Self {
    Self {
      review,
      profile_display_name: profile.display_name.clone(),
      audience: Audience::Subscription(subscription_id),
    }
  }
}

/// Create a connected sender/receiver pair.
pub fn notification_queue() -> (QueueSender, QueueReceiver) {
  let (tx, rx) = mpsc::unbounded_channel();
  (QueueSender(tx), QueueReceiver(rx))
}

/// Both halves of one queue. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
  sender:   QueueSender,
  receiver: Arc<Mutex<QueueReceiver>>,
}

impl NotificationQueue {
  pub fn new() -> Self {
    let (sender, receiver) = notification_queue();
    Self { sender, receiver: Arc::new(Mutex::new(receiver)) }
  }

  pub fn sender(&self) -> &QueueSender { &self.sender }

  /// Exclusive access to the receiving half. Held for a whole dispatch pass.
  pub async fn receiver(&self) -> MutexGuard<'_, QueueReceiver> {
    self.receiver.lock().await
  }
}

impl Default for NotificationQueue {
  fn default() -> Self { Self::new() }
}

#[derive(Debug, Clone)]
pub struct QueueSender(mpsc::UnboundedSender<NotificationEvent>);

impl QueueSender {
  /// Push an event. Returns `false` if the receiving side has been dropped.
  pub fn enqueue(&self, event: NotificationEvent) -> bool {
    match self.0.send(event) {
      Ok(()) => true,
      Err(mpsc::error::SendError(event)) => {
        tracing::warn!(
          profile_id = %event.review.profile_id,
          "notification queue closed; event dropped"
        );
        false
      }
    }
  }
}

#[derive(Debug)]
pub struct QueueReceiver(mpsc::UnboundedReceiver<NotificationEvent>);

impl QueueReceiver {
  /// Pop the next pending event without waiting.
  pub fn try_next(&mut self) -> Option<NotificationEvent> { self.0.try_recv().ok() }

  /// Take every event pending right now.
  pub fn drain_pending(&mut self) -> Vec<NotificationEvent> {
    std::iter::from_fn(|| self.try_next()).collect()
  }
}
