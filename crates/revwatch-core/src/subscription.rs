//! Subscription: a messaging destination following a profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A (destination, profile) follow relation. A group follows a given profile
/// at most once (enforced by a UNIQUE constraint on `group_id, profile_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub subscription_id:           Uuid,
  /// Server / guild in the messaging platform.
  pub group_id:                  String,
  /// Channel inside `group_id` that receives notifications.
  pub channel_id:                String,
  pub profile_id:                String,
  /// Deliver `body_original_language` instead of the displayed body.
  pub deliver_original_language: bool,
  pub created_at:                DateTime<Utc>,
}

/// Input to [`crate::store::ReviewStore::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscription {
  pub group_id:                  String,
  pub channel_id:                String,
  pub profile_id:                String,
  #[serde(default)]
  pub deliver_original_language: bool,
}

/// Result of an upserting subscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
  /// No subscription existed for this group and profile.
  Created(Subscription),
  /// The group already followed the profile; channel and language flag were
  /// overwritten.
  Updated(Subscription),
}

impl SubscribeOutcome {
  pub fn subscription(&self) -> &Subscription {
    match self {
      Self::Created(s) | Self::Updated(s) => s,
    }
  }

  pub fn into_subscription(self) -> Subscription {
    match self {
      Self::Created(s) | Self::Updated(s) => s,
    }
  }

  pub fn is_created(&self) -> bool { matches!(self, Self::Created(_)) }
}
