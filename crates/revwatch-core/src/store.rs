//! The `ReviewStore` trait: persistence for profiles, reviews and
//! subscriptions.
//!
//! The trait is implemented by storage backends (e.g.
//! `revwatch-store-sqlite`). The pipeline and the API depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  profile::{Profile, ProfileSnapshot, TrackedProfile},
  review::Review,
  subscription::{NewSubscription, SubscribeOutcome, Subscription},
};

// ─── Install outcome ─────────────────────────────────────────────────────────

/// Result of [`ReviewStore::install_review`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
  /// The review is now current; `replaced` is the id of the deleted
  /// predecessor, if any.
  Installed { replaced: Option<Uuid> },
  /// The profile's pointer no longer matched `expected_current`; nothing was
  /// written. `current` is what the pointer holds now.
  Conflict { current: Option<Uuid> },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a revwatch storage backend.
///
/// All methods return `Send` futures so the trait can be used from the
/// background orchestrator task and from axum handlers alike.
pub trait ReviewStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Persist a newly discovered profile stamped with `created_at`. If the id
  /// is already present the stored row is returned unchanged.
  fn add_profile(
    &self,
    snapshot: ProfileSnapshot,
    created_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send;

  /// Retrieve a profile by its external id. Returns `None` if not tracked.
  fn get_profile(
    &self,
    profile_id: &str,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send;

  /// All profiles with at least one subscription, each with its current
  /// review. Profiles nobody follows are never returned.
  fn list_subscribed_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<TrackedProfile>, Self::Error>> + Send;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// The review the profile's pointer currently references.
  fn current_review(
    &self,
    profile_id: &str,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send;

  /// Atomically make `review` the profile's current review.
  ///
  /// In one transaction: check that the pointer still equals
  /// `expected_current` (compare-and-swap), delete the previous review row,
  /// insert `review`, and move the pointer. On a pointer mismatch nothing is
  /// written and [`InstallOutcome::Conflict`] is returned. Any error rolls the
  /// whole transaction back.
  fn install_review(
    &self,
    review: Review,
    expected_current: Option<Uuid>,
  ) -> impl Future<Output = Result<InstallOutcome, Self::Error>> + Send;

  /// Advance the capture time of an unchanged current review. Returns
  /// `false` if the review no longer exists.
  fn touch_review(
    &self,
    review_id: Uuid,
    crawled_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

  // ── Subscriptions ─────────────────────────────────────────────────────

  /// Upsert keyed on `(group_id, profile_id)`. The profile must exist.
  /// `created_at` stamps a new row; an update keeps the original stamp.
  fn subscribe(
    &self,
    input: NewSubscription,
    created_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<SubscribeOutcome, Self::Error>> + Send;

  /// Remove the group's subscription to a profile. Returns whether a row
  /// was deleted.
  fn unsubscribe(
    &self,
    group_id: &str,
    profile_id: &str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

  fn get_subscription(
    &self,
    subscription_id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send;

  fn subscriptions_for_profile(
    &self,
    profile_id: &str,
  ) -> impl Future<Output = Result<Vec<Subscription>, Self::Error>> + Send;

  /// Delete by id. Returns whether a row was deleted.
  fn delete_subscription(
    &self,
    subscription_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

  /// Profiles followed anywhere in `group_id`, ordered by display name.
  fn followed_profiles(
    &self,
    group_id: &str,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send;
}
