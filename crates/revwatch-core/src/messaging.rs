//! The `Messenger` trait and the rendered notification it delivers.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A destination that the messaging platform confirmed still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
  pub group_id:   String,
  pub channel_id: String,
}

/// Outcome of resolving a (group, channel) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  Found(Destination),
  /// The whole group is gone (or the bot was removed from it).
  GroupNotFound,
  /// The group exists but the channel does not, or belongs to another group.
  ChannelNotFound,
}

/// A review rendered for delivery, independent of the platform's message
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  /// Place name.
  pub title:     String,
  /// Profile display name.
  pub author:    String,
  /// The star glyph repeated `star_rating` times.
  pub stars:     String,
  pub body:      String,
  pub footer:    String,
  pub timestamp: DateTime<Utc>,
}

/// A transient failure talking to the messaging platform. Never prunes a
/// subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
  #[error("rate limited (retry after {retry_after:?})")]
  RateLimited { retry_after: Option<Duration> },

  #[error("network error: {0}")]
  Network(String),

  #[error("messaging platform rejected the request (status {status}): {message}")]
  Rejected { status: u16, message: String },
}

/// Abstraction over the messaging platform client.
pub trait Messenger: Send + Sync {
  /// Check that `channel_id` still exists inside `group_id`.
  fn resolve_destination(
    &self,
    group_id: &str,
    channel_id: &str,
  ) -> impl Future<Output = Result<Resolution, DeliveryFailure>> + Send;

  /// Deliver one notification.
  fn send(
    &self,
    destination: &Destination,
    notification: &Notification,
  ) -> impl Future<Output = Result<(), DeliveryFailure>> + Send;
}
