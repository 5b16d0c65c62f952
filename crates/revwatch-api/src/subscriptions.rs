//! Handlers for `/subscriptions` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/subscriptions` | Body: [`NewSubscription`]; 201 when created, 200 when updated |
//! | `DELETE` | `/subscriptions/:group_id/:profile_id` | 204, or 404 if not following |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use revwatch_core::{crawl::Crawler, store::ReviewStore, subscription::NewSubscription};

use crate::{ServiceState, error::ApiError};

/// `POST /subscriptions`
pub async fn create<S, C>(
  State(service): State<ServiceState<S, C>>,
  Json(body): Json<NewSubscription>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore,
  C: Crawler,
{
  let outcome = service
    .subscribe(
      &body.group_id,
      &body.channel_id,
      &body.profile_id,
      body.deliver_original_language,
    )
    .await?;
  let status = if outcome.is_created() { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(outcome.into_subscription())))
}

/// `DELETE /subscriptions/:group_id/:profile_id`
pub async fn remove<S, C>(
  State(service): State<ServiceState<S, C>>,
  Path((group_id, profile_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
  S: ReviewStore,
  C: Crawler,
{
  if service.unsubscribe(&group_id, &profile_id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!(
      "group {group_id} does not follow {profile_id}"
    )))
  }
}
