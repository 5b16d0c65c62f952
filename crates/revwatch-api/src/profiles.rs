//! Handlers for `/profiles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/profiles/:id` | Start tracking; fetches the profile on first sight |
//! | `GET`  | `/profiles/:id/latest-review` | Refreshes if stale; 404 when none captured yet |

use axum::{
  Json,
  extract::{Path, State},
};
use revwatch_core::{crawl::Crawler, profile::Profile, review::Review, store::ReviewStore};

use crate::{ServiceState, error::ApiError};

/// `PUT /profiles/:id`
pub async fn track<S, C>(
  State(service): State<ServiceState<S, C>>,
  Path(id): Path<String>,
) -> Result<Json<Profile>, ApiError>
where
  S: ReviewStore,
  C: Crawler,
{
  let profile = service.ensure_profile_tracked(&id).await?;
  Ok(Json(profile))
}

/// `GET /profiles/:id/latest-review`
pub async fn latest_review<S, C>(
  State(service): State<ServiceState<S, C>>,
  Path(id): Path<String>,
) -> Result<Json<Review>, ApiError>
where
  S: ReviewStore,
  C: Crawler,
{
  service
    .get_latest_review(&id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("no reviews found yet".into()))
}
