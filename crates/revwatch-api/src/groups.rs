//! `GET /groups/:group_id/profiles`: the profiles a group follows, by name.

use axum::{
  Json,
  extract::{Path, State},
};
use revwatch_core::{crawl::Crawler, profile::Profile, store::ReviewStore};

use crate::{ServiceState, error::ApiError};

pub async fn followed<S, C>(
  State(service): State<ServiceState<S, C>>,
  Path(group_id): Path<String>,
) -> Result<Json<Vec<Profile>>, ApiError>
where
  S: ReviewStore,
  C: Crawler,
{
  Ok(Json(service.followed_profiles(&group_id).await?))
}
