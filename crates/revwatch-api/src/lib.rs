//! JSON REST API for revwatch.
//!
//! Exposes an axum [`Router`] backed by a [`ReviewService`]. TLS and auth are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", revwatch_api::api_router(service.clone()))
//! ```

pub mod error;
pub mod groups;
pub mod profiles;
pub mod subscriptions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use revwatch_core::{crawl::Crawler, store::ReviewStore};
use revwatch_pipeline::ReviewService;

pub use error::ApiError;

/// Shared handler state.
pub type ServiceState<S, C> = Arc<ReviewService<S, C>>;

/// Build a fully-materialised API router for `service`.
pub fn api_router<S, C>(service: ServiceState<S, C>) -> Router<()>
where
  S: ReviewStore + 'static,
  C: Crawler + 'static,
{
  Router::new()
    // Profiles
    .route("/profiles/{id}", put(profiles::track::<S, C>))
    .route("/profiles/{id}/latest-review", get(profiles::latest_review::<S, C>))
    // Subscriptions
    .route("/subscriptions", post(subscriptions::create::<S, C>))
    .route(
      "/subscriptions/{group_id}/{profile_id}",
      delete(subscriptions::remove::<S, C>),
    )
    // Groups
    .route("/groups/{group_id}/profiles", get(groups::followed::<S, C>))
    .with_state(service)
}
