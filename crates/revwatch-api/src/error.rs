//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use revwatch_pipeline::Error as PipelineError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The scraper could not be reached or returned garbage.
  #[error("could not fetch profile")]
  Upstream(#[source] revwatch_core::crawl::CrawlFailure),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<PipelineError> for ApiError {
  fn from(err: PipelineError) -> Self {
    match err {
      PipelineError::Crawl(e) => ApiError::Upstream(e),
      PipelineError::Invalid(e) => ApiError::BadRequest(e.to_string()),
      PipelineError::Store(e) => ApiError::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Upstream(e) => {
        tracing::warn!(error = %e, "crawl failed during request");
        (StatusCode::BAD_GATEWAY, self.to_string())
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error during request");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
