//! Error type for `revwatch-http`.

use thiserror::Error;

/// Raised only while constructing a client; request-time failures are
/// reported as `CrawlFailure` / `DeliveryFailure`.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),

  #[error("invalid configuration: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
