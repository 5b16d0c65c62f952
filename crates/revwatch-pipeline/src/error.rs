//! Error type for `revwatch-pipeline`.

use revwatch_core::crawl::CrawlFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The scraper failed or timed out. Recoverable: nothing was written.
  #[error("could not fetch profile: {0}")]
  Crawl(#[from] CrawlFailure),

  /// A storage call or transaction failed; the transaction was rolled back.
  #[error("storage error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("invalid input: {0}")]
  Invalid(#[from] revwatch_core::Error),
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
