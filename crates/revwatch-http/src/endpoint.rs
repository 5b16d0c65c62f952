//! Base URL plus percent-encoded path segments.

use reqwest::Url;

use crate::error::{Error, Result};

/// A parsed service base URL. Identifiers are appended with
/// [`Endpoint::join`] and never spliced into the path as text.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint(Url);

impl Endpoint {
  /// Parse `base`; `what` names the setting in error messages.
  pub(crate) fn parse(base: &str, what: &str) -> Result<Self> {
    let base = base.trim();
    if base.is_empty() {
      return Err(Error::Config(format!("{what} is empty")));
    }
    let url = Url::parse(base).map_err(|e| Error::Config(format!("{what} {base:?}: {e}")))?;
    if url.cannot_be_a_base() {
      return Err(Error::Config(format!("{what} {base:?} cannot carry a path")));
    }
    Ok(Self(url))
  }

  /// The base URL with `segments` appended, each encoded as exactly one path
  /// segment (`/`, `?` and `#` inside a segment are percent-encoded).
  pub(crate) fn join<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = self.0.clone();
    // `parse` rejected cannot-be-a-base URLs, so this always succeeds.
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }
}
