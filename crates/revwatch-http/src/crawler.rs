//! `Crawler` backed by an external scraper service.
//!
//! The scraper exposes two JSON endpoints:
//!
//! | Method | Path                               | 200 body        | 404 means       |
//! |--------|------------------------------------|-----------------|-----------------|
//! | GET    | `/profiles/{id}`                   | `ScrapedProfile`| unknown profile |
//! | GET    | `/profiles/{id}/latest-review`     | `ScrapedReview` | no reviews yet  |
//!
//! `{id}` is sent as a single percent-encoded path segment.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use revwatch_core::{
  crawl::{CrawlFailure, Crawler},
  profile::{Profile, ProfileSnapshot},
  review::ReviewSnapshot,
};
use serde::{Deserialize, Serialize};

use crate::{endpoint::Endpoint, error::Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
  pub base_url:     String,
  pub timeout_secs: u64,
}

impl Default for ScraperConfig {
  fn default() -> Self {
    Self {
      base_url:     "http://127.0.0.1:3000".to_owned(),
      timeout_secs: 120,
    }
  }
}

#[derive(Debug, Deserialize)]
struct ScrapedProfile {
  id:           String,
  display_name: String,
}

#[derive(Debug, Deserialize)]
struct ScrapedReview {
  place_id:      String,
  place_name:    String,
  stars:         u8,
  text:          String,
  #[serde(default)]
  original_text: Option<String>,
}

impl From<ScrapedReview> for ReviewSnapshot {
  fn from(r: ScrapedReview) -> Self {
    ReviewSnapshot {
      place_id:               r.place_id,
      place_name:             r.place_name,
      star_rating:            r.stars,
      body:                   r.text,
      body_original_language: r.original_text,
    }
  }
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpCrawler {
  client:   Client,
  endpoint: Endpoint,
  timeout:  Duration,
}

impl HttpCrawler {
  pub fn new(config: &ScraperConfig) -> Result<Self> {
    let endpoint = Endpoint::parse(&config.base_url, "scraper base_url")?;
    let timeout = Duration::from_secs(config.timeout_secs);
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, endpoint, timeout })
  }

  fn profile_url(&self, profile_id: &str) -> Url { self.endpoint.join(["profiles", profile_id]) }

  fn latest_review_url(&self, profile_id: &str) -> Url {
    self.endpoint.join(["profiles", profile_id, "latest-review"])
  }

  async fn get(&self, url: Url) -> Result<reqwest::Response, CrawlFailure> {
    self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| self.transport_failure(e))
  }

  fn transport_failure(&self, err: reqwest::Error) -> CrawlFailure {
    if err.is_timeout() {
      CrawlFailure::Timeout(self.timeout)
    } else if err.is_decode() {
      CrawlFailure::Parse(err.to_string())
    } else {
      CrawlFailure::Network(err.to_string())
    }
  }
}

async fn status_failure(resp: reqwest::Response) -> CrawlFailure {
  let status = resp.status().as_u16();
  let message = resp.text().await.unwrap_or_default();
  CrawlFailure::Status { status, message }
}

impl Crawler for HttpCrawler {
  async fn fetch_profile(&self, profile_id: &str) -> Result<ProfileSnapshot, CrawlFailure> {
    let resp = self.get(self.profile_url(profile_id)).await?;
    match resp.status() {
      StatusCode::NOT_FOUND => Err(CrawlFailure::ProfileNotFound(profile_id.to_owned())),
      s if s.is_success() => {
        let scraped: ScrapedProfile = resp.json().await.map_err(|e| self.transport_failure(e))?;
        if scraped.id != profile_id {
          tracing::debug!(requested = profile_id, returned = %scraped.id, "scraper normalised profile id");
        }
        Ok(ProfileSnapshot {
          profile_id:   profile_id.to_owned(),
          display_name: scraped.display_name,
        })
      }
      _ => Err(status_failure(resp).await),
    }
  }

  async fn fetch_latest_review(
    &self,
    profile: &Profile,
  ) -> Result<Option<ReviewSnapshot>, CrawlFailure> {
    let resp = self.get(self.latest_review_url(&profile.profile_id)).await?;
    match resp.status() {
      StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
      s if s.is_success() => {
        let scraped: ScrapedReview = resp.json().await.map_err(|e| self.transport_failure(e))?;
        Ok(Some(scraped.into()))
      }
      _ => Err(status_failure(resp).await),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  #[test]
  fn profile_urls_hang_off_the_base() {
    let crawler = HttpCrawler::new(&ScraperConfig {
      base_url:     "http://scraper:8080/".into(),
      timeout_secs: 5,
    })
    .unwrap();
    assert_eq!(crawler.profile_url("42").as_str(), "http://scraper:8080/profiles/42");
    assert_eq!(
      crawler.latest_review_url("a/../x").as_str(),
      "http://scraper:8080/profiles/a%2F..%2Fx/latest-review"
    );
  }

  #[test]
  fn empty_base_url_is_rejected() {
    let err = HttpCrawler::new(&ScraperConfig {
      base_url:     "  ".into(),
      timeout_secs: 5,
    })
    .err()
    .unwrap();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn scraped_review_maps_onto_snapshot() {
    let scraped: ScrapedReview = serde_json::from_value(serde_json::json!({
      "place_id": "ChIJ123",
      "place_name": "Cafe X",
      "stars": 4,
      "text": "Great",
    }))
    .unwrap();
    let snapshot = ReviewSnapshot::from(scraped);
    assert_eq!(snapshot.place_id, "ChIJ123");
    assert_eq!(snapshot.star_rating, 4);
    assert_eq!(snapshot.body, "Great");
    assert!(snapshot.body_original_language.is_none());
  }
}
