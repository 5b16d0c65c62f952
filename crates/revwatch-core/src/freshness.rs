//! Freshness windows deciding when a profile is worth looking at again.
//!
//! Two tiers, both measured against the current review's `crawled_at`:
//!
//! - the **sweep window** (coarse, 6 h) decides whether a scan sweep visits a
//!   profile at all;
//! - the **recheck window** (fine, 3 h) decides whether a visited profile
//!   actually triggers a crawl.
//!
//! There is no "last attempted" timestamp. A failed crawl leaves
//! `crawled_at` alone, so the profile is due again on the next sweep.

use chrono::{DateTime, TimeDelta, Utc};

pub const RECHECK_WINDOW_HOURS: i64 = 3;
pub const SWEEP_WINDOW_HOURS: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
  pub recheck_window: TimeDelta,
  pub sweep_window:   TimeDelta,
}

impl Default for FreshnessPolicy {
  fn default() -> Self {
    Self {
      recheck_window: TimeDelta::hours(RECHECK_WINDOW_HOURS),
      sweep_window:   TimeDelta::hours(SWEEP_WINDOW_HOURS),
    }
  }
}

impl FreshnessPolicy {
  pub fn new(recheck_window: TimeDelta, sweep_window: TimeDelta) -> Self {
    Self { recheck_window, sweep_window }
  }

  /// Should a crawl be issued for a profile whose current review was captured
  /// at `last_crawled_at`?
  pub fn should_recheck(
    &self,
    last_crawled_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> bool {
    window_elapsed(self.recheck_window, last_crawled_at, now)
  }

  /// Should a sweep visit this profile at all?
  pub fn should_visit(
    &self,
    last_crawled_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> bool {
    window_elapsed(self.sweep_window, last_crawled_at, now)
  }
}

fn window_elapsed(
  window: TimeDelta,
  last: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> bool {
  match last {
    None => true,
    Some(at) => now.signed_duration_since(at) >= window,
  }
}
