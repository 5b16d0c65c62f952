//! Tunables for the scan/dispatch pipeline.

use std::time::Duration;

use chrono::TimeDelta;
use revwatch_core::freshness::{FreshnessPolicy, RECHECK_WINDOW_HOURS, SWEEP_WINDOW_HOURS};
use serde::{Deserialize, Serialize};

/// Pipeline configuration, deserialised from the `[pipeline]` table of the
/// server config. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Fine window: minimum age of the current review before a crawl.
  pub recheck_window_secs: u64,
  /// Coarse window: minimum age before a sweep visits a profile at all.
  pub sweep_window_secs:   u64,
  /// Pause after every visited profile, to stay polite to the scraped site.
  pub profile_delay_secs:  u64,
  /// Cooldown between the end of a dispatch pass and the next sweep.
  pub idle_secs:           u64,
  /// Upper bound on a single crawler call.
  pub crawl_timeout_secs:  u64,
  /// Repeated `star_rating` times in rendered notifications.
  pub star_glyph:          String,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      recheck_window_secs: RECHECK_WINDOW_HOURS as u64 * 3600,
      sweep_window_secs:   SWEEP_WINDOW_HOURS as u64 * 3600,
      profile_delay_secs:  10,
      idle_secs:           600,
      crawl_timeout_secs:  120,
      star_glyph:          "⭐".to_owned(),
    }
  }
}

impl PipelineConfig {
  pub fn freshness(&self) -> FreshnessPolicy {
    FreshnessPolicy::new(
      TimeDelta::seconds(self.recheck_window_secs as i64),
      TimeDelta::seconds(self.sweep_window_secs as i64),
    )
  }

  pub fn profile_delay(&self) -> Duration { Duration::from_secs(self.profile_delay_secs) }

  pub fn idle(&self) -> Duration { Duration::from_secs(self.idle_secs) }

  pub fn crawl_timeout(&self) -> Duration { Duration::from_secs(self.crawl_timeout_secs) }
}
