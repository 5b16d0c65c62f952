//! One sweep over every followed profile.

use std::{sync::Arc, time::Duration};

use revwatch_core::{crawl::Crawler, store::ReviewStore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  clock::Clock,
  error::{Error, Result},
  queue::{NotificationEvent, QueueSender},
  update::ReviewUpdater,
};

/// Counters for one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
  /// Followed profiles loaded at the start of the sweep.
  pub considered:  usize,
  /// Profiles skipped because their review is inside the sweep window.
  pub skipped:     usize,
  pub visited:     usize,
  pub failures:    usize,
  /// Ids of the reviews installed during the sweep, in visit order.
  pub installed:   Vec<Uuid>,
}

pub struct Scanner<S, C> {
  store:         Arc<S>,
  updater:       ReviewUpdater<S, C>,
  profile_delay: Duration,
  clock:         Arc<dyn Clock>,
}

impl<S, C> Scanner<S, C>
where
  S: ReviewStore,
  C: Crawler,
{
  pub fn new(
    store: Arc<S>,
    updater: ReviewUpdater<S, C>,
    profile_delay: Duration,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self { store, updater, profile_delay, clock }
  }

  /// Visit every subscribed profile whose review is older than the sweep
  /// window, stalest first, pushing an event for each newly installed review.
  ///
  /// Per-profile failures are logged and counted; the sweep moves on to the
  /// next profile. Only failing to load the profile list aborts the sweep.
  pub async fn run_sweep(&self, queue: &QueueSender) -> Result<SweepReport> {
    let tracked = self
      .store
      .list_subscribed_profiles()
      .await
      .map_err(Error::store)?;

    let mut report = SweepReport { considered: tracked.len(), ..SweepReport::default() };
    let policy = *self.updater.policy();

    for entry in tracked {
      let profile_id = entry.profile.profile_id.as_str();
      if !policy.should_visit(entry.last_crawled_at(), self.clock.now()) {
        debug!(profile_id, "inside sweep window; skipping");
        report.skipped += 1;
        continue;
      }

      report.visited += 1;
      match self.updater.update_latest(&entry.profile).await {
        Ok(Some(review)) => {
          report.installed.push(review.review_id);
          queue.enqueue(NotificationEvent::new_review(&entry.profile, review));
        }
        Ok(None) => {}
        Err(e) => {
          report.failures += 1;
          warn!(profile_id, error = %e, "profile update failed");
        }
      }

      tokio::time::sleep(self.profile_delay).await;
    }

    info!(
      considered = report.considered,
      visited = report.visited,
      new_reviews = report.installed.len(),
      failures = report.failures,
      "sweep finished"
    );
    Ok(report)
  }
}
