//! The review pipeline: per-profile update transactions, the scan sweep,
//! the notification queue and its dispatcher, and the orchestrator loop that
//! drives them.
//!
//! [`build`] wires everything from one [`PipelineConfig`] and hands back the
//! background [`Orchestrator`] plus the [`ReviewService`] used on the request
//! path. Both share the same store, crawler and queue. [`build_with_queue`]
//! wires onto an existing [`NotificationQueue`], which is how a supervisor
//! replaces a crashed orchestrator without losing pending notifications.

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod orchestrator;
pub mod queue;
pub mod scan;
pub mod service;
pub mod update;

use std::sync::Arc;

use revwatch_core::{crawl::Crawler, messaging::Messenger, store::ReviewStore};

pub use clock::{Clock, SystemClock};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, Phase};
pub use queue::NotificationQueue;
pub use service::ReviewService;

/// Wire a pipeline on the system clock.
pub fn build<S, C, M>(
  store: Arc<S>,
  crawler: Arc<C>,
  messenger: Arc<M>,
  config: &PipelineConfig,
) -> (Orchestrator<S, C, M>, ReviewService<S, C>)
where
  S: ReviewStore,
  C: Crawler,
  M: Messenger,
{
  build_with_clock(store, crawler, messenger, config, Arc::new(SystemClock))
}

pub fn build_with_clock<S, C, M>(
  store: Arc<S>,
  crawler: Arc<C>,
  messenger: Arc<M>,
  config: &PipelineConfig,
  clock: Arc<dyn Clock>,
) -> (Orchestrator<S, C, M>, ReviewService<S, C>)
where
  S: ReviewStore,
  C: Crawler,
  M: Messenger,
{
  build_with_queue(store, crawler, messenger, config, clock, NotificationQueue::new())
}

/// Wire a pipeline around `queue`. Orchestrators built on clones of one queue
/// drain the same pending events.
pub fn build_with_queue<S, C, M>(
  store: Arc<S>,
  crawler: Arc<C>,
  messenger: Arc<M>,
  config: &PipelineConfig,
  clock: Arc<dyn Clock>,
  queue: NotificationQueue,
) -> (Orchestrator<S, C, M>, ReviewService<S, C>)
where
  S: ReviewStore,
  C: Crawler,
  M: Messenger,
{
  let updater = update::ReviewUpdater::new(
    Arc::clone(&store),
    Arc::clone(&crawler),
    config.freshness(),
    config.crawl_timeout(),
    Arc::clone(&clock),
  );

  let scanner = scan::Scanner::new(
    Arc::clone(&store),
    updater.clone(),
    config.profile_delay(),
    Arc::clone(&clock),
  );
  let dispatcher = dispatch::Dispatcher::new(
    Arc::clone(&store),
    messenger,
    format::Formatter::new(config.star_glyph.clone(), config.recheck_window_secs),
  );
  let service = service::ReviewService::new(
    store,
    crawler,
    updater,
    queue.sender().clone(),
    config.crawl_timeout(),
    clock,
  );

  let orchestrator =
    orchestrator::Orchestrator::new(scanner, dispatcher, queue, config.idle());
  (orchestrator, service)
}

#[cfg(test)]
mod tests;
