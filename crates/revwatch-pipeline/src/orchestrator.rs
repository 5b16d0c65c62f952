//! The background loop: sweep, dispatch, rest, repeat.
//!
//! ```text
//! Scanning ──▶ Dispatching ──▶ Idle ──(idle elapsed)──▶ Scanning
//! ```
//!
//! The loop never terminates on its own. Faults inside a phase are logged
//! and the machine moves on; only the shutdown signal ends [`Orchestrator::run`].
//! [`supervise`] restarts a loop task that panicked. The queue lives outside
//! the orchestrator, so events enqueued before a restart are still delivered
//! by its replacement.

use std::{future::Future, pin::pin, time::Duration};

use revwatch_core::{crawl::Crawler, messaging::Messenger, store::ReviewStore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{dispatch::Dispatcher, queue::NotificationQueue, scan::Scanner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Scanning,
  Dispatching,
  Idle,
}

pub struct Orchestrator<S, C, M> {
  scanner:    Scanner<S, C>,
  dispatcher: Dispatcher<S, M>,
  queue:      NotificationQueue,
  idle:       Duration,
  phase:      Phase,
  cycles:     u64,
}

impl<S, C, M> Orchestrator<S, C, M>
where
  S: ReviewStore,
  C: Crawler,
  M: Messenger,
{
  pub fn new(
    scanner: Scanner<S, C>,
    dispatcher: Dispatcher<S, M>,
    queue: NotificationQueue,
    idle: Duration,
  ) -> Self {
    Self {
      scanner,
      dispatcher,
      queue,
      idle,
      phase: Phase::Scanning,
      cycles: 0,
    }
  }

  pub fn phase(&self) -> Phase { self.phase }

  /// Completed Scanning → Dispatching → Idle rounds.
  pub fn cycles(&self) -> u64 { self.cycles }

  /// Run the current phase to completion and advance. Returns the new phase.
  pub async fn step(&mut self) -> Phase {
    self.phase = match self.phase {
      Phase::Scanning => {
        if let Err(e) = self.scanner.run_sweep(self.queue.sender()).await {
          error!(error = %e, "sweep aborted");
        }
        Phase::Dispatching
      }
      Phase::Dispatching => {
        let mut receiver = self.queue.receiver().await;
        self.dispatcher.drain(&mut receiver).await;
        Phase::Idle
      }
      Phase::Idle => {
        tokio::time::sleep(self.idle).await;
        self.cycles += 1;
        Phase::Scanning
      }
    };
    self.phase
  }

  /// Loop until `shutdown` resolves. An in-flight phase is abandoned at
  /// shutdown; pending queue entries stay in the shared queue.
  pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
    let mut shutdown = pin!(shutdown);
    info!("review pipeline started");
    loop {
      tokio::select! {
        _ = &mut shutdown => break,
        _ = self.step() => {}
      }
    }
    info!(cycles = self.cycles, "review pipeline stopped");
  }
}

/// Keep a background loop alive. `spawn_loop` is called to start the task
/// and again after every panic, following a `restart_delay` pause. Returns
/// when the task finishes normally or is cancelled.
pub async fn supervise<F>(mut spawn_loop: F, restart_delay: Duration)
where
  F: FnMut() -> JoinHandle<()>,
{
  loop {
    match spawn_loop().await {
      Ok(()) => return,
      Err(e) if e.is_panic() => {
        error!(error = %e, "pipeline task panicked; restarting");
      }
      Err(e) => {
        warn!(error = %e, "pipeline task cancelled");
        return;
      }
    }
    tokio::time::sleep(restart_delay).await;
  }
}
