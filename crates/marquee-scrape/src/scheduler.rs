//! Periodic cycle trigger.

use std::{future::Future, sync::Arc, time::Duration};

use marquee_core::store::EventStore;
use tokio::{
  sync::watch,
  task::JoinHandle,
  time::{MissedTickBehavior, interval},
};
use tracing::{error, info};

use crate::{fetch::Fetch, pipeline::Pipeline};

/// Work the scheduler fires on each tick. Must not fail; errors are the
/// job's to log.
pub trait ScheduledJob: Send + Sync + 'static {
  fn run_scheduled(&self) -> impl Future<Output = ()> + Send + '_;
}

impl<S, F> ScheduledJob for Pipeline<S, F>
where
  S: EventStore + 'static,
  F: Fetch + 'static,
{
  async fn run_scheduled(&self) {
    match self.try_run_cycle().await {
      None => info!("previous scrape cycle still running; skipping tick"),
      Some(Ok(_)) => {}
      Some(Err(e)) => error!(error = %e, "scheduled scrape cycle failed"),
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
  pub interval:     Duration,
  /// Fire once immediately instead of waiting a full interval.
  pub run_on_start: bool,
}

impl Scheduler {
  /// Fire `job` every interval until `shutdown` changes or its sender is
  /// dropped. Ticks missed while a run is in progress are skipped.
  pub fn spawn<J: ScheduledJob>(
    self,
    job: Arc<J>,
    mut shutdown: watch::Receiver<bool>,
  ) -> JoinHandle<()> {
    tokio::spawn(async move {
      let mut ticker = interval(self.interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
      if !self.run_on_start {
        // The first tick completes immediately.
        ticker.tick().await;
      }
      info!(interval = ?self.interval, "scheduler started");

      loop {
        tokio::select! {
          _ = ticker.tick() => job.run_scheduled().await,
          _ = shutdown.changed() => break,
        }
      }
      info!("scheduler stopped");
    })
  }
}
