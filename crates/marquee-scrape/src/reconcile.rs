//! Applies one cycle's canonical events to the store.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use marquee_core::{
  event::CanonicalEvent,
  reconcile::{ReconcileSummary, plan},
  store::EventStore,
};
use tracing::debug;

use crate::error::PipelineError;

pub struct Reconciler<S> {
  store:     Arc<S>,
  staleness: TimeDelta,
}

impl<S: EventStore> Reconciler<S> {
  pub fn new(store: Arc<S>, staleness: TimeDelta) -> Self { Self { store, staleness } }

  /// Plan against the full persisted set and commit in one transaction.
  pub async fn reconcile(
    &self,
    candidates: Vec<CanonicalEvent>,
    cycle_at: DateTime<Utc>,
  ) -> Result<ReconcileSummary, PipelineError> {
    let existing = self.store.all().await.map_err(PipelineError::store)?;
    let plan = plan(candidates, &existing, cycle_at, self.staleness);

    for event in &plan.inserts {
      debug!(url = %event.original_url, "creating event");
    }
    for update in plan.updates.iter().filter(|u| u.is_material()) {
      debug!(
        url = %update.original_url,
        changed = update.fields.is_some(),
        reactivated = update.reactivate,
        "updating event"
      );
    }
    for id in &plan.retirements {
      debug!(id, "retiring stale event");
    }

    self.store.apply(plan).await.map_err(PipelineError::store)
  }
}
