//! Reconciliation planner: one cycle's observations → minimal store changes.
//!
//! [`plan`] is pure. It compares the cycle's canonical events with every
//! persisted event and decides what to insert, what to refresh or update, and
//! what to retire. A store backend applies the resulting [`ReconcilePlan`] in
//! a single transaction.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::event::{CanonicalEvent, Event, EventId, ScrapedFields};

/// Events unseen for at least this long are retired.
pub const DEFAULT_STALENESS: TimeDelta = TimeDelta::days(3);

// ─── Plan ────────────────────────────────────────────────────────────────────

/// A change to an already persisted event that was observed this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventUpdate {
  pub id:           EventId,
  pub original_url: String,
  /// New scraped fields; `None` when nothing changed.
  pub fields:       Option<ScrapedFields>,
  /// The event was inactive and comes back to life.
  pub reactivate:   bool,
}

impl EventUpdate {
  /// Whether this update counts towards `updated`. Refresh-only observations
  /// just bump `last_scraped_time`.
  pub fn is_material(&self) -> bool { self.fields.is_some() || self.reactivate }
}

/// Everything one cycle will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
  /// Stamped into `last_scraped_time` of every observed event.
  pub cycle_at:    DateTime<Utc>,
  pub inserts:     Vec<CanonicalEvent>,
  pub updates:     Vec<EventUpdate>,
  pub retirements: Vec<EventId>,
}

impl ReconcilePlan {
  pub fn summary(&self) -> ReconcileSummary {
    ReconcileSummary {
      created: self.inserts.len(),
      updated: self.updates.iter().filter(|u| u.is_material()).count(),
      retired: self.retirements.len(),
    }
  }
}

/// Counts reported by a finished cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
  pub created: usize,
  pub updated: usize,
  pub retired: usize,
}

// ─── Planner ─────────────────────────────────────────────────────────────────

/// Compute the plan for one cycle.
///
/// Candidates sharing an `original_url` collapse to the last one in
/// `candidates` order. `existing` must be the full persisted set, inactive
/// events included, so that re-observation can reactivate them.
pub fn plan(
  candidates: Vec<CanonicalEvent>,
  existing: &[Event],
  cycle_at: DateTime<Utc>,
  staleness: TimeDelta,
) -> ReconcilePlan {
  let by_url: HashMap<&str, &Event> =
    existing.iter().map(|e| (e.original_url.as_str(), e)).collect();

  // Last write wins; keep first-seen order for determinism.
  let mut slot: HashMap<String, usize> = HashMap::new();
  let mut deduped: Vec<CanonicalEvent> = Vec::new();
  for candidate in candidates {
    match slot.get(&candidate.original_url) {
      Some(&i) => deduped[i] = candidate,
      None => {
        slot.insert(candidate.original_url.clone(), deduped.len());
        deduped.push(candidate);
      }
    }
  }

  let mut seen: HashSet<&str> = HashSet::new();
  let mut inserts = Vec::new();
  let mut updates = Vec::new();

  for mut candidate in deduped {
    candidate.last_scraped_time = cycle_at;
    match by_url.get(candidate.original_url.as_str()) {
      Some(stored) => {
        seen.insert(stored.original_url.as_str());
        let fields =
          (stored.fields != candidate.fields).then_some(candidate.fields);
        updates.push(EventUpdate {
          id: stored.id,
          original_url: candidate.original_url,
          fields,
          reactivate: !stored.active,
        });
      }
      None => inserts.push(candidate),
    }
  }

  let retirements = existing
    .iter()
    .filter(|e| e.active && !seen.contains(e.original_url.as_str()))
    .filter(|e| cycle_at - e.last_scraped_time >= staleness)
    .map(|e| e.id)
    .collect();

  ReconcilePlan { cycle_at, inserts, updates, retirements }
}
