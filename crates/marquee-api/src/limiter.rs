//! Per-key sliding-window rate limiting.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Mutex, PoisonError},
  time::{Duration, Instant},
};

/// Keys holding no hits inside the window are swept once the map grows past
/// this many entries.
const SWEEP_THRESHOLD: usize = 4096;

/// Allows at most `max` hits per key within any `window`.
pub struct RateLimiter {
  max:    usize,
  window: Duration,
  hits:   Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
  pub fn new(max: usize, window: Duration) -> Self {
    Self { max, window, hits: Mutex::new(HashMap::new()) }
  }

  /// Record a hit for `key` at `now` if it is within budget.
  ///
  /// Returns `false` (recording nothing) when the key is over its limit.
  pub fn check(&self, key: &str, now: Instant) -> bool {
    let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);

    if hits.len() > SWEEP_THRESHOLD {
      let window = self.window;
      hits.retain(|_, q| q.back().is_some_and(|t| now.duration_since(*t) < window));
    }

    let queue = hits.entry(key.to_owned()).or_default();
    while queue
      .front()
      .is_some_and(|t| now.duration_since(*t) >= self.window)
    {
      queue.pop_front();
    }

    if queue.len() >= self.max {
      return false;
    }
    queue.push_back(now);
    true
  }
}
