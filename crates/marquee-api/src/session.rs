//! Admin session tokens with a fixed time-to-live.

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
  time::{Duration, Instant},
};

use uuid::Uuid;

pub struct AdminSessions {
  ttl:    Duration,
  tokens: Mutex<HashMap<String, Instant>>,
}

impl AdminSessions {
  pub fn new(ttl: Duration) -> Self { Self { ttl, tokens: Mutex::new(HashMap::new()) } }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// Mint a token valid until `now + ttl`. Expired tokens are dropped.
  pub fn issue(&self, now: Instant) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
    tokens.retain(|_, expires| *expires > now);
    tokens.insert(token.clone(), now + self.ttl);
    token
  }

  pub fn is_valid(&self, token: &str, now: Instant) -> bool {
    let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
    match tokens.get(token) {
      Some(expires) if *expires > now => true,
      Some(_) => {
        tokens.remove(token);
        false
      }
      None => false,
    }
  }

  pub fn revoke(&self, token: &str) {
    self
      .tokens
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(token);
  }
}
