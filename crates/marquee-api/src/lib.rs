//! JSON HTTP API for Marquee.
//!
//! Exposes an axum [`Router`] over any store implementing both
//! [`EventStore`] and [`LeadStore`], plus the pipeline used by the manual
//! scrape trigger.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = marquee_api::router(state).layer(TraceLayer::new_for_http());
//! ```

// Axum extractors are implemented with native `async fn` in traits.
#![allow(async_fn_in_trait)]

pub mod admin;
pub mod confirm;
pub mod csv;
pub mod error;
pub mod events;
pub mod leads;
pub mod limiter;
pub mod meta;
pub mod scrape;
pub mod session;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use marquee_core::store::{EventStore, LeadStore};
use marquee_scrape::{Fetch, Pipeline};

pub use confirm::{ConfirmationSender, LogSender};
pub use error::ApiError;
pub use limiter::RateLimiter;
pub use session::AdminSessions;

/// Storage the API needs: events and leads in one backend.
pub trait AppStore: EventStore + LeadStore + 'static {}

impl<T: EventStore + LeadStore + 'static> AppStore for T {}

// ─── Configuration ───────────────────────────────────────────────────────────

/// The slice of server configuration the handlers read.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Used by `GET /events` when no `city` is given.
  pub default_city:        String,
  /// Public origin used to build confirmation links.
  pub base_url:            String,
  pub admin_username:      Option<String>,
  /// argon2 PHC string.
  pub admin_password_hash: Option<String>,
  /// A fixed token accepted in place of a session.
  pub admin_token:         Option<String>,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, F> {
  pub store:    Arc<S>,
  pub pipeline: Arc<Pipeline<S, F>>,
  pub limiter:  Arc<RateLimiter>,
  pub sessions: Arc<AdminSessions>,
  pub sender:   Arc<dyn ConfirmationSender>,
  pub config:   Arc<ApiConfig>,
}

impl<S, F> Clone for AppState<S, F> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      pipeline: Arc::clone(&self.pipeline),
      limiter:  Arc::clone(&self.limiter),
      sessions: Arc::clone(&self.sessions),
      sender:   Arc::clone(&self.sender),
      config:   Arc::clone(&self.config),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router with every route nested under `/api`.
pub fn router<S, F>(state: AppState<S, F>) -> Router
where
  S: AppStore,
  F: Fetch + 'static,
{
  let api = Router::new()
    // Events
    .route("/events", get(events::list::<S, F>))
    .route("/events/{id}", patch(events::update::<S, F>))
    .route("/scrape", get(scrape::trigger::<S, F>).post(scrape::trigger::<S, F>))
    // Leads
    .route("/ticket-request", post(leads::create::<S, F>))
    .route("/ticket-request/confirm", get(leads::confirm::<S, F>))
    .route("/ticket-requests", get(leads::list::<S, F>))
    .route("/ticket-requests.csv", get(leads::export_csv::<S, F>))
    // Admin
    .route("/admin/login", post(admin::login::<S, F>))
    .route("/admin/logout", post(admin::logout::<S, F>));

  Router::new().nest("/api", api).with_state(state)
}
