//! The `EventStore` and `LeadStore` traits.
//!
//! Implemented by storage backends (e.g. `marquee-store-sqlite`). The scrape
//! pipeline and the API depend on these abstractions, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  event::{CanonicalEvent, Event, EventFlags, EventId},
  lead::{Confirmation, NewTicketRequest, TicketRequest, TicketRequestView},
  reconcile::{ReconcilePlan, ReconcileSummary},
};

// ─── Events ──────────────────────────────────────────────────────────────────

/// Durable storage for events, keyed by `original_url`.
///
/// All methods return `Send` futures so the trait can be used behind `axum`
/// handlers and spawned tasks.
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look an event up by its natural key.
  fn find_by_key<'a>(
    &'a self,
    original_url: &'a str,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + 'a;

  fn get(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Insert or overwrite the scraped attributes of one event, marking it
  /// active. `featured` is preserved on existing rows.
  fn upsert(
    &self,
    event: CanonicalEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Active events whose city contains `city` (ASCII case-insensitive),
  /// ordered by `start_time` then id. `None` lists every active event.
  fn list_active<'a>(
    &'a self,
    city: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + 'a;

  /// Every persisted event, inactive ones included.
  fn all(&self) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Change curation flags. Returns `None` if the id is unknown.
  fn set_flags(
    &self,
    id: EventId,
    flags: EventFlags,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Commit a reconciliation plan atomically: either every change lands or
  /// none does.
  fn apply(
    &self,
    plan: ReconcilePlan,
  ) -> impl Future<Output = Result<ReconcileSummary, Self::Error>> + Send + '_;
}

// ─── Leads ───────────────────────────────────────────────────────────────────

pub trait LeadStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn create_ticket_request(
    &self,
    input: NewTicketRequest,
  ) -> impl Future<Output = Result<TicketRequest, Self::Error>> + Send + '_;

  /// Record when the confirmation link went out.
  fn mark_confirmation_sent(
    &self,
    id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Confirm the request holding `token_hash`. Returns `None` for an unknown
  /// token. Confirming twice keeps the first `confirmed_at`.
  fn confirm_ticket_request<'a>(
    &'a self,
    token_hash: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Confirmation>, Self::Error>> + Send + 'a;

  /// Newest first, at most `limit` when given.
  fn list_ticket_requests(
    &self,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<TicketRequestView>, Self::Error>> + Send + '_;
}
