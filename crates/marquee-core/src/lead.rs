//! Ticket request leads and their confirmation tokens.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
  Error, Result,
  event::EventId,
};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Trim `raw` and check it has the shape `local@domain.tld`.
///
/// No deliverability check is made; the confirmation link is what proves the
/// address works.
pub fn validate_email(raw: &str) -> Result<String> {
  let email = raw.trim();
  if email.is_empty() {
    return Err(Error::EmailRequired);
  }
  if !EMAIL_RE.is_match(email) {
    return Err(Error::InvalidEmail(email.to_owned()));
  }
  Ok(email.to_owned())
}

/// Lowercase hex SHA-256 of a confirmation token. Only the hash is stored.
pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

// ─── TicketRequest ───────────────────────────────────────────────────────────

/// A stored lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
  pub id:                 i64,
  pub email:              String,
  pub consent:            bool,
  pub event_id:           Option<EventId>,
  pub event_url:          Option<String>,
  pub created_at:         DateTime<Utc>,
  pub confirmed:          bool,
  #[serde(skip)]
  pub confirm_token_hash: Option<String>,
  pub confirm_sent_at:    Option<DateTime<Utc>>,
  pub confirmed_at:       Option<DateTime<Utc>>,
  pub ip_address:         Option<String>,
  pub user_agent:         Option<String>,
}

/// Input to [`LeadStore::create_ticket_request`](crate::store::LeadStore::create_ticket_request).
#[derive(Debug, Clone)]
pub struct NewTicketRequest {
  pub email:              String,
  pub consent:            bool,
  pub event_id:           Option<EventId>,
  pub event_url:          Option<String>,
  pub confirm_token_hash: String,
  pub ip_address:         Option<String>,
  pub user_agent:         Option<String>,
  pub created_at:         DateTime<Utc>,
}

/// Result of a successful confirmation lookup.
#[derive(Debug, Clone)]
pub struct Confirmation {
  pub request:         TicketRequest,
  /// `event_url` if the lead carried one, else the linked event's
  /// `original_url`.
  pub redirect_to:     Option<String>,
  /// `false` when the token had already been used.
  pub newly_confirmed: bool,
}

/// A lead as listed to admins, with the linked event's title.
#[derive(Debug, Clone, Serialize)]
pub struct TicketRequestView {
  #[serde(flatten)]
  pub request:     TicketRequest,
  pub event_title: Option<String>,
}
