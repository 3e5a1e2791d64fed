//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that text ordering matches time ordering.

use chrono::{DateTime, SecondsFormat, Utc};
use marquee_core::{
  event::{Event, ScrapedFields},
  lead::TicketRequest,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "id, original_url, title, start_time, end_time, venue, \
   address, city, description, category, image_url, source, last_scraped_time, active, \
   featured";

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub id:                i64,
  pub original_url:      String,
  pub fields:            ScrapedFields,
  pub city:              Option<String>,
  pub source:            Option<String>,
  pub last_scraped_time: String,
  pub active:            bool,
  pub featured:          bool,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      original_url:      row.get(1)?,
      fields:            ScrapedFields {
        title:       row.get(2)?,
        start_time:  row.get(3)?,
        end_time:    row.get(4)?,
        venue:       row.get(5)?,
        address:     row.get(6)?,
        description: row.get(8)?,
        category:    row.get(9)?,
        image_url:   row.get(10)?,
      },
      city:              row.get(7)?,
      source:            row.get(11)?,
      last_scraped_time: row.get(12)?,
      active:            row.get(13)?,
      featured:          row.get(14)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      id:                self.id,
      original_url:      self.original_url,
      fields:            self.fields,
      city:              self.city,
      source:            self.source,
      last_scraped_time: decode_dt(&self.last_scraped_time)?,
      active:            self.active,
      featured:          self.featured,
    })
  }
}

// ─── Ticket requests ─────────────────────────────────────────────────────────

/// Column list matching [`RawTicketRequest::from_row`], qualified with the
/// `t` alias so it can be joined.
pub const TICKET_REQUEST_COLUMNS: &str = "t.id, t.email, t.consent, t.event_id, \
   t.event_url, t.created_at, t.confirmed, t.confirm_token_hash, t.confirm_sent_at, \
   t.confirmed_at, t.ip_address, t.user_agent";

pub struct RawTicketRequest {
  pub id:                 i64,
  pub email:              String,
  pub consent:            bool,
  pub event_id:           Option<i64>,
  pub event_url:          Option<String>,
  pub created_at:         String,
  pub confirmed:          bool,
  pub confirm_token_hash: Option<String>,
  pub confirm_sent_at:    Option<String>,
  pub confirmed_at:       Option<String>,
  pub ip_address:         Option<String>,
  pub user_agent:         Option<String>,
}

impl RawTicketRequest {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      email:              row.get(1)?,
      consent:            row.get(2)?,
      event_id:           row.get(3)?,
      event_url:          row.get(4)?,
      created_at:         row.get(5)?,
      confirmed:          row.get(6)?,
      confirm_token_hash: row.get(7)?,
      confirm_sent_at:    row.get(8)?,
      confirmed_at:       row.get(9)?,
      ip_address:         row.get(10)?,
      user_agent:         row.get(11)?,
    })
  }

  pub fn into_ticket_request(self) -> Result<TicketRequest> {
    Ok(TicketRequest {
      id:                 self.id,
      email:              self.email,
      consent:            self.consent,
      event_id:           self.event_id,
      event_url:          self.event_url,
      created_at:         decode_dt(&self.created_at)?,
      confirmed:          self.confirmed,
      confirm_token_hash: self.confirm_token_hash,
      confirm_sent_at:    decode_opt_dt(self.confirm_sent_at)?,
      confirmed_at:       decode_opt_dt(self.confirmed_at)?,
      ip_address:         self.ip_address,
      user_agent:         self.user_agent,
    })
  }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}
