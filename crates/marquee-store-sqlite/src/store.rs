//! [`SqliteStore`]: the SQLite implementation of [`EventStore`] and
//! [`LeadStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use marquee_core::{
  event::{CanonicalEvent, Event, EventFlags, EventId, ScrapedFields},
  lead::{Confirmation, NewTicketRequest, TicketRequest, TicketRequestView},
  reconcile::{ReconcilePlan, ReconcileSummary},
  store::{EventStore, LeadStore},
};

use crate::{
  Result,
  encode::{
    EVENT_COLUMNS, RawEvent, RawTicketRequest, TICKET_REQUEST_COLUMNS, encode_dt,
    escape_like,
  },
  schema::SCHEMA,
};

/// Insert a new event or overwrite the scraped attributes of an existing one.
/// `city`, `source` and `featured` of an existing row are left alone.
const UPSERT_EVENT: &str = "
  INSERT INTO events (
    original_url, title, start_time, end_time, venue, address, city,
    description, category, image_url, source, last_scraped_time, active, featured
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, 0)
  ON CONFLICT(original_url) DO UPDATE SET
    title             = excluded.title,
    start_time        = excluded.start_time,
    end_time          = excluded.end_time,
    venue             = excluded.venue,
    address           = excluded.address,
    description       = excluded.description,
    category          = excluded.category,
    image_url         = excluded.image_url,
    last_scraped_time = excluded.last_scraped_time,
    active            = 1";

const UPDATE_FIELDS: &str = "
  UPDATE events SET
    title = ?1, start_time = ?2, end_time = ?3, venue = ?4, address = ?5,
    description = ?6, category = ?7, image_url = ?8,
    last_scraped_time = ?9, active = 1
  WHERE id = ?10";

fn upsert_event(conn: &rusqlite::Connection, e: &CanonicalEvent, at: &str) -> rusqlite::Result<()> {
  let f = &e.fields;
  conn.execute(
    UPSERT_EVENT,
    rusqlite::params![
      e.original_url,
      f.title,
      f.start_time,
      f.end_time,
      f.venue,
      f.address,
      e.city,
      f.description,
      f.category,
      f.image_url,
      e.source,
      at,
    ],
  )?;
  Ok(())
}

fn update_fields(
  conn: &rusqlite::Connection,
  id: EventId,
  f: &ScrapedFields,
  at: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    UPDATE_FIELDS,
    rusqlite::params![
      f.title,
      f.start_time,
      f.end_time,
      f.venue,
      f.address,
      f.description,
      f.category,
      f.image_url,
      at,
      id,
    ],
  )?;
  Ok(())
}

fn select_event_by(
  conn: &rusqlite::Connection,
  column: &str,
  value: &dyn rusqlite::ToSql,
) -> rusqlite::Result<Option<RawEvent>> {
  conn
    .query_row(
      &format!("SELECT {EVENT_COLUMNS} FROM events WHERE {column} = ?1"),
      [value],
      RawEvent::from_row,
    )
    .optional()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Marquee storage backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

#[cfg(test)]
impl SqliteStore {
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = crate::Error;

  async fn find_by_key<'a>(&'a self, original_url: &'a str) -> Result<Option<Event>> {
    let url = original_url.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_event_by(conn, "original_url", &url)?))
      .await?;
    raw.map(RawEvent::into_event).transpose()
  }

  async fn get(&self, id: EventId) -> Result<Option<Event>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_event_by(conn, "id", &id)?))
      .await?;
    raw.map(RawEvent::into_event).transpose()
  }

  async fn upsert(&self, event: CanonicalEvent) -> Result<Event> {
    let at = encode_dt(event.last_scraped_time);
    let raw = self
      .conn
      .call(move |conn| {
        upsert_event(conn, &event, &at)?;
        let row = select_event_by(conn, "original_url", &event.original_url)?;
        row.ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
      })
      .await?;
    raw.into_event()
  }

  async fn list_active<'a>(&'a self, city: Option<&'a str>) -> Result<Vec<Event>> {
    let pattern = city
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .map(|c| format!("%{}%", escape_like(c)));

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(p) = pattern {
          let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE active = 1 AND city LIKE ?1 ESCAPE '\\'
             ORDER BY start_time, id"
          ))?;
          stmt
            .query_map([p], RawEvent::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE active = 1 ORDER BY start_time, id"
          ))?;
          stmt
            .query_map([], RawEvent::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn all(&self) -> Result<Vec<Event>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn set_flags(&self, id: EventId, flags: EventFlags) -> Result<Option<Event>> {
    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE events
           SET active = COALESCE(?1, active), featured = COALESCE(?2, featured)
           WHERE id = ?3",
          rusqlite::params![flags.active, flags.featured, id],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_event_by(conn, "id", &id)?)
      })
      .await?;
    raw.map(RawEvent::into_event).transpose()
  }

  async fn apply(&self, plan: ReconcilePlan) -> Result<ReconcileSummary> {
    let expected = plan.summary();
    let at = encode_dt(plan.cycle_at);

    let retired = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        for event in &plan.inserts {
          upsert_event(&tx, event, &at)?;
        }

        for update in &plan.updates {
          match &update.fields {
            Some(fields) => update_fields(&tx, update.id, fields, &at)?,
            None => {
              tx.execute(
                "UPDATE events SET last_scraped_time = ?1, active = 1 WHERE id = ?2",
                rusqlite::params![at, update.id],
              )?;
            }
          }
        }

        let mut retired = 0;
        for id in &plan.retirements {
          retired += tx.execute(
            "UPDATE events SET active = 0 WHERE id = ?1 AND active = 1",
            [id],
          )?;
        }

        tx.commit()?;
        Ok(retired)
      })
      .await?;

    Ok(ReconcileSummary { retired, ..expected })
  }
}

// ─── LeadStore impl ──────────────────────────────────────────────────────────

impl LeadStore for SqliteStore {
  type Error = crate::Error;

  async fn create_ticket_request(&self, input: NewTicketRequest) -> Result<TicketRequest> {
    let created_at = encode_dt(input.created_at);
    let row = input.clone();

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ticket_requests (
             email, consent, event_id, event_url, created_at, confirmed,
             confirm_token_hash, ip_address, user_agent
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8)",
          rusqlite::params![
            row.email,
            row.consent,
            row.event_id,
            row.event_url,
            created_at,
            row.confirm_token_hash,
            row.ip_address,
            row.user_agent,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(TicketRequest {
      id,
      email: input.email,
      consent: input.consent,
      event_id: input.event_id,
      event_url: input.event_url,
      created_at: input.created_at,
      confirmed: false,
      confirm_token_hash: Some(input.confirm_token_hash),
      confirm_sent_at: None,
      confirmed_at: None,
      ip_address: input.ip_address,
      user_agent: input.user_agent,
    })
  }

  async fn mark_confirmation_sent(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
    let at_str = encode_dt(at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE ticket_requests SET confirm_sent_at = ?1 WHERE id = ?2",
          rusqlite::params![at_str, id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn confirm_ticket_request<'a>(
    &'a self,
    token_hash: &'a str,
    at: DateTime<Utc>,
  ) -> Result<Option<Confirmation>> {
    let hash = token_hash.to_owned();
    let at_str = encode_dt(at);

    let found: Option<(RawTicketRequest, bool, Option<String>)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let select = format!(
          "SELECT {TICKET_REQUEST_COLUMNS} FROM ticket_requests t
           WHERE t.confirm_token_hash = ?1"
        );
        let Some(before) = tx
          .query_row(&select, [&hash], RawTicketRequest::from_row)
          .optional()?
        else {
          return Ok(None);
        };

        let newly_confirmed = !before.confirmed;
        if newly_confirmed {
          tx.execute(
            "UPDATE ticket_requests SET confirmed = 1, confirmed_at = ?1 WHERE id = ?2",
            rusqlite::params![at_str, before.id],
          )?;
        }
        let request = tx.query_row(&select, [&hash], RawTicketRequest::from_row)?;

        let redirect = match (&request.event_url, request.event_id) {
          (Some(url), _) if !url.is_empty() => Some(url.clone()),
          (_, Some(event_id)) => tx
            .query_row(
              "SELECT original_url FROM events WHERE id = ?1",
              [event_id],
              |r| r.get(0),
            )
            .optional()?,
          _ => None,
        };

        tx.commit()?;
        Ok(Some((request, newly_confirmed, redirect)))
      })
      .await?;

    found
      .map(|(raw, newly_confirmed, redirect_to)| {
        Ok(Confirmation {
          request: raw.into_ticket_request()?,
          redirect_to,
          newly_confirmed,
        })
      })
      .transpose()
  }

  async fn list_ticket_requests(&self, limit: Option<usize>) -> Result<Vec<TicketRequestView>> {
    // A negative LIMIT is unbounded in SQLite.
    let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

    let rows: Vec<(RawTicketRequest, Option<String>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TICKET_REQUEST_COLUMNS}, e.title
           FROM ticket_requests t
           LEFT JOIN events e ON e.id = t.event_id
           ORDER BY t.created_at DESC, t.id DESC
           LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map([limit], |row| {
            Ok((RawTicketRequest::from_row(row)?, row.get(12)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(raw, event_title)| {
        Ok(TicketRequestView {
          request: raw.into_ticket_request()?,
          event_title,
        })
      })
      .collect()
  }
}
