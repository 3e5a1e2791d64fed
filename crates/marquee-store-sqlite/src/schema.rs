//! SQL schema for the Marquee SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for later migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS events (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    original_url      TEXT NOT NULL UNIQUE,
    title             TEXT,
    start_time        TEXT,            -- source display text, not an instant
    end_time          TEXT,
    venue             TEXT,
    address           TEXT,
    city              TEXT,
    description       TEXT,
    category          TEXT,
    image_url         TEXT,
    source            TEXT,
    last_scraped_time TEXT NOT NULL,   -- RFC 3339 UTC
    active            INTEGER NOT NULL DEFAULT 1,
    featured          INTEGER NOT NULL DEFAULT 0
);

-- event_id is not enforced; a lead may name an event this store never saw.
CREATE TABLE IF NOT EXISTS ticket_requests (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    email              TEXT NOT NULL,
    consent            INTEGER NOT NULL DEFAULT 0,
    event_id           INTEGER,
    event_url          TEXT,
    created_at         TEXT NOT NULL,
    confirmed          INTEGER NOT NULL DEFAULT 0,
    confirm_token_hash TEXT UNIQUE,    -- sha256 hex; the raw token is never stored
    confirm_sent_at    TEXT,
    confirmed_at       TEXT,
    ip_address         TEXT,
    user_agent         TEXT
);

CREATE INDEX IF NOT EXISTS events_active_start_idx ON events(active, start_time);
CREATE INDEX IF NOT EXISTS ticket_requests_created_idx ON ticket_requests(created_at);

PRAGMA user_version = 1;
";
