//! Event types: the canonical listing shape shared by every layer.
//!
//! An event is identified by its `original_url`, the link on the site it was
//! scraped from. Scraped attributes are overwritten on every observation; the
//! `featured` flag is curated by hand and never touched by reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned row identifier.
pub type EventId = i64;

// ─── Scraped fields ──────────────────────────────────────────────────────────

/// The attributes reconciliation compares and overwrites.
///
/// Times are the source's display text (e.g. `"Sat 20 Feb, 7pm"`); sources do
/// not agree on a format, so nothing here parses them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedFields {
  pub title:       Option<String>,
  pub start_time:  Option<String>,
  pub end_time:    Option<String>,
  pub venue:       Option<String>,
  pub address:     Option<String>,
  pub description: Option<String>,
  pub category:    Option<String>,
  pub image_url:   Option<String>,
}

impl ScrapedFields {
  /// Names of the fields that differ between `self` and `other`.
  pub fn changed_fields(&self, other: &ScrapedFields) -> Vec<&'static str> {
    let pairs = [
      ("title", &self.title, &other.title),
      ("start_time", &self.start_time, &other.start_time),
      ("end_time", &self.end_time, &other.end_time),
      ("venue", &self.venue, &other.venue),
      ("address", &self.address, &other.address),
      ("description", &self.description, &other.description),
      ("category", &self.category, &other.category),
      ("image_url", &self.image_url, &other.image_url),
    ];
    pairs
      .into_iter()
      .filter(|(_, a, b)| a != b)
      .map(|(name, _, _)| name)
      .collect()
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A persisted listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:                EventId,
  /// Unique across the store; the natural key used to match observations.
  pub original_url:      String,
  #[serde(flatten)]
  pub fields:            ScrapedFields,
  pub city:              Option<String>,
  /// Name of the extractor that first observed the event.
  pub source:            Option<String>,
  /// When the event was last seen by a reconciliation cycle.
  pub last_scraped_time: DateTime<Utc>,
  pub active:            bool,
  pub featured:          bool,
}

// ─── CanonicalEvent ──────────────────────────────────────────────────────────

/// A normalized observation, ready to be reconciled against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
  pub original_url:      String,
  #[serde(flatten)]
  pub fields:            ScrapedFields,
  pub city:              Option<String>,
  pub source:            Option<String>,
  pub last_scraped_time: DateTime<Utc>,
}

// ─── Flags ───────────────────────────────────────────────────────────────────

/// The only attributes the update endpoint may change.
///
/// `None` leaves the stored value as it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFlags {
  pub active:   Option<bool>,
  pub featured: Option<bool>,
}

impl EventFlags {
  pub fn is_empty(&self) -> bool { self.active.is_none() && self.featured.is_none() }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn fields(title: &str) -> ScrapedFields {
    ScrapedFields {
      title: Some(title.into()),
      venue: Some("Town Hall".into()),
      ..Default::default()
    }
  }

  #[test]
  fn changed_fields_lists_only_differences() {
    let a = fields("Jazz Night");
    let mut b = fields("Jazz Night (late show)");
    b.image_url = Some("https://img.example/1.jpg".into());

    assert_eq!(a.changed_fields(&b), vec!["title", "image_url"]);
    assert!(a.changed_fields(&a.clone()).is_empty());
  }

  #[test]
  fn some_to_none_counts_as_change() {
    let a = fields("Jazz Night");
    let mut b = a.clone();
    b.venue = None;
    assert_eq!(a.changed_fields(&b), vec!["venue"]);
  }

  #[test]
  fn event_serialises_flat() {
    let event = Event {
      id:                7,
      original_url:      "https://a.com/1".into(),
      fields:            fields("Jazz Night"),
      city:              Some("Sydney".into()),
      source:            Some("Allevents".into()),
      last_scraped_time: Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap(),
      active:            true,
      featured:          false,
    };

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["title"], "Jazz Night");
    assert_eq!(json["venue"], "Town Hall");
    assert_eq!(json["original_url"], "https://a.com/1");
    assert!(json.get("fields").is_none());
  }
}
