//! RawCandidate → CanonicalEvent.

use chrono::{DateTime, Utc};
use marquee_core::event::{CanonicalEvent, ScrapedFields};

use crate::candidate::RawCandidate;

/// Key the candidate by its URL, default a blank city and stamp the cycle
/// time. Every other field passes through untouched, `None` included.
pub fn normalize(
  raw: RawCandidate,
  default_city: &str,
  cycle_at: DateTime<Utc>,
) -> Option<CanonicalEvent> {
  let original_url = raw.original_url.filter(|u| !u.trim().is_empty())?;
  let city = match raw.city {
    Some(c) if !c.trim().is_empty() => c,
    _ => default_city.to_owned(),
  };

  Some(CanonicalEvent {
    original_url,
    fields: ScrapedFields {
      title:       raw.title,
      start_time:  raw.start_time,
      end_time:    raw.end_time,
      venue:       raw.venue,
      address:     raw.address,
      description: raw.description,
      category:    raw.category,
      image_url:   raw.image_url,
    },
    city: Some(city),
    source: raw.source,
    last_scraped_time: cycle_at,
  })
}
