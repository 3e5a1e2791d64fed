//! The closed set of listing sources and the shared extract operation.

mod allevents;
mod city_of_sydney;
mod eventfinda;
pub mod html;
mod skiddle;
mod sydney_com;

use std::{fmt, sync::Arc};

use serde::Serialize;
use tracing::{debug, warn};

pub use self::{
  allevents::Allevents, city_of_sydney::CityOfSydney, eventfinda::Eventfinda,
  skiddle::Skiddle, sydney_com::SydneyCom,
};
use crate::{
  candidate::RawCandidate,
  error::ExtractionError,
  fetch::{Fetch, Fetched},
};

/// One listing site.
///
/// `parse` must be pure so it can be tested against stored pages; all I/O
/// goes through [`extract`].
pub trait SourceExtractor: Send + Sync {
  fn name(&self) -> &'static str;
  fn url(&self, city: &str) -> String;
  /// Candidates beyond this many are ignored each run.
  fn max_candidates(&self) -> usize;
  fn parse(&self, html: &str, city: &str) -> Result<Vec<RawCandidate>, ExtractionError>;
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
  Allevents,
  Eventfinda,
  Skiddle,
  SydneyCom,
  CityOfSydney,
}

impl Source {
  pub const ALL: [Source; 5] = [
    Source::Allevents,
    Source::Eventfinda,
    Source::Skiddle,
    Source::SydneyCom,
    Source::CityOfSydney,
  ];

  pub fn extractor(self) -> Arc<dyn SourceExtractor> {
    match self {
      Source::Allevents => Arc::new(Allevents),
      Source::Eventfinda => Arc::new(Eventfinda),
      Source::Skiddle => Arc::new(Skiddle),
      Source::SydneyCom => Arc::new(SydneyCom),
      Source::CityOfSydney => Arc::new(CityOfSydney),
    }
  }

  /// Extractors for every source, in registry order.
  pub fn all_extractors() -> Vec<Arc<dyn SourceExtractor>> {
    Self::ALL.into_iter().map(Source::extractor).collect()
  }
}

/// URL-encode a city for use in a path segment or query value.
pub(crate) fn encode_city(city: &str) -> String {
  urlencoding::encode(city.trim()).into_owned()
}

// ─── Extract ─────────────────────────────────────────────────────────────────

/// How one source fared in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
  Ok { candidates: usize },
  /// robots.txt disallowed the listing page.
  Skipped,
  Failed { error: String },
}

impl fmt::Display for SourceOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SourceOutcome::Ok { candidates } => write!(f, "{candidates} candidates"),
      SourceOutcome::Skipped => f.write_str("skipped by robots.txt"),
      SourceOutcome::Failed { error } => write!(f, "failed: {error}"),
    }
  }
}

#[derive(Debug)]
pub struct Extraction {
  pub source:     &'static str,
  pub candidates: Vec<RawCandidate>,
  pub outcome:    SourceOutcome,
}

/// Fetch and parse one source. Never fails: fetch and parse errors are logged
/// and yield no candidates.
pub async fn extract<F: Fetch>(
  extractor: &dyn SourceExtractor,
  fetch: &F,
  city: &str,
) -> Extraction {
  let source = extractor.name();
  let url = extractor.url(city);

  let failed = |error: String| {
    warn!(source, %url, %error, "source failed; contributing no candidates");
    Extraction {
      source,
      candidates: Vec::new(),
      outcome: SourceOutcome::Failed { error },
    }
  };

  let html = match fetch.fetch(&url).await {
    Ok(Fetched::Content(html)) => html,
    Ok(Fetched::Skipped) => {
      debug!(source, %url, "skipped by robots.txt");
      return Extraction {
        source,
        candidates: Vec::new(),
        outcome: SourceOutcome::Skipped,
      };
    }
    Err(e) => return failed(e.to_string()),
  };

  let mut candidates = match extractor.parse(&html, city) {
    Ok(c) => c,
    Err(e) => return failed(e.to_string()),
  };
  candidates.truncate(extractor.max_candidates());
  candidates.retain(RawCandidate::has_url);

  debug!(source, count = candidates.len(), "extracted candidates");
  Extraction {
    source,
    outcome: SourceOutcome::Ok { candidates: candidates.len() },
    candidates,
  }
}


#[cfg(test)]
mod tests {
  use super::{
    testing::{CannedFetch, Page},
    *,
  };

  #[test]
  fn registry_has_five_distinct_sources() {
    let names: Vec<_> = Source::all_extractors().iter().map(|e| e.name()).collect();
    assert_eq!(
      names,
      vec!["Allevents", "Eventfinda", "Skiddle", "Sydney.com", "CityOfSydney"]
    );
  }

  #[test]
  fn city_is_encoded_into_urls() {
    assert_eq!(Allevents.url("Sydney"), "https://allevents.in/Sydney");
    assert_eq!(
      Eventfinda.url("New York"),
      "https://www.eventfinda.com.au/search?q=New%20York"
    );
    assert_eq!(Skiddle.url("Sydney"), "https://www.skiddle.com/whats-on/Sydney/");
  }

  #[tokio::test]
  async fn skipped_page_is_not_a_failure() {
    let fetch = CannedFetch::default().with(Allevents.url("Sydney"), Page::Disallowed);
    let out = extract(&Allevents, &fetch, "Sydney").await;
    assert_eq!(out.outcome, SourceOutcome::Skipped);
    assert!(out.candidates.is_empty());
  }

  #[tokio::test]
  async fn fetch_error_yields_no_candidates() {
    let fetch = CannedFetch::default().with(Allevents.url("Sydney"), Page::Status(500));
    let out = extract(&Allevents, &fetch, "Sydney").await;
    assert!(matches!(out.outcome, SourceOutcome::Failed { .. }));
    assert!(out.candidates.is_empty());
  }

  #[tokio::test]
  async fn candidates_are_capped() {
    let cards: String = (0..100)
      .map(|i| format!(r#"<div class="event-card"><a href="/e/{i}">Event {i}</a></div>"#))
      .collect();
    let fetch = CannedFetch::default()
      .with(Allevents.url("Sydney"), Page::Html(format!("<html><body>{cards}</body></html>")));

    let out = extract(&Allevents, &fetch, "Sydney").await;
    assert_eq!(out.candidates.len(), 80);
    assert_eq!(out.outcome, SourceOutcome::Ok { candidates: 80 });
  }
}
