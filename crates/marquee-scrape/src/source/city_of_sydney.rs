//! City of Sydney "What's On".

use super::{
  SourceExtractor,
  html::{AnchorRules, parse_anchors},
};
use crate::{candidate::RawCandidate, error::ExtractionError};

const BASE: &str = "https://whatson.cityofsydney.nsw.gov.au";

const RULES: AnchorRules = AnchorRules {
  anchors:     "a[href*='/events/'], a[href*='/Event/'], .card a, .listing a",
  inner_title: "h3, h2, .title",
  meta:        "time, .date, .meta",
  venue:       ".venue, .location, .place",
  description: "p, .summary, .excerpt",
};

pub struct CityOfSydney;

impl SourceExtractor for CityOfSydney {
  fn name(&self) -> &'static str { "CityOfSydney" }

  fn url(&self, _city: &str) -> String { format!("{BASE}/") }

  fn max_candidates(&self) -> usize { 150 }

  fn parse(&self, html: &str, city: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
    parse_anchors(html, BASE, &RULES, city, self.name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn card_links_and_event_paths() {
    let page = r#"
      <div class="listing">
        <div class="card">
          <a href="/events/sydney-festival-opening"><h3></h3></a>
          <time datetime="2026-01-08">8 Jan</time>
          <span class="place">Hyde Park</span>
          <div class="summary">Free opening night.</div>
        </div>
        <div class="card"><a href="https://whatson.cityofsydney.nsw.gov.au/Event/Talks">Talks</a></div>
      </div>"#;

    let out = CityOfSydney.parse(page, "Sydney").unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(
      out[0].original_url.as_deref(),
      Some("https://whatson.cityofsydney.nsw.gov.au/events/sydney-festival-opening")
    );
    assert_eq!(out[0].title, None);
    assert_eq!(out[0].start_time.as_deref(), Some("8 Jan"));
    assert_eq!(out[0].venue.as_deref(), Some("Hyde Park"));
    assert_eq!(out[0].description.as_deref(), Some("Free opening night."));
    assert_eq!(out[1].title.as_deref(), Some("Talks"));
    assert_eq!(out[1].source.as_deref(), Some("CityOfSydney"));
  }
}
