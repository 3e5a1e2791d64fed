//! sydney.com event listings.

use super::{
  SourceExtractor,
  html::{AnchorRules, parse_anchors},
};
use crate::{candidate::RawCandidate, error::ExtractionError};

const BASE: &str = "https://www.sydney.com";

const RULES: AnchorRules = AnchorRules {
  anchors:     "a[href*='/events/'], a[href*='/event/'], a[class*='event']",
  inner_title: ".title, .headline, h3, h2",
  meta:        ".date, .event-date, time, .meta",
  venue:       ".venue, .location, .place",
  description: ".desc, .excerpt, p",
};

/// The page is Sydney-only; the city argument just labels candidates.
pub struct SydneyCom;

impl SourceExtractor for SydneyCom {
  fn name(&self) -> &'static str { "Sydney.com" }

  fn url(&self, _city: &str) -> String { format!("{BASE}/events") }

  fn max_candidates(&self) -> usize { 120 }

  fn parse(&self, html: &str, city: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
    parse_anchors(html, BASE, &RULES, city, self.name())
  }
}
