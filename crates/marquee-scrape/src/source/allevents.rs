//! allevents.in city listings.

use super::{
  SourceExtractor, encode_city,
  html::{CardRules, parse_cards},
};
use crate::{candidate::RawCandidate, error::ExtractionError};

const BASE: &str = "https://allevents.in";

const RULES: CardRules = CardRules {
  card:        ".event-card, .event-item, .col-event",
  title:       None,
  date:        ".date, .time, .event-date",
  venue:       ".venue, .place",
  description: ".desc, .event-desc",
  image_attrs: &["data-src", "src"],
};

pub struct Allevents;

impl SourceExtractor for Allevents {
  fn name(&self) -> &'static str { "Allevents" }

  fn url(&self, city: &str) -> String { format!("{BASE}/{}", encode_city(city)) }

  fn max_candidates(&self) -> usize { 80 }

  fn parse(&self, html: &str, city: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
    parse_cards(html, BASE, &RULES, city, self.name())
  }
}
