//! eventfinda.com.au search results.

use super::{
  SourceExtractor, encode_city,
  html::{CardRules, parse_cards},
};
use crate::{candidate::RawCandidate, error::ExtractionError};

const BASE: &str = "https://www.eventfinda.com.au";

const RULES: CardRules = CardRules {
  card:        ".ef-event, .searchResult, .card",
  title:       Some(".ef-title, .title"),
  date:        ".ef-date, .date",
  venue:       ".ef-venue, .venue",
  description: ".ef-desc, .excerpt",
  image_attrs: &["src"],
};

pub struct Eventfinda;

impl SourceExtractor for Eventfinda {
  fn name(&self) -> &'static str { "Eventfinda" }

  fn url(&self, city: &str) -> String { format!("{BASE}/search?q={}", encode_city(city)) }

  fn max_candidates(&self) -> usize { 80 }

  fn parse(&self, html: &str, city: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
    parse_cards(html, BASE, &RULES, city, self.name())
  }
}
