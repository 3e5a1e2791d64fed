//! skiddle.com "what's on" listings.

use super::{
  SourceExtractor, encode_city,
  html::{CardRules, parse_cards},
};
use crate::{candidate::RawCandidate, error::ExtractionError};

const BASE: &str = "https://www.skiddle.com";

const RULES: CardRules = CardRules {
  card:        ".card, .searchResultsItem",
  title:       Some(".title, .eventTitle"),
  date:        ".date, .dateTime",
  venue:       ".venue, .venueName",
  description: ".description, .excerpt",
  image_attrs: &["data-src", "src"],
};

pub struct Skiddle;

impl SourceExtractor for Skiddle {
  fn name(&self) -> &'static str { "Skiddle" }

  fn url(&self, city: &str) -> String { format!("{BASE}/whats-on/{}/", encode_city(city)) }

  fn max_candidates(&self) -> usize { 80 }

  fn parse(&self, html: &str, city: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
    parse_cards(html, BASE, &RULES, city, self.name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_search_results() {
    let page = r#"
      <div class="searchResultsItem">
        <a href="/whats-on/Sydney/Club-Night/12345/">Club Night</a>
        <div class="eventTitle">Club Night: Summer Edition</div>
        <div class="dateTime">Sat 21st Feb, 10pm</div>
        <div class="venueName">Oxford Art Factory</div>
      </div>"#;

    let out = Skiddle.parse(page, "Sydney").unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title.as_deref(), Some("Club Night: Summer Edition"));
    assert_eq!(
      out[0].original_url.as_deref(),
      Some("https://www.skiddle.com/whats-on/Sydney/Club-Night/12345/")
    );
    assert_eq!(out[0].start_time.as_deref(), Some("Sat 21st Feb, 10pm"));
    assert_eq!(out[0].venue.as_deref(), Some("Oxford Art Factory"));
    assert_eq!(out[0].image_url, None);
  }
}
