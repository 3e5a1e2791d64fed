//! Shared HTML walking for the listing extractors.
//!
//! Two page shapes cover every source: a list of event cards each holding a
//! link, and a scan of event links whose details sit in a nearby ancestor.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{candidate::RawCandidate, error::ExtractionError};

// ─── Text helpers ────────────────────────────────────────────────────────────

/// Collapse runs of whitespace into single spaces.
pub fn clean_text(input: &str) -> String {
  input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn inner_text(element: ElementRef<'_>) -> String {
  clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn non_empty(s: String) -> Option<String> { if s.is_empty() { None } else { Some(s) } }

/// Cleaned text of the first descendant matching `selector`, if non-empty.
pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
  element
    .select(selector)
    .next()
    .and_then(|node| non_empty(inner_text(node)))
}

/// First non-empty value among `attrs` on the first descendant matching
/// `selector`.
pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attrs: &[&str]) -> Option<String> {
  let el = element.select(selector).next()?;
  attrs
    .iter()
    .filter_map(|a| el.value().attr(a))
    .map(str::trim)
    .find(|v| !v.is_empty())
    .map(str::to_owned)
}

/// Resolve `href` against `base`, keeping only http(s) results.
pub fn absolute_url(base: &Url, href: &str) -> Option<String> {
  let href = href.trim();
  if href.is_empty() || href.starts_with('#') {
    return None;
  }
  let url = base.join(href).ok()?;
  matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

pub fn selector(css: &str) -> Result<Selector, ExtractionError> {
  Selector::parse(css).map_err(|e| ExtractionError::Selector {
    css:    css.to_owned(),
    reason: format!("{e:?}"),
  })
}

// ─── Card lists ──────────────────────────────────────────────────────────────

/// Selectors for a page made of event cards.
pub struct CardRules {
  pub card:        &'static str,
  /// Falls back to the link text when absent or empty.
  pub title:       Option<&'static str>,
  pub date:        &'static str,
  pub venue:       &'static str,
  pub description: &'static str,
  /// Tried in order on the card's first `img`.
  pub image_attrs: &'static [&'static str],
}

/// One candidate per card that contains a link.
pub fn parse_cards(
  html: &str,
  base: &str,
  rules: &CardRules,
  city: &str,
  source: &str,
) -> Result<Vec<RawCandidate>, ExtractionError> {
  let base = Url::parse(base)?;
  let card = selector(rules.card)?;
  let link = selector("a[href]")?;
  let title_sel = rules.title.map(selector).transpose()?;
  let date = selector(rules.date)?;
  let venue = selector(rules.venue)?;
  let description = selector(rules.description)?;
  let img = selector("img")?;

  let doc = Html::parse_document(html);
  let mut out = Vec::new();

  for c in doc.select(&card) {
    let Some(anchor) = c.select(&link).next() else {
      continue;
    };
    let Some(url) = anchor.value().attr("href").and_then(|h| absolute_url(&base, h)) else {
      continue;
    };

    let title = title_sel
      .as_ref()
      .and_then(|t| first_text(&c, t))
      .or_else(|| non_empty(inner_text(anchor)));

    out.push(RawCandidate {
      original_url: Some(url),
      title,
      start_time: first_text(&c, &date),
      venue: first_text(&c, &venue),
      description: first_text(&c, &description),
      image_url: first_attr(&c, &img, rules.image_attrs),
      city: Some(city.to_owned()),
      source: Some(source.to_owned()),
      ..Default::default()
    });
  }

  Ok(out)
}

// ─── Anchor scans ────────────────────────────────────────────────────────────

/// Selectors for a page scanned link by link.
pub struct AnchorRules {
  pub anchors:     &'static str,
  /// Looked up inside the link when its own text and `title` are empty.
  pub inner_title: &'static str,
  /// Marks the ancestor that holds the event details.
  pub meta:        &'static str,
  pub venue:       &'static str,
  pub description: &'static str,
}

/// How far up from a link to look for its card.
const ANCESTOR_DEPTH: usize = 3;

/// One candidate per distinct link.
pub fn parse_anchors(
  html: &str,
  base: &str,
  rules: &AnchorRules,
  city: &str,
  source: &str,
) -> Result<Vec<RawCandidate>, ExtractionError> {
  let base = Url::parse(base)?;
  let anchors = selector(rules.anchors)?;
  let inner_title = selector(rules.inner_title)?;
  let meta = selector(rules.meta)?;
  let venue = selector(rules.venue)?;
  let description = selector(rules.description)?;
  let img = selector("img")?;

  let doc = Html::parse_document(html);
  let mut seen = HashSet::new();
  let mut out = Vec::new();

  for a in doc.select(&anchors) {
    let Some(url) = a.value().attr("href").and_then(|h| absolute_url(&base, h)) else {
      continue;
    };
    if !seen.insert(url.clone()) {
      continue;
    }

    let title = non_empty(inner_text(a))
      .or_else(|| a.value().attr("title").and_then(|t| non_empty(clean_text(t))))
      .or_else(|| first_text(&a, &inner_title));

    let mut scope = a;
    for _ in 0..ANCESTOR_DEPTH {
      if scope.select(&meta).next().is_some() {
        break;
      }
      match scope.parent().and_then(ElementRef::wrap) {
        Some(parent) => scope = parent,
        None => break,
      }
    }

    out.push(RawCandidate {
      original_url: Some(url),
      title,
      start_time: first_text(&scope, &meta),
      venue: first_text(&scope, &venue),
      description: first_text(&scope, &description),
      image_url: first_attr(&scope, &img, &["data-src", "src"]),
      city: Some(city.to_owned()),
      source: Some(source.to_owned()),
      ..Default::default()
    });
  }

  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clean_text_collapses_whitespace() {
    assert_eq!(clean_text("  Jazz \n\t Night "), "Jazz Night");
  }

  #[test]
  fn absolute_url_resolves_and_filters() {
    let base = Url::parse("https://allevents.in").unwrap();
    assert_eq!(
      absolute_url(&base, "/sydney/jazz").as_deref(),
      Some("https://allevents.in/sydney/jazz")
    );
    assert_eq!(
      absolute_url(&base, "https://other.com/e/1").as_deref(),
      Some("https://other.com/e/1")
    );
    assert_eq!(absolute_url(&base, "mailto:a@b.co"), None);
    assert_eq!(absolute_url(&base, "#top"), None);
    assert_eq!(absolute_url(&base, "  "), None);
  }

  #[test]
  fn bad_selector_is_an_extraction_error() {
    assert!(matches!(selector("div[[["), Err(ExtractionError::Selector { .. })));
  }

  #[test]
  fn ancestor_walk_stops_at_meta() {
    let html = r#"
      <div class="outer"><span class="date">wrong</span>
        <div class="card">
          <span class="date">Fri 7pm</span>
          <div><a href="/events/1">Gig</a></div>
        </div>
      </div>"#;
    let rules = AnchorRules {
      anchors:     "a[href*='/events/']",
      inner_title: "h3",
      meta:        ".date",
      venue:       ".venue",
      description: "p",
    };
    let out = parse_anchors(html, "https://x.com", &rules, "Sydney", "X").unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].start_time.as_deref(), Some("Fri 7pm"));
  }
}
