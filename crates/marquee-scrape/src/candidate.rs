//! Loosely-typed extractor output.

/// One listing as an extractor found it. Nothing is guaranteed; a candidate
/// without `original_url` is dropped before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCandidate {
  pub original_url: Option<String>,
  pub title:        Option<String>,
  pub start_time:   Option<String>,
  pub end_time:     Option<String>,
  pub venue:        Option<String>,
  pub address:      Option<String>,
  pub city:         Option<String>,
  pub description:  Option<String>,
  pub category:     Option<String>,
  pub image_url:    Option<String>,
  pub source:       Option<String>,
}

impl RawCandidate {
  pub fn has_url(&self) -> bool {
    self
      .original_url
      .as_deref()
      .is_some_and(|u| !u.trim().is_empty())
  }
}
