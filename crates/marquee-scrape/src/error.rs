//! Error types for `marquee-scrape`.

use thiserror::Error;

/// A page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("invalid url {url:?}: {source}")]
  InvalidUrl {
    url:    String,
    source: url::ParseError,
  },

  #[error("{url} returned HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("timed out fetching {0}")]
  Timeout(String),

  #[error("transport error fetching {url}: {source}")]
  Transport {
    url:    String,
    source: reqwest::Error,
  },

  #[error("could not build http client: {0}")]
  Client(#[source] reqwest::Error),
}

impl FetchError {
  pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::Timeout(url.to_owned())
    } else {
      Self::Transport { url: url.to_owned(), source: err }
    }
  }
}

/// A fetched page could not be turned into candidates.
#[derive(Debug, Error)]
pub enum ExtractionError {
  #[error("bad selector {css:?}: {reason}")]
  Selector { css: String, reason: String },

  #[error("invalid base url: {0}")]
  InvalidBase(#[from] url::ParseError),
}

/// A cycle could not be committed. Source failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PipelineError {
  pub(crate) fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}
