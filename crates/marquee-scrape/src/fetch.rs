//! HTTP retrieval with robots.txt checks and bounded retries.

use std::{
  collections::HashMap,
  future::Future,
  sync::Arc,
  time::{Duration, Instant},
};

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::{error::FetchError, robots::RobotsTxt};

pub const DEFAULT_USER_AGENT: &str = "MarqueeBot/1.0 (+https://example.com)";

/// Outcome of a fetch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
  Content(String),
  /// robots.txt disallows the URL for our agent.
  Skipped,
}

/// Page retrieval as the extractors see it.
pub trait Fetch: Send + Sync {
  fn fetch<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<Fetched, FetchError>> + Send + 'a;
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FetchConfig {
  pub user_agent: String,
  /// Applies to each attempt separately.
  pub timeout:    Duration,
  /// Extra attempts after the first one.
  pub retries:    u32,
  /// Delay before the first retry; doubles on each later one.
  pub backoff:    Duration,
  /// How long a successfully parsed robots.txt is reused.
  pub robots_ttl: Duration,
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      user_agent: DEFAULT_USER_AGENT.to_owned(),
      timeout:    Duration::from_secs(10),
      retries:    3,
      backoff:    Duration::from_millis(300),
      robots_ttl: Duration::from_secs(30 * 60),
    }
  }
}

/// Delay before retry number `attempt` (0-based).
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
  base.saturating_mul(1u32 << attempt.min(16))
}

fn is_retryable(status: StatusCode) -> bool {
  status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// A robots.txt lookup. Only parsed files are cached; fallback policies are
/// recomputed on the next fetch.
enum RobotsLoad {
  Parsed(RobotsTxt),
  Fallback(RobotsTxt),
}

/// The production [`Fetch`] implementation.
///
/// A parsed robots.txt is cached per origin for `robots_ttl`.
pub struct FetchClient {
  http:   reqwest::Client,
  config: FetchConfig,
  robots: Mutex<HashMap<String, (Instant, Arc<RobotsTxt>)>>,
}

impl FetchClient {
  pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
    let http = reqwest::Client::builder()
      .timeout(config.timeout)
      .user_agent(config.user_agent.clone())
      .build()
      .map_err(FetchError::Client)?;
    Ok(Self { http, config, robots: Mutex::new(HashMap::new()) })
  }

  async fn robots_for(&self, url: &Url) -> Arc<RobotsTxt> {
    let origin = url.origin().ascii_serialization();
    if let Some((loaded_at, cached)) = self.robots.lock().await.get(&origin)
      && loaded_at.elapsed() < self.config.robots_ttl
    {
      return Arc::clone(cached);
    }

    // Two sources on the same origin may both load it; the second insert wins.
    match self.load_robots(&origin).await {
      RobotsLoad::Parsed(robots) => {
        let robots = Arc::new(robots);
        self
          .robots
          .lock()
          .await
          .insert(origin, (Instant::now(), Arc::clone(&robots)));
        robots
      }
      RobotsLoad::Fallback(robots) => {
        self.robots.lock().await.remove(&origin);
        Arc::new(robots)
      }
    }
  }

  async fn load_robots(&self, origin: &str) -> RobotsLoad {
    let robots_url = format!("{origin}/robots.txt");
    let response = match self.http.get(&robots_url).send().await {
      Ok(r) => r,
      Err(e) => {
        debug!(url = %robots_url, error = %e, "robots.txt unreachable; allowing");
        return RobotsLoad::Fallback(RobotsTxt::allow_all());
      }
    };

    match response.status() {
      s if s.is_success() => match response.text().await {
        Ok(body) => RobotsLoad::Parsed(RobotsTxt::parse(&body)),
        Err(_) => RobotsLoad::Fallback(RobotsTxt::allow_all()),
      },
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
        debug!(url = %robots_url, "robots.txt access-controlled; disallowing origin");
        RobotsLoad::Fallback(RobotsTxt::disallow_all())
      }
      s if s.is_server_error() => {
        debug!(url = %robots_url, status = s.as_u16(), "robots.txt unavailable; disallowing origin");
        RobotsLoad::Fallback(RobotsTxt::disallow_all())
      }
      _ => RobotsLoad::Fallback(RobotsTxt::allow_all()),
    }
  }

  async fn get_with_retry(&self, url: &str) -> Result<String, FetchError> {
    let mut attempt = 0;
    loop {
      let err = match self.http.get(url).send().await {
        Ok(response) => {
          let status = response.status();
          if status.is_success() {
            return response
              .text()
              .await
              .map_err(|e| FetchError::from_reqwest(url, e));
          }
          let err = FetchError::Status { url: url.to_owned(), status: status.as_u16() };
          if !is_retryable(status) {
            return Err(err);
          }
          err
        }
        Err(e) => FetchError::from_reqwest(url, e),
      };

      if attempt >= self.config.retries {
        return Err(err);
      }
      let delay = backoff_delay(self.config.backoff, attempt);
      warn!(%url, attempt = attempt + 1, ?delay, error = %err, "retrying fetch");
      tokio::time::sleep(delay).await;
      attempt += 1;
    }
  }
}

impl Fetch for FetchClient {
  async fn fetch<'a>(&'a self, url: &'a str) -> Result<Fetched, FetchError> {
    let parsed = Url::parse(url)
      .map_err(|source| FetchError::InvalidUrl { url: url.to_owned(), source })?;

    let mut path = parsed.path().to_owned();
    if let Some(q) = parsed.query() {
      path.push('?');
      path.push_str(q);
    }
    if !self.robots_for(&parsed).await.is_allowed(&self.config.user_agent, &path) {
      debug!(%url, "disallowed by robots.txt");
      return Ok(Fetched::Skipped);
    }

    self.get_with_retry(url).await.map(Fetched::Content)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use axum::{Router, http::StatusCode as AxumStatus, routing::get};

  use super::*;

  #[test]
  fn backoff_doubles_from_base() {
    let base = Duration::from_millis(300);
    assert_eq!(backoff_delay(base, 0), Duration::from_millis(300));
    assert_eq!(backoff_delay(base, 1), Duration::from_millis(600));
    assert_eq!(backoff_delay(base, 2), Duration::from_millis(1200));
  }

  #[test]
  fn retryable_statuses() {
    assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
    assert!(is_retryable(StatusCode::BAD_GATEWAY));
    assert!(!is_retryable(StatusCode::NOT_FOUND));
    assert!(!is_retryable(StatusCode::FORBIDDEN));
  }

  async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
  }

  fn client() -> FetchClient {
    FetchClient::new(FetchConfig {
      backoff: Duration::from_millis(1),
      ..Default::default()
    })
    .unwrap()
  }

  #[tokio::test]
  async fn fetches_allowed_pages_and_skips_disallowed() {
    let base = serve(
      Router::new()
        .route("/robots.txt", get(|| async { "User-agent: *\nDisallow: /private" }))
        .route("/events", get(|| async { "<html>ok</html>" }))
        .route("/private/x", get(|| async { "secret" })),
    )
    .await;
    let c = client();

    assert_eq!(
      c.fetch(&format!("{base}/events")).await.unwrap(),
      Fetched::Content("<html>ok</html>".into())
    );
    assert_eq!(c.fetch(&format!("{base}/private/x")).await.unwrap(), Fetched::Skipped);
  }

  #[tokio::test]
  async fn forbidden_robots_disallows_origin() {
    let base = serve(
      Router::new()
        .route("/robots.txt", get(|| async { AxumStatus::FORBIDDEN }))
        .route("/events", get(|| async { "ok" })),
    )
    .await;
    assert_eq!(client().fetch(&format!("{base}/events")).await.unwrap(), Fetched::Skipped);
  }

  /// robots.txt answers with `first` once, then allows everything.
  async fn recovering_robots(first: AxumStatus) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let base = serve(
      Router::new()
        .route(
          "/robots.txt",
          get(move || {
            let counter = Arc::clone(&counter);
            async move {
              if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(first)
              } else {
                Ok("User-agent: *\nAllow: /")
              }
            }
          }),
        )
        .route("/events", get(|| async { "ok" })),
    )
    .await;
    (base, hits)
  }

  #[tokio::test]
  async fn forbidden_robots_is_rechecked_on_next_fetch() {
    let (base, hits) = recovering_robots(AxumStatus::FORBIDDEN).await;
    let c = client();
    let url = format!("{base}/events");

    assert_eq!(c.fetch(&url).await.unwrap(), Fetched::Skipped);
    assert_eq!(c.fetch(&url).await.unwrap(), Fetched::Content("ok".into()));
    assert_eq!(c.fetch(&url).await.unwrap(), Fetched::Content("ok".into()));
    // The parsed file is cached after the recovery.
    assert_eq!(hits.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn robots_server_error_disallows_until_it_recovers() {
    let (base, _) = recovering_robots(AxumStatus::SERVICE_UNAVAILABLE).await;
    let c = client();
    let url = format!("{base}/events");

    assert_eq!(c.fetch(&url).await.unwrap(), Fetched::Skipped);
    assert_eq!(c.fetch(&url).await.unwrap(), Fetched::Content("ok".into()));
  }

  #[tokio::test]
  async fn parsed_robots_is_reloaded_after_ttl() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let base = serve(
      Router::new()
        .route(
          "/robots.txt",
          get(move || {
            let counter = Arc::clone(&counter);
            async move {
              counter.fetch_add(1, Ordering::SeqCst);
              "User-agent: *\nDisallow: /private"
            }
          }),
        )
        .route("/events", get(|| async { "ok" })),
    )
    .await;
    let c = FetchClient::new(FetchConfig {
      robots_ttl: Duration::ZERO,
      backoff: Duration::from_millis(1),
      ..Default::default()
    })
    .unwrap();
    let url = format!("{base}/events");

    c.fetch(&url).await.unwrap();
    c.fetch(&url).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn missing_robots_allows() {
    let base = serve(Router::new().route("/events", get(|| async { "ok" }))).await;
    assert_eq!(
      client().fetch(&format!("{base}/events")).await.unwrap(),
      Fetched::Content("ok".into())
    );
  }

  #[tokio::test]
  async fn retries_server_errors_then_gives_up() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let base = serve(Router::new().route(
      "/flaky",
      get(move || {
        let counter = Arc::clone(&counter);
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          AxumStatus::SERVICE_UNAVAILABLE
        }
      }),
    ))
    .await;

    let err = client().fetch(&format!("{base}/flaky")).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 4);
  }

  #[tokio::test]
  async fn client_errors_are_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let base = serve(Router::new().route(
      "/gone",
      get(move || {
        let counter = Arc::clone(&counter);
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          AxumStatus::NOT_FOUND
        }
      }),
    ))
    .await;

    let err = client().fetch(&format!("{base}/gone")).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn invalid_url_is_an_error() {
    assert!(matches!(
      client().fetch("not a url").await,
      Err(FetchError::InvalidUrl { .. })
    ));
  }
}
