//! One scrape-and-reconcile cycle over every configured source.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use marquee_core::{reconcile::ReconcileSummary, store::EventStore};
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinSet};
use tracing::{error, info};

use crate::{
  error::PipelineError,
  fetch::Fetch,
  normalize::normalize,
  reconcile::Reconciler,
  source::{Extraction, SourceExtractor, SourceOutcome, extract},
};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
  /// City passed to every source.
  pub city:         String,
  /// Used when a candidate carries no city.
  pub default_city: String,
  pub staleness:    TimeDelta,
}

/// Per-source line of a [`CycleReport`].
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
  pub source:  &'static str,
  #[serde(flatten)]
  pub outcome: SourceOutcome,
}

/// What a finished cycle did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
  pub started_at: DateTime<Utc>,
  #[serde(flatten)]
  pub summary:    ReconcileSummary,
  pub sources:    Vec<SourceReport>,
}

/// Runs cycles. At most one cycle is in flight at a time.
pub struct Pipeline<S, F> {
  fetch:      Arc<F>,
  sources:    Vec<Arc<dyn SourceExtractor>>,
  reconciler: Reconciler<S>,
  settings:   PipelineSettings,
  run_lock:   Mutex<()>,
}

impl<S, F> Pipeline<S, F>
where
  S: EventStore + 'static,
  F: Fetch + 'static,
{
  pub fn new(
    store: Arc<S>,
    fetch: Arc<F>,
    sources: Vec<Arc<dyn SourceExtractor>>,
    settings: PipelineSettings,
  ) -> Self {
    Self {
      fetch,
      sources,
      reconciler: Reconciler::new(store, settings.staleness),
      settings,
      run_lock: Mutex::new(()),
    }
  }

  /// Run a cycle, waiting for any cycle already in progress to finish first.
  pub async fn run_cycle(&self) -> Result<CycleReport, PipelineError> {
    let _guard = self.run_lock.lock().await;
    self.run_locked().await
  }

  /// Run a cycle unless one is already in progress, in which case `None`.
  pub async fn try_run_cycle(&self) -> Option<Result<CycleReport, PipelineError>> {
    let _guard = self.run_lock.try_lock().ok()?;
    Some(self.run_locked().await)
  }

  async fn run_locked(&self) -> Result<CycleReport, PipelineError> {
    let started_at = Utc::now();
    info!(sources = self.sources.len(), city = %self.settings.city, "starting scrape cycle");

    let extractions = self.gather().await;

    let mut sources = Vec::with_capacity(extractions.len());
    let mut candidates = Vec::new();
    for extraction in extractions {
      sources.push(SourceReport { source: extraction.source, outcome: extraction.outcome });
      candidates.extend(
        extraction
          .candidates
          .into_iter()
          .filter_map(|raw| normalize(raw, &self.settings.default_city, started_at)),
      );
    }

    let summary = self.reconciler.reconcile(candidates, started_at).await?;
    info!(
      created = summary.created,
      updated = summary.updated,
      retired = summary.retired,
      "scrape cycle committed"
    );

    Ok(CycleReport { started_at, summary, sources })
  }

  /// One task per source; results come back in source order.
  async fn gather(&self) -> Vec<Extraction> {
    let mut tasks = JoinSet::new();
    for (index, extractor) in self.sources.iter().enumerate() {
      let extractor = Arc::clone(extractor);
      let fetch = Arc::clone(&self.fetch);
      let city = self.settings.city.clone();
      tasks.spawn(async move { (index, extract(&*extractor, &*fetch, &city).await) });
    }

    let mut slots: Vec<Option<Extraction>> = self.sources.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
      match joined {
        Ok((index, extraction)) => slots[index] = Some(extraction),
        Err(e) => error!(error = %e, "source task aborted"),
      }
    }

    slots
      .into_iter()
      .zip(&self.sources)
      .map(|(slot, extractor)| {
        slot.unwrap_or_else(|| Extraction {
          source:     extractor.name(),
          candidates: Vec::new(),
          outcome:    SourceOutcome::Failed { error: "task panicked".into() },
        })
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

  use chrono::TimeDelta;
  use marquee_core::{
    event::{CanonicalEvent, Event, EventFlags, EventId},
    reconcile::{DEFAULT_STALENESS, ReconcilePlan},
  };
  use marquee_store_sqlite::SqliteStore;
  use tokio::sync::Notify;

  use super::*;
  use crate::{
    candidate::RawCandidate,
    error::{ExtractionError, FetchError},
    fetch::Fetched,
    scheduler::ScheduledJob,
    source::testing::{CannedFetch, Page},
  };

  /// Lines of `url|title` at `https://{name}.test/`.
  struct LineSource(&'static str);

  impl SourceExtractor for LineSource {
    fn name(&self) -> &'static str { self.0 }

    fn url(&self, _city: &str) -> String { format!("https://{}.test/", self.0) }

    fn max_candidates(&self) -> usize { 100 }

    fn parse(&self, html: &str, _city: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
      Ok(
        html
          .lines()
          .filter_map(|l| l.split_once('|'))
          .map(|(url, title)| RawCandidate {
            original_url: Some(url.into()),
            title: Some(title.into()),
            source: Some(self.0.into()),
            ..Default::default()
          })
          .collect(),
      )
    }
  }

  struct PanickingSource;

  impl SourceExtractor for PanickingSource {
    fn name(&self) -> &'static str { "panics" }

    fn url(&self, _city: &str) -> String { "https://panics.test/".into() }

    fn max_candidates(&self) -> usize { 10 }

    fn parse(&self, _html: &str, _city: &str) -> Result<Vec<RawCandidate>, ExtractionError> {
      panic!("markup changed")
    }
  }

  fn settings() -> PipelineSettings {
    PipelineSettings {
      city:         "Sydney".into(),
      default_city: "Sydney".into(),
      staleness:    DEFAULT_STALENESS,
    }
  }

  fn line(n: &'static str) -> Arc<dyn SourceExtractor> { Arc::new(LineSource(n)) }

  async fn pipeline(
    fetch: CannedFetch,
    sources: Vec<Arc<dyn SourceExtractor>>,
  ) -> (Arc<SqliteStore>, Pipeline<SqliteStore, CannedFetch>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let p = Pipeline::new(Arc::clone(&store), Arc::new(fetch), sources, settings());
    (store, p)
  }

  fn page(lines: &[&str]) -> Page { Page::Html(lines.join("\n")) }

  #[tokio::test]
  async fn failing_source_does_not_affect_others() {
    let fetch = CannedFetch::default()
      .with("https://a.test/", page(&["https://a.test/1|A1", "https://a.test/2|A2"]))
      .with("https://b.test/", page(&["https://b.test/1|B1"]))
      .with("https://c.test/", page(&["https://c.test/1|C1"]))
      .with("https://d.test/", page(&["https://d.test/1|D1"]))
      .with("https://down.test/", Page::Status(503))
      .with("https://panics.test/", page(&["whatever"]));
    let (store, p) = pipeline(
      fetch,
      vec![
        line("a"),
        line("down"),
        line("b"),
        Arc::new(PanickingSource),
        line("c"),
        line("d"),
      ],
    )
    .await;

    let report = p.run_cycle().await.unwrap();
    assert_eq!(report.summary.created, 5);
    assert_eq!(store.all().await.unwrap().len(), 5);

    let names: Vec<_> = report.sources.iter().map(|s| s.source).collect();
    assert_eq!(names, vec!["a", "down", "b", "panics", "c", "d"]);
    assert!(matches!(report.sources[1].outcome, SourceOutcome::Failed { .. }));
    assert!(matches!(report.sources[3].outcome, SourceOutcome::Failed { .. }));
    assert_eq!(report.sources[0].outcome, SourceOutcome::Ok { candidates: 2 });
  }

  #[tokio::test]
  async fn rerun_is_idempotent_and_city_defaults() {
    let fetch = CannedFetch::default().with("https://a.test/", page(&["https://a.test/1|A1"]));
    let (store, p) = pipeline(fetch, vec![line("a")]).await;

    let first = p.run_cycle().await.unwrap();
    let second = p.run_cycle().await.unwrap();
    assert_eq!(first.summary.created, 1);
    assert_eq!(second.summary, ReconcileSummary::default());

    let event = store.find_by_key("https://a.test/1").await.unwrap().unwrap();
    assert_eq!(event.city.as_deref(), Some("Sydney"));
    assert!(event.active);
  }

  #[tokio::test]
  async fn duplicate_across_sources_later_source_wins() {
    let fetch = CannedFetch::default()
      .with("https://a.test/", page(&["https://shared.test/1|From A"]))
      .with("https://b.test/", page(&["https://shared.test/1|From B"]));
    let (store, p) = pipeline(fetch, vec![line("a"), line("b")]).await;

    let report = p.run_cycle().await.unwrap();
    assert_eq!(report.summary.created, 1);
    let event = store.find_by_key("https://shared.test/1").await.unwrap().unwrap();
    assert_eq!(event.fields.title.as_deref(), Some("From B"));
  }

  #[tokio::test]
  async fn featured_flag_survives_cycles() {
    let fetch = CannedFetch::default().with("https://a.test/", page(&["https://a.test/1|A1"]));
    let (store, p) = pipeline(fetch, vec![line("a")]).await;
    p.run_cycle().await.unwrap();

    let event = store.find_by_key("https://a.test/1").await.unwrap().unwrap();
    store
      .set_flags(event.id, EventFlags { featured: Some(true), active: None })
      .await
      .unwrap();
    p.run_cycle().await.unwrap();

    assert!(store.get(event.id).await.unwrap().unwrap().featured);
  }

  #[tokio::test]
  async fn skipped_sources_keep_existing_events_until_stale() {
    let fetch = CannedFetch::default().with("https://a.test/", Page::Disallowed);
    let (store, p) = pipeline(fetch, vec![line("a")]).await;
    store
      .upsert(CanonicalEvent {
        original_url:      "https://a.test/old".into(),
        fields:            Default::default(),
        city:              Some("Sydney".into()),
        source:            Some("a".into()),
        last_scraped_time: Utc::now() - TimeDelta::hours(1),
      })
      .await
      .unwrap();

    let report = p.run_cycle().await.unwrap();
    assert_eq!(report.sources[0].outcome, SourceOutcome::Skipped);
    assert_eq!(report.summary.retired, 0);
    assert!(store.find_by_key("https://a.test/old").await.unwrap().unwrap().active);
  }

  /// Blocks inside `fetch` until released.
  struct GatedFetch {
    entered: Notify,
    release: Notify,
    done:    AtomicBool,
  }

  impl Fetch for GatedFetch {
    async fn fetch<'a>(&'a self, _url: &'a str) -> Result<Fetched, FetchError> {
      self.entered.notify_one();
      self.release.notified().await;
      self.done.store(true, Ordering::SeqCst);
      Ok(Fetched::Content(String::new()))
    }
  }

  #[tokio::test]
  async fn scheduled_run_skips_while_a_cycle_is_in_flight() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let fetch = Arc::new(GatedFetch {
      entered: Notify::new(),
      release: Notify::new(),
      done:    AtomicBool::new(false),
    });
    let p = Arc::new(Pipeline::new(store, Arc::clone(&fetch), vec![line("a")], settings()));

    let running = tokio::spawn({
      let p = Arc::clone(&p);
      async move { p.run_cycle().await }
    });
    fetch.entered.notified().await;

    assert!(p.try_run_cycle().await.is_none());

    fetch.release.notify_one();
    running.await.unwrap().unwrap();
    assert!(fetch.done.load(Ordering::SeqCst));
  }

  // ─── Store failures ────────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  enum ApplyError {
    #[error(transparent)]
    Store(#[from] marquee_store_sqlite::Error),
    #[error("database is locked")]
    Locked,
  }

  /// Delegates to SQLite but refuses every commit.
  struct RejectsApply {
    inner:    SqliteStore,
    attempts: AtomicUsize,
  }

  impl EventStore for RejectsApply {
    type Error = ApplyError;

    async fn find_by_key<'a>(&'a self, original_url: &'a str) -> Result<Option<Event>, ApplyError> {
      Ok(self.inner.find_by_key(original_url).await?)
    }

    async fn get(&self, id: EventId) -> Result<Option<Event>, ApplyError> {
      Ok(self.inner.get(id).await?)
    }

    async fn upsert(&self, event: CanonicalEvent) -> Result<Event, ApplyError> {
      Ok(self.inner.upsert(event).await?)
    }

    async fn list_active<'a>(&'a self, city: Option<&'a str>) -> Result<Vec<Event>, ApplyError> {
      Ok(self.inner.list_active(city).await?)
    }

    async fn all(&self) -> Result<Vec<Event>, ApplyError> { Ok(self.inner.all().await?) }

    async fn set_flags(&self, id: EventId, flags: EventFlags) -> Result<Option<Event>, ApplyError> {
      Ok(self.inner.set_flags(id, flags).await?)
    }

    async fn apply(&self, _plan: ReconcilePlan) -> Result<ReconcileSummary, ApplyError> {
      self.attempts.fetch_add(1, Ordering::SeqCst);
      Err(ApplyError::Locked)
    }
  }

  #[tokio::test]
  async fn store_failure_fails_the_cycle_and_releases_the_lock() {
    let store = Arc::new(RejectsApply {
      inner:    SqliteStore::open_in_memory().await.unwrap(),
      attempts: AtomicUsize::new(0),
    });
    let fetch = CannedFetch::default().with("https://a.test/", page(&["https://a.test/1|A1"]));
    let p = Pipeline::new(Arc::clone(&store), Arc::new(fetch), vec![line("a")], settings());

    let err = p.run_cycle().await.unwrap_err();
    assert!(matches!(err, PipelineError::Store(_)));
    assert_eq!(err.to_string(), "store error: database is locked");
    assert!(store.inner.all().await.unwrap().is_empty());

    // Scheduled runs log the failure and the next one still goes ahead.
    p.run_scheduled().await;
    p.run_scheduled().await;
    assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    assert!(matches!(p.try_run_cycle().await, Some(Err(PipelineError::Store(_)))));
  }
}
