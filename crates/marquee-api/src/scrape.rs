//! Manual scrape trigger.

use axum::{Json, extract::State};
use marquee_scrape::{CycleReport, Fetch};
use serde::Serialize;

use crate::{AppState, AppStore, admin::Admin, error::ApiError};

#[derive(Serialize)]
pub struct ScrapeResponse {
  pub status: &'static str,
  #[serde(flatten)]
  pub report: CycleReport,
}

/// `POST|GET /scrape`. Waits behind any cycle already running.
pub async fn trigger<S, F>(
  _admin: Admin,
  State(state): State<AppState<S, F>>,
) -> Result<Json<ScrapeResponse>, ApiError>
where
  S: AppStore,
  F: Fetch + 'static,
{
  let report = state.pipeline.run_cycle().await?;
  Ok(Json(ScrapeResponse { status: "ok", report }))
}
