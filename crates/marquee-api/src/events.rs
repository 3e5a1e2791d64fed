//! Event listing and curation.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use marquee_core::event::{Event, EventFlags, EventId};
use marquee_scrape::Fetch;
use serde::Deserialize;

use crate::{AppState, AppStore, admin::Admin, error::ApiError};

#[derive(Deserialize)]
pub struct ListParams {
  pub city: Option<String>,
}

/// `GET /events?city=`
///
/// A missing `city` means the configured default city; an empty one lists
/// every active event.
pub async fn list<S, F>(
  State(state): State<AppState<S, F>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: AppStore,
  F: Fetch + 'static,
{
  let city = params
    .city
    .unwrap_or_else(|| state.config.default_city.clone());
  let events = state
    .store
    .list_active(Some(&city))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(events))
}

/// `PATCH /events/{id}`. Only `active` and `featured` are honoured; other
/// fields in the body are ignored.
pub async fn update<S, F>(
  _admin: Admin,
  State(state): State<AppState<S, F>>,
  Path(id): Path<EventId>,
  Json(flags): Json<EventFlags>,
) -> Result<Json<Event>, ApiError>
where
  S: AppStore,
  F: Fetch + 'static,
{
  if flags.is_empty() {
    return Err(ApiError::BadRequest("nothing to update".into()));
  }

  state
    .store
    .set_flags(id, flags)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("event {id}")))
}
