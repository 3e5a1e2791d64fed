//! Ticket-request capture, confirmation and admin export.

use std::{sync::Arc, time::Instant};

use axum::{
  Json,
  extract::{Query, State},
  http::header,
  response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use marquee_core::{
  event::EventId,
  lead::{NewTicketRequest, TicketRequestView, hash_token, validate_email},
};
use marquee_scrape::Fetch;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  AppState, AppStore,
  admin::Admin,
  confirm::confirmation_link,
  csv,
  error::ApiError,
  meta::ClientMeta,
};

/// Rows returned by the admin JSON listing.
pub const LIST_LIMIT: usize = 1000;

const CONFIRMED_PAGE: &str = "<!doctype html>\
<html><head><meta charset=\"utf-8\"><title>Email confirmed</title></head>\
<body><h1>Email confirmed</h1><p>Thanks, your email is confirmed.</p></body></html>";

#[derive(Deserialize)]
pub struct TicketRequestBody {
  pub email:        Option<String>,
  #[serde(default)]
  pub consent:      bool,
  pub event_id:     Option<EventId>,
  pub event_url:    Option<String>,
  /// Accepted in place of `event_url`.
  pub original_url: Option<String>,
}

/// `POST /ticket-request`
pub async fn create<S, F>(
  State(state): State<AppState<S, F>>,
  meta: ClientMeta,
  Json(body): Json<TicketRequestBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AppStore,
  F: Fetch + 'static,
{
  let email = validate_email(body.email.as_deref().unwrap_or_default())?;

  if !state.limiter.check(&meta.ip, Instant::now()) {
    warn!(ip = %meta.ip, "ticket request rate limited");
    return Err(ApiError::RateLimited);
  }

  let event_url = body
    .event_url
    .or(body.original_url)
    .map(|u| u.trim().to_owned())
    .filter(|u| !u.is_empty());

  let token = Uuid::new_v4().simple().to_string();
  let request = state
    .store
    .create_ticket_request(NewTicketRequest {
      email,
      consent: body.consent,
      event_id: body.event_id,
      event_url: event_url.clone(),
      confirm_token_hash: hash_token(&token),
      ip_address: Some(meta.ip),
      user_agent: meta.user_agent,
      created_at: Utc::now(),
    })
    .await
    .map_err(ApiError::store)?;
  info!(id = request.id, event_id = ?request.event_id, "ticket request stored");

  let title = match request.event_id {
    Some(id) => state
      .store
      .get(id)
      .await
      .map_err(ApiError::store)?
      .and_then(|e| e.fields.title),
    None => None,
  };

  let store = Arc::clone(&state.store);
  let sender = Arc::clone(&state.sender);
  let link = confirmation_link(&state.config.base_url, &token);
  let (id, to) = (request.id, request.email);
  tokio::spawn(async move {
    let sent = tokio::task::spawn_blocking(move || sender.send(&to, &link, title.as_deref()))
      .await
      .unwrap_or(false);
    if sent {
      if let Err(e) = store.mark_confirmation_sent(id, Utc::now()).await {
        warn!(id, error = %e, "failed to record confirmation send");
      }
    }
  });

  Ok(Json(json!({
    "ok":                true,
    "redirect":          event_url,
    "confirmation_sent": false,
  })))
}

#[derive(Deserialize)]
pub struct ConfirmParams {
  pub token: Option<String>,
}

/// `GET /ticket-request/confirm?token=`
pub async fn confirm<S, F>(
  State(state): State<AppState<S, F>>,
  Query(params): Query<ConfirmParams>,
) -> Result<Response, ApiError>
where
  S: AppStore,
  F: Fetch + 'static,
{
  let token = params
    .token
    .filter(|t| !t.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest("missing token".into()))?;

  let confirmation = state
    .store
    .confirm_ticket_request(&hash_token(token.trim()), Utc::now())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("invalid token".into()))?;

  if confirmation.newly_confirmed {
    info!(id = confirmation.request.id, "ticket request confirmed");
  }

  Ok(match confirmation.redirect_to {
    Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
      Redirect::to(&url).into_response()
    }
    _ => Html(CONFIRMED_PAGE).into_response(),
  })
}

async fn newest<S, F>(
  state: &AppState<S, F>,
  limit: Option<usize>,
) -> Result<Vec<TicketRequestView>, ApiError>
where
  S: AppStore,
  F: Fetch + 'static,
{
  state
    .store
    .list_ticket_requests(limit)
    .await
    .map_err(ApiError::store)
}

/// `GET /ticket-requests`
pub async fn list<S, F>(
  _admin: Admin,
  State(state): State<AppState<S, F>>,
) -> Result<Json<Vec<TicketRequestView>>, ApiError>
where
  S: AppStore,
  F: Fetch + 'static,
{
  newest(&state, Some(LIST_LIMIT)).await.map(Json)
}

/// `GET /ticket-requests.csv`. Exports every request.
pub async fn export_csv<S, F>(
  _admin: Admin,
  State(state): State<AppState<S, F>>,
) -> Result<Response, ApiError>
where
  S: AppStore,
  F: Fetch + 'static,
{
  let rows = newest(&state, None).await?;
  Ok(
    (
      [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
        (header::CONTENT_DISPOSITION, "attachment; filename=ticket_requests.csv"),
      ],
      csv::render(&rows),
    )
      .into_response(),
  )
}
