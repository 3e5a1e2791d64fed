//! Admin authentication: the extractor guarding curation routes, plus login
//! and logout.

use std::time::Instant;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json,
  body::Bytes,
  extract::{FromRequestParts, Query, State},
  http::{HeaderMap, request::Parts},
};
use marquee_scrape::Fetch;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, AppStore, error::ApiError};

const TOKEN_HEADER: &str = "x-admin-token";

/// Present in a handler's arguments means the caller is an admin.
pub struct Admin;

#[derive(Deserialize)]
struct TokenQuery {
  admin_token: Option<String>,
}

fn header_token(headers: &HeaderMap) -> Option<String> {
  headers
    .get(TOKEN_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_owned)
}

impl<S, F> FromRequestParts<AppState<S, F>> for Admin
where
  S: AppStore,
  F: Fetch + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, F>,
  ) -> Result<Self, Self::Rejection> {
    let token = header_token(&parts.headers)
      .or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
          .ok()
          .and_then(|Query(q)| q.admin_token)
      })
      .ok_or(ApiError::Unauthorized)?;

    let is_static = state.config.admin_token.as_deref() == Some(token.as_str());
    if is_static || state.sessions.is_valid(&token, Instant::now()) {
      Ok(Admin)
    } else {
      Err(ApiError::Unauthorized)
    }
  }
}

/// Check `password` against an argon2 PHC string.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|hash| Argon2::default().verify_password(password.as_bytes(), &hash))
    .is_ok()
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginBody {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
}

/// `POST /admin/login`
pub async fn login<S, F>(
  State(state): State<AppState<S, F>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AppStore,
  F: Fetch + 'static,
{
  let config = &state.config;
  let (Some(username), Some(phc)) = (&config.admin_username, &config.admin_password_hash) else {
    return Err(ApiError::Unavailable("admin not configured".into()));
  };

  if body.username != *username || !verify_password(&body.password, phc) {
    tracing::warn!(username = %body.username, "admin login rejected");
    return Err(ApiError::Unauthorized);
  }

  let token = state.sessions.issue(Instant::now());
  Ok(Json(json!({
    "ok":         true,
    "token":      token,
    "expires_in": state.sessions.ttl().as_secs(),
  })))
}

#[derive(Deserialize)]
struct LogoutBody {
  token: Option<String>,
}

/// `POST /admin/logout`. Always succeeds.
pub async fn logout<S, F>(
  State(state): State<AppState<S, F>>,
  headers: HeaderMap,
  body: Bytes,
) -> Json<Value>
where
  S: AppStore,
  F: Fetch + 'static,
{
  let from_body = serde_json::from_slice::<LogoutBody>(&body)
    .ok()
    .and_then(|b| b.token);
  if let Some(token) = from_body.or_else(|| header_token(&headers)) {
    state.sessions.revoke(&token);
  }
  Json(json!({ "ok": true }))
}

#[cfg(test)]
mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use rand_core::OsRng;

  use super::*;

  #[test]
  fn verifies_argon2_hashes() {
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
      .hash_password(b"hunter2", &salt)
      .unwrap()
      .to_string();

    assert!(verify_password("hunter2", &phc));
    assert!(!verify_password("hunter3", &phc));
    assert!(!verify_password("hunter2", "not a phc string"));
  }
}
