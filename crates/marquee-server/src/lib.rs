//! Configuration for the `marquee` server binary.
//!
//! [`ServerConfig`] is deserialised from `config.toml` layered under
//! `MARQUEE_*` environment variables, then split into the settings each
//! library crate takes.

use std::{path::PathBuf, time::Duration};

use chrono::TimeDelta;
use marquee_api::{AdminSessions, ApiConfig, RateLimiter};
use marquee_scrape::{FetchConfig, PipelineSettings, Scheduler, fetch::DEFAULT_USER_AGENT};
use serde::Deserialize;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration. Only the listen address is required.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  /// Public origin for confirmation links. Defaults to `http://{host}:{port}`.
  #[serde(default)]
  pub base_url:               Option<String>,
  #[serde(default = "default_city")]
  pub default_city:           String,
  #[serde(default = "default_scrape_interval_secs")]
  pub scrape_interval_secs:   u64,
  #[serde(default = "default_staleness_days")]
  pub staleness_days:         i64,
  #[serde(default = "default_user_agent")]
  pub user_agent:             String,
  #[serde(default = "default_fetch_timeout_secs")]
  pub fetch_timeout_secs:     u64,
  #[serde(default = "default_fetch_retries")]
  pub fetch_retries:          u32,
  #[serde(default = "default_fetch_backoff_ms")]
  pub fetch_backoff_ms:       u64,
  #[serde(default = "default_rate_limit_max")]
  pub rate_limit_max:         usize,
  #[serde(default = "default_rate_limit_window_secs")]
  pub rate_limit_window_secs: u64,
  #[serde(default = "default_admin_session_ttl_secs")]
  pub admin_session_ttl_secs: u64,
  #[serde(default)]
  pub admin_username:         Option<String>,
  /// argon2 PHC string; generate with `marquee --hash-password`.
  #[serde(default)]
  pub admin_password_hash:    Option<String>,
  #[serde(default)]
  pub admin_token:            Option<String>,
  #[serde(default = "default_run_on_start")]
  pub run_on_start:           bool,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/marquee/events.db") }
fn default_city() -> String { "Sydney".to_owned() }
fn default_scrape_interval_secs() -> u64 { 30 * 60 }
fn default_staleness_days() -> i64 { 3 }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_owned() }
fn default_fetch_timeout_secs() -> u64 { 10 }
fn default_fetch_retries() -> u32 { 3 }
fn default_fetch_backoff_ms() -> u64 { 300 }
fn default_rate_limit_max() -> usize { 5 }
fn default_rate_limit_window_secs() -> u64 { 60 * 60 }
fn default_admin_session_ttl_secs() -> u64 { 60 * 60 }
fn default_run_on_start() -> bool { true }

// ─── Derived settings ────────────────────────────────────────────────────────

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn public_url(&self) -> String {
    match &self.base_url {
      Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_owned(),
      _ => format!("http://{}", self.address()),
    }
  }

  pub fn fetch_config(&self) -> FetchConfig {
    FetchConfig {
      user_agent: self.user_agent.clone(),
      timeout:    Duration::from_secs(self.fetch_timeout_secs),
      retries:    self.fetch_retries,
      backoff:    Duration::from_millis(self.fetch_backoff_ms),
      // Reloaded about once per cycle.
      robots_ttl: Duration::from_secs(self.scrape_interval_secs),
    }
  }

  pub fn pipeline_settings(&self) -> PipelineSettings {
    PipelineSettings {
      city:         self.default_city.clone(),
      default_city: self.default_city.clone(),
      staleness:    TimeDelta::days(self.staleness_days),
    }
  }

  pub fn scheduler(&self) -> Scheduler {
    Scheduler {
      interval:     Duration::from_secs(self.scrape_interval_secs.max(1)),
      run_on_start: self.run_on_start,
    }
  }

  pub fn rate_limiter(&self) -> RateLimiter {
    RateLimiter::new(self.rate_limit_max, Duration::from_secs(self.rate_limit_window_secs))
  }

  pub fn admin_sessions(&self) -> AdminSessions {
    AdminSessions::new(Duration::from_secs(self.admin_session_ttl_secs))
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      default_city:        self.default_city.clone(),
      base_url:            self.public_url(),
      admin_username:      self.admin_username.clone(),
      admin_password_hash: self.admin_password_hash.clone(),
      admin_token:         self.admin_token.clone(),
    }
  }

  /// Whether any admin credential is set.
  pub fn has_admin(&self) -> bool {
    self.admin_token.is_some()
      || (self.admin_username.is_some() && self.admin_password_hash.is_some())
  }
}
