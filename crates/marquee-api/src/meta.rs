//! Caller details recorded alongside a lead.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{HeaderMap, header, request::Parts},
};

/// Client IP and user agent of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMeta {
  /// First `X-Forwarded-For` hop, else the peer address, else `"unknown"`.
  pub ip:         String,
  pub user_agent: Option<String>,
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
  let value = headers.get("x-forwarded-for")?.to_str().ok()?;
  let first = value.split(',').next()?.trim();
  (!first.is_empty()).then(|| first.to_owned())
}

impl<St: Send + Sync> FromRequestParts<St> for ClientMeta {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    let ip = forwarded_for(&parts.headers)
      .or_else(|| {
        parts
          .extensions
          .get::<ConnectInfo<SocketAddr>>()
          .map(|ConnectInfo(addr)| addr.ip().to_string())
      })
      .unwrap_or_else(|| "unknown".to_owned());

    let user_agent = parts
      .headers
      .get(header::USER_AGENT)
      .and_then(|v| v.to_str().ok())
      .map(str::to_owned);

    Ok(ClientMeta { ip, user_agent })
  }
}
