//! Delivery of confirmation links.
//!
//! Actual mail transport is left to deployments; the shipped sender only
//! logs the link.

use tracing::info;

/// Delivers a confirmation link to a lead.
///
/// Called from a blocking thread, so implementations may do synchronous I/O.
pub trait ConfirmationSender: Send + Sync {
  /// Returns whether the message was actually delivered.
  fn send(&self, to: &str, link: &str, event_title: Option<&str>) -> bool;
}

/// Logs the link at `info` and reports it as not sent.
pub struct LogSender;

impl ConfirmationSender for LogSender {
  fn send(&self, to: &str, link: &str, event_title: Option<&str>) -> bool {
    info!(%to, %link, event = event_title.unwrap_or("-"), "confirmation link (no mail transport configured)");
    false
  }
}

/// `{base_url}/api/ticket-request/confirm?token={token}`
pub fn confirmation_link(base_url: &str, token: &str) -> String {
  format!(
    "{}/api/ticket-request/confirm?token={}",
    base_url.trim_end_matches('/'),
    urlencoding::encode(token)
  )
}
