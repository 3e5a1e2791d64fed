//! CSV export of ticket requests.

use std::fmt::Write as _;

use chrono::SecondsFormat;
use marquee_core::lead::TicketRequestView;

pub const HEADER: [&str; 7] =
  ["id", "email", "consent", "event_id", "event_title", "event_url", "created_at"];

fn needs_quotes(field: &str) -> bool {
  field.contains([',', '"', '\n', '\r'])
}

fn write_row(out: &mut String, row: &[String]) {
  for (i, cell) in row.iter().enumerate() {
    if i > 0 {
      out.push(',');
    }
    if needs_quotes(cell) {
      let _ = write!(out, "\"{}\"", cell.replace('"', "\"\""));
    } else {
      out.push_str(cell);
    }
  }
  out.push_str("\r\n");
}

/// Render rows with a header line, CRLF-terminated.
pub fn render(rows: &[TicketRequestView]) -> String {
  let mut out = String::new();
  write_row(&mut out, &HEADER.map(str::to_owned));
  for view in rows {
    let r = &view.request;
    write_row(&mut out, &[
      r.id.to_string(),
      r.email.clone(),
      u8::from(r.consent).to_string(),
      r.event_id.map(|id| id.to_string()).unwrap_or_default(),
      view.event_title.clone().unwrap_or_default(),
      r.event_url.clone().unwrap_or_default(),
      r.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    ]);
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use marquee_core::lead::TicketRequest;

  use super::*;

  fn view(title: Option<&str>) -> TicketRequestView {
    TicketRequestView {
      request:     TicketRequest {
        id:                 3,
        email:              "a@b.co".into(),
        consent:            true,
        event_id:           Some(9),
        event_url:          None,
        created_at:         Utc.with_ymd_and_hms(2026, 2, 20, 9, 30, 0).unwrap(),
        confirmed:          false,
        confirm_token_hash: None,
        confirm_sent_at:    None,
        confirmed_at:       None,
        ip_address:         None,
        user_agent:         None,
      },
      event_title: title.map(Into::into),
    }
  }

  #[test]
  fn renders_header_and_rows() {
    let csv = render(&[view(Some("Jazz Night"))]);
    assert_eq!(
      csv,
      "id,email,consent,event_id,event_title,event_url,created_at\r\n\
       3,a@b.co,1,9,Jazz Night,,2026-02-20T09:30:00Z\r\n"
    );
  }

  #[test]
  fn quotes_fields_with_separators() {
    let csv = render(&[view(Some("Rock, \"Roll\"\nNight"))]);
    assert!(csv.contains("\"Rock, \"\"Roll\"\"\nNight\""));
  }
}
