//! Error types for `marquee-core`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("email required")]
  EmailRequired,

  #[error("invalid email format")]
  InvalidEmail(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
