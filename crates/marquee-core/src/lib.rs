//! Core types and trait definitions for the Marquee event aggregator.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Scraping, storage and the API layer all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod event;
pub mod lead;
pub mod reconcile;
pub mod store;

pub use error::{Error, Result};
