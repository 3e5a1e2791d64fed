//! The scrape-and-reconcile pipeline.
//!
//! Each cycle fetches every configured source in parallel, parses listing
//! pages into [`RawCandidate`]s, normalizes them and reconciles the result
//! against an [`EventStore`](marquee_core::store::EventStore) in one
//! transaction. A failing source costs only its own candidates.

#![allow(async_fn_in_trait)]

pub mod candidate;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod robots;
pub mod scheduler;
pub mod source;

pub use candidate::RawCandidate;
pub use error::{ExtractionError, FetchError, PipelineError};
pub use fetch::{Fetch, FetchClient, FetchConfig, Fetched};
pub use pipeline::{CycleReport, Pipeline, PipelineSettings};
pub use scheduler::{ScheduledJob, Scheduler};
pub use source::{Source, SourceExtractor};
