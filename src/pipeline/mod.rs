//! Pipeline entry points for feed generation.
//!
//! - `expire_stale`: Drop listings first seen too long ago
//! - `merge_observations`: Fold a scrape into the cache store
//! - `mark_availability`: Flag listings missing from the latest scrape
//! - `project`: Select and order entries for publication
//! - `run_feed` / `run_all`: Sequence the steps for one or every feed

pub mod availability;
pub mod expire;
pub mod merge;
pub mod project;
pub mod run;

pub use availability::{AvailabilityStats, mark_availability};
pub use expire::expire_stale;
pub use merge::{MergeStats, merge_observations};
pub use project::project;
pub use run::{FeedReport, RunSummary, run_all, run_feed, run_feed_at};
