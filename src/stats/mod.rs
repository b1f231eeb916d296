//! Run statistics for the median-degree pipeline.
//!
//! Tracks how many records were read, accepted, rejected and published,
//! and persists cumulative totals between runs.

pub mod run;

// Re-export commonly used types
pub use run::{
    create_shared_stats, create_shared_stats_with_persistence, read_persisted, PersistedStats,
    RunSnapshot, RunStats, SharedRunStats,
};
