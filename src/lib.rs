//! median-degree - Rolling median degree of a payment interaction graph.
//!
//! This library folds a stream of timestamped payments (`actor` pays
//! `target`) into an undirected graph restricted to a trailing time window,
//! and publishes the median node degree after every accepted payment.
//!
//! # Window Semantics
//!
//! - **Event time**: The window trails the latest payment timestamp seen, not the wall clock
//! - **Out of order**: Late payments inside the window are placed in timestamp order
//! - **One edge per pair**: Repeat payments refresh the pair's timestamp instead of
//!   adding a parallel edge
//! - **No isolated nodes**: A participant leaves the graph with its last edge
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        median-degree                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Reader    │──▶│   Window    │──▶│    Graph    │       │
//! │  │ (validate)  │   │ (60s, evict)│   │  (degrees)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │  Error Log  │                     │   Median    │       │
//! │  │             │                     │   Output    │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use median_degree::WindowedDegreeAggregator;
//!
//! let mut aggregator = WindowedDegreeAggregator::default();
//! let t = Utc.with_ymd_and_hms(2016, 3, 28, 23, 23, 12).unwrap();
//!
//! let update = aggregator.process(t, "Amber-Sauer", "Raffi-Antilian").unwrap();
//! assert_eq!(update.median.to_string(), "1.00");
//! ```

pub mod config;
pub mod core;
pub mod ingest;
pub mod output;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    CoreError, DegreeMedian, DegreeUpdate, Edge, InteractionGraph, SlidingWindow,
    WindowedDegreeAggregator,
};
pub use ingest::{IngestMessage, Reader, RejectReason, Rejection, Transaction};
pub use output::{ErrorLog, MedianWriter, OutputFormat};
pub use stats::{RunStats, SharedRunStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
