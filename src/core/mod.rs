//! Core functionality for median-degree.
//!
//! This module contains:
//! - The undirected interaction graph
//! - The out-of-order tolerant sliding window
//! - The aggregator that folds events into both and computes the median

pub mod aggregator;
pub mod error;
pub mod graph;
pub mod window;

// Re-export commonly used types
pub use aggregator::{median_degree, DegreeMedian, DegreeUpdate, WindowedDegreeAggregator};
pub use error::CoreError;
pub use graph::{Edge, InteractionGraph, Participant};
pub use window::{Insertion, SlidingWindow, DEFAULT_HORIZON_SECS};
