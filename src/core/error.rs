//! Errors raised by the windowed graph core.
//!
//! Every variant here is an internal invariant violation rather than a data
//! problem. Bad input is rejected before it reaches the core.

use chrono::{DateTime, Utc};

/// Errors produced while folding events into the window and graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The window and graph disagree about which edges are active.
    WindowGraphInconsistency {
        a: String,
        b: String,
        detail: &'static str,
    },
    /// A median was requested while the graph holds no nodes.
    EmptyGraphQuery,
    /// The configured horizon cannot be represented.
    InvalidHorizon(String),
}

impl CoreError {
    pub(crate) fn inconsistency(a: &str, b: &str, detail: &'static str) -> Self {
        CoreError::WindowGraphInconsistency {
            a: a.to_string(),
            b: b.to_string(),
            detail,
        }
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::WindowGraphInconsistency { a, b, detail } => {
                write!(f, "Window/graph inconsistency on edge {a} <-> {b}: {detail}")
            }
            CoreError::EmptyGraphQuery => write!(f, "Median requested on an empty graph"),
            CoreError::InvalidHorizon(e) => write!(f, "Invalid window horizon: {e}"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Timestamp helper used in log fields.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
