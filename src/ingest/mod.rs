//! Input handling for median-degree.
//!
//! This module validates newline-delimited JSON payment records and feeds
//! the accepted ones, in order, to the aggregator.

pub mod parser;
pub mod reader;
pub mod types;

// Re-export commonly used types
pub use parser::{parse_line, parse_record, parse_timestamp};
pub use reader::Reader;
pub use types::{IngestError, IngestMessage, RejectReason, Rejection, Transaction};
