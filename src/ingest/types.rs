//! Record types flowing from the input feed into the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated payment between two distinct participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// When the payment was made
    pub created_time: DateTime<Utc>,
    /// Who paid
    pub actor: String,
    /// Who was paid
    pub target: String,
}

/// Why an input record was turned away before reaching the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The line is not a JSON object with string fields
    Malformed(String),
    /// A required field is absent, or some field is empty
    MissingField(String),
    /// `created_time` is not `YYYY-MM-DDTHH:MM:SSZ`
    TimeFormat(String),
    /// `actor` and `target` are the same participant
    SelfTransaction,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Malformed(e) => write!(f, "malformed record error ({e})"),
            RejectReason::MissingField(field) => write!(f, "missing field error ({field})"),
            RejectReason::TimeFormat(value) => write!(f, "time format error ({value})"),
            RejectReason::SelfTransaction => write!(f, "self-transaction error"),
        }
    }
}

/// A rejected input line, kept for the error log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// 1-based line number in the input
    pub line_number: usize,
    pub reason: RejectReason,
    /// The offending line, verbatim
    pub raw: String,
}

/// Errors that end the input feed.
#[derive(Debug)]
pub enum IngestError {
    IoError(String),
    AlreadyRunning,
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::IoError(e) => write!(f, "IO error: {e}"),
            IngestError::AlreadyRunning => write!(f, "Reader is already running"),
        }
    }
}

impl std::error::Error for IngestError {}

/// One message on the serialised feed handed to the core.
#[derive(Debug)]
pub enum IngestMessage {
    Accepted(Transaction),
    Rejected(Rejection),
    /// Reading failed; no further messages follow
    Failed(IngestError),
    /// End of input
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(
            RejectReason::MissingField("actor".to_string()).to_string(),
            "missing field error (actor)"
        );
        assert_eq!(
            RejectReason::SelfTransaction.to_string(),
            "self-transaction error"
        );
        assert!(RejectReason::TimeFormat("2016-03-28".to_string())
            .to_string()
            .starts_with("time format error"));
    }
}
