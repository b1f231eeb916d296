//! Validation of newline-delimited JSON payment records.
//!
//! Checks run in a fixed order: JSON shape, empty or missing fields,
//! timestamp format, then self-transactions. The first failure wins.

use crate::ingest::types::{RejectReason, Rejection, Transaction};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Timestamp layout accepted in `created_time`.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const REQUIRED_FIELDS: [&str; 3] = ["created_time", "actor", "target"];

/// Parse and validate a single input line.
pub fn parse_record(line: &str) -> Result<Transaction, RejectReason> {
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|e| RejectReason::Malformed(e.to_string()))?;
    let Value::Object(record) = value else {
        return Err(RejectReason::Malformed("not a JSON object".to_string()));
    };

    // Any empty field counts as missing, not just the required ones
    for (key, value) in &record {
        if value.as_str().map(str::is_empty).unwrap_or(false) || value.is_null() {
            return Err(RejectReason::MissingField(key.clone()));
        }
    }

    let created_time = required_str(&record, REQUIRED_FIELDS[0])?;
    let actor = required_str(&record, REQUIRED_FIELDS[1])?;
    let target = required_str(&record, REQUIRED_FIELDS[2])?;

    let created_time = parse_timestamp(created_time)
        .ok_or_else(|| RejectReason::TimeFormat(created_time.to_string()))?;

    if actor == target {
        return Err(RejectReason::SelfTransaction);
    }

    Ok(Transaction {
        created_time,
        actor: actor.to_string(),
        target: target.to_string(),
    })
}

/// Parse a line and attach its position for the error log on failure.
pub fn parse_line(line_number: usize, line: &str) -> Result<Transaction, Rejection> {
    parse_record(line).map_err(|reason| Rejection {
        line_number,
        reason,
        raw: line.trim_end().to_string(),
    })
}

fn required_str<'a>(record: &'a Map<String, Value>, field: &str) -> Result<&'a str, RejectReason> {
    match record.get(field) {
        None => Err(RejectReason::MissingField(field.to_string())),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(RejectReason::Malformed(format!("{field} is not a string"))),
    }
}

/// Strict `YYYY-MM-DDTHH:MM:SSZ` parse.
///
/// chrono's parser tolerates variable-width fields, so the layout is
/// checked byte by byte first.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let bytes = s.as_bytes();
    if bytes.len() != 20 {
        return None;
    }
    let layout_ok = bytes.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 => b == b'-',
        10 => b == b'T',
        13 | 16 => b == b':',
        19 => b == b'Z',
        _ => b.is_ascii_digit(),
    });
    if !layout_ok {
        return None;
    }
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
