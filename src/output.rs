//! Sinks for published medians and rejected records.

use crate::core::DegreeUpdate;
use crate::ingest::Rejection;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// How published medians are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One formatted median per line
    #[default]
    Text,
    /// One JSON object per line with graph size and eviction counts
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

/// Writes one line per published median.
pub struct MedianWriter<W: Write> {
    sink: W,
    format: OutputFormat,
    written: u64,
}

impl<W: Write> MedianWriter<W> {
    pub fn new(sink: W, format: OutputFormat) -> Self {
        Self {
            sink,
            format,
            written: 0,
        }
    }

    /// Write a single update.
    pub fn publish(&mut self, update: &DegreeUpdate) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.sink, "{}", update.median)?,
            OutputFormat::Jsonl => {
                serde_json::to_writer(&mut self.sink, update).map_err(std::io::Error::other)?;
                writeln!(self.sink)?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.sink.flush()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Appends rejected records, one per line, beneath a header.
pub struct ErrorLog<W: Write> {
    sink: W,
    logged: u64,
}

impl<W: Write> ErrorLog<W> {
    /// Start a log for `source_name`, writing its header line.
    pub fn new(mut sink: W, source_name: &str) -> std::io::Result<Self> {
        writeln!(sink, "{source_name} input data errors")?;
        Ok(Self { sink, logged: 0 })
    }

    /// Record one rejection as `"line <n>: <reason> <raw record>"`.
    pub fn record(&mut self, rejection: &Rejection) -> std::io::Result<()> {
        writeln!(
            self.sink,
            "line {}: {} {}",
            rejection.line_number, rejection.reason, rejection.raw
        )?;
        self.logged += 1;
        Ok(())
    }

    pub fn logged(&self) -> u64 {
        self.logged
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.sink.flush()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WindowedDegreeAggregator;
    use crate::ingest::RejectReason;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_text_output() {
        let mut aggregator = WindowedDegreeAggregator::default();
        let t = Utc.with_ymd_and_hms(2016, 3, 28, 23, 23, 12).unwrap();
        let mut writer = MedianWriter::new(Vec::new(), OutputFormat::Text);

        writer.publish(&aggregator.process(t, "a", "b").unwrap()).unwrap();
        writer.publish(&aggregator.process(t, "b", "c").unwrap()).unwrap();

        assert_eq!(writer.written(), 2);
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "1.00\n1.00\n");
    }

    #[test]
    fn test_jsonl_output() {
        let mut aggregator = WindowedDegreeAggregator::default();
        let t = Utc.with_ymd_and_hms(2016, 3, 28, 23, 23, 12).unwrap();
        let mut writer = MedianWriter::new(Vec::new(), OutputFormat::Jsonl);
        writer.publish(&aggregator.process(t, "a", "b").unwrap()).unwrap();

        let line = String::from_utf8(writer.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["median"], "1.00");
        assert_eq!(value["nodes"], 2);
        assert_eq!(value["edges"], 1);
        assert_eq!(value["evicted"], 0);
        assert_eq!(value["created_time"], "2016-03-28T23:23:12Z");
        assert!(value.get("late").is_none());
    }

    #[test]
    fn test_error_log() {
        let mut log = ErrorLog::new(Vec::new(), "venmo-trans.txt").unwrap();
        log.record(&Rejection {
            line_number: 2,
            reason: RejectReason::SelfTransaction,
            raw: r#"{"actor": "a", "target": "a"}"#.to_string(),
        })
        .unwrap();

        let text = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "venmo-trans.txt input data errors");
        assert_eq!(
            lines[1],
            r#"line 2: self-transaction error {"actor": "a", "target": "a"}"#
        );
    }
}
