//! Demonstration of the rolling median degree over a synthetic payment feed.
//!
//! This example shows how to:
//! 1. Generate a burst of payments, some arriving out of order
//! 2. Feed them through the background reader
//! 3. Fold accepted payments into the windowed aggregator
//! 4. Watch evictions and the published median as the window slides
//!
//! Run with: cargo run --example replay_demo

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::io::Cursor;
use std::time::Duration;

use median_degree::{
    ingest::{IngestMessage, Reader},
    stats::create_shared_stats,
    WindowedDegreeAggregator,
};

const PEOPLE: [&str; 8] = [
    "Amber-Sauer",
    "Raffi-Antilian",
    "Jordan-Gruber",
    "Jamie-Korn",
    "Maryann-Berry",
    "Ying-Mo",
    "Maddie-Franklin",
    "Quinn-Ash",
];

/// Build a deterministic feed: mostly increasing timestamps with periodic
/// late arrivals and a few invalid records mixed in.
fn synthetic_feed(count: usize) -> String {
    let start = Utc.with_ymd_and_hms(2016, 3, 28, 23, 23, 12).unwrap();
    let mut lines = Vec::with_capacity(count);

    for i in 0..count {
        let actor = PEOPLE[(i * 3) % PEOPLE.len()];
        let target = PEOPLE[(i * 5 + 1) % PEOPLE.len()];
        let mut offset = (i as i64) * 7;
        if i % 6 == 5 {
            // Arrives out of order
            offset -= 45;
        }
        let ts = start + ChronoDuration::seconds(offset.max(0));
        lines.push(format!(
            r#"{{"created_time": "{}", "target": "{target}", "actor": "{actor}"}}"#,
            ts.format("%Y-%m-%dT%H:%M:%SZ")
        ));
        if i % 10 == 9 {
            lines.push(r#"{"created_time": "", "target": "x", "actor": "y"}"#.to_string());
        }
    }
    lines.join("\n")
}

fn main() {
    println!("median-degree - Replay Demo");
    println!("===========================");
    println!();

    let feed = synthetic_feed(40);
    let stats = create_shared_stats();
    let mut reader = Reader::new(stats.clone());
    let mut aggregator = WindowedDegreeAggregator::default();

    if let Err(e) = reader.start(Cursor::new(feed)) {
        eprintln!("Error starting reader: {e}");
        return;
    }

    let receiver = reader.receiver().clone();
    loop {
        match receiver.recv_timeout(Duration::from_secs(1)) {
            Ok(IngestMessage::Accepted(tx)) => {
                stats.record_accepted();
                let update = match aggregator.process_transaction(&tx) {
                    Ok(update) => update,
                    Err(e) => {
                        eprintln!("Aggregation failed: {e}");
                        break;
                    }
                };
                stats.record_evicted(update.evicted as u64);
                if update.late {
                    stats.record_late_skipped();
                }
                stats.record_published();

                println!(
                    "  [{}] {:>15} -> {:<15} median {}  ({} nodes, {} edges{}{})",
                    tx.created_time.format("%H:%M:%S"),
                    tx.actor,
                    tx.target,
                    update.median,
                    update.nodes,
                    update.edges,
                    if update.evicted > 0 {
                        format!(", evicted {}", update.evicted)
                    } else {
                        String::new()
                    },
                    if update.late { ", late" } else { "" }
                );
            }
            Ok(IngestMessage::Rejected(rejection)) => {
                println!("  line {}: rejected ({})", rejection.line_number, rejection.reason);
            }
            Ok(IngestMessage::Failed(e)) => {
                eprintln!("Read failed: {e}");
                break;
            }
            Ok(IngestMessage::Finished) => break,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }
    reader.stop();

    // Final window contents
    println!();
    println!("Window at end of feed:");
    for (ts, edge) in aggregator.window().entries() {
        println!("  {}  {edge}", ts.format("%H:%M:%S"));
    }

    // Final statistics
    println!();
    println!("{}", stats.summary());
    println!();
    println!("Demo complete!");
}
