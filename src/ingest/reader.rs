//! Background reader that turns an input stream into one ordered feed.
//!
//! Lines are parsed on a worker thread and handed over a bounded channel.
//! Whatever the source, the aggregator sees events strictly one at a time
//! and in input order.

use crate::ingest::parser::parse_line;
use crate::ingest::types::{IngestError, IngestMessage};
use crate::stats::SharedRunStats;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Capacity of the feed between the reader and the aggregator.
const FEED_CAPACITY: usize = 10_000;

/// Reads and validates input records on a background thread.
pub struct Reader {
    sender: Sender<IngestMessage>,
    receiver: Receiver<IngestMessage>,
    running: Arc<AtomicBool>,
    stats: SharedRunStats,
    thread_handle: Option<JoinHandle<()>>,
}

impl Reader {
    /// Create a reader that records into `stats`.
    pub fn new(stats: SharedRunStats) -> Self {
        // Bounded so a fast source cannot outrun the aggregator unchecked
        let (sender, receiver) = bounded(FEED_CAPACITY);

        Self {
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            stats,
            thread_handle: None,
        }
    }

    /// Start reading `source` in a background thread.
    pub fn start<R>(&mut self, source: R) -> Result<(), IngestError>
    where
        R: BufRead + Send + 'static,
    {
        if self.running.load(Ordering::SeqCst) {
            return Err(IngestError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let running = self.running.clone();
        let stats = self.stats.clone();

        let handle = thread::spawn(move || {
            read_loop(source, &sender, &running, &stats);
            running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop reading.
    ///
    /// A thread blocked on an interactive source (stdin) cannot be woken, so
    /// it is only joined once it has finished on its own.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }

    /// Check if the reader thread is still producing messages.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for the feed.
    pub fn receiver(&self) -> &Receiver<IngestMessage> {
        &self.receiver
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop<R: BufRead>(
    source: R,
    sender: &Sender<IngestMessage>,
    running: &AtomicBool,
    stats: &SharedRunStats,
) {
    for (index, line) in source.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Input read failed at line {}: {e}", index + 1);
                let _ = sender.send(IngestMessage::Failed(IngestError::IoError(e.to_string())));
                return;
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        stats.record_read();

        let message = match parse_line(index + 1, &line) {
            Ok(transaction) => IngestMessage::Accepted(transaction),
            Err(rejection) => {
                stats.record_rejected();
                tracing::warn!(
                    line = rejection.line_number,
                    reason = %rejection.reason,
                    "rejected input record"
                );
                IngestMessage::Rejected(rejection)
            }
        };

        if sender.send(message).is_err() {
            // Receiver dropped; nobody is listening any more
            return;
        }
    }

    let _ = sender.send(IngestMessage::Finished);
}
