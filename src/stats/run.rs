//! Run statistics for the median-degree pipeline.
//!
//! Counters are atomics so the reader thread and the aggregation loop can
//! both record into one shared instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current run.
#[derive(Debug)]
pub struct RunStats {
    /// Non-blank input lines read
    records_read: AtomicU64,
    /// Records that reached the aggregator
    accepted: AtomicU64,
    /// Records rejected by validation
    rejected: AtomicU64,
    /// Accepted events older than the window horizon
    late_skipped: AtomicU64,
    /// Edges evicted from the window
    edges_evicted: AtomicU64,
    /// Medians written to the output
    medians_published: AtomicU64,
    /// Run start time
    run_start: DateTime<Utc>,
    /// Path for persisting cumulative stats
    persist_path: Option<PathBuf>,
}

impl RunStats {
    /// Create a new, zeroed set of counters.
    pub fn new() -> Self {
        Self {
            records_read: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            late_skipped: AtomicU64::new(0),
            edges_evicted: AtomicU64::new(0),
            medians_published: AtomicU64::new(0),
            run_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create counters that are seeded from, and saved back to, `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous run stats: {e}");
        }

        stats
    }

    pub fn record_read(&self) {
        self.records_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_late_skipped(&self) {
        self.late_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch of evicted edges.
    pub fn record_evicted(&self, count: u64) {
        self.edges_evicted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.medians_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            records_read: self.records_read.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            late_skipped: self.late_skipped.load(Ordering::Relaxed),
            edges_evicted: self.edges_evicted.load(Ordering::Relaxed),
            medians_published: self.medians_published.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_secs: (Utc::now() - self.run_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Run Statistics:\n\
             - Records read: {}\n\
             - Accepted: {}\n\
             - Rejected: {}\n\
             - Late events skipped: {}\n\
             - Edges evicted: {}\n\
             - Medians published: {}\n\
             - Run duration: {} seconds",
            stats.records_read,
            stats.accepted,
            stats.rejected,
            stats.late_skipped,
            stats.edges_evicted,
            stats.medians_published,
            stats.run_duration_secs
        )
    }

    /// Save cumulative stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                records_read: stats.records_read,
                accepted: stats.accepted,
                rejected: stats.rejected,
                late_skipped: stats.late_skipped,
                edges_evicted: stats.edges_evicted,
                medians_published: stats.medians_published,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let persisted = read_persisted(path)?;

                self.records_read
                    .store(persisted.records_read, Ordering::Relaxed);
                self.accepted.store(persisted.accepted, Ordering::Relaxed);
                self.rejected.store(persisted.rejected, Ordering::Relaxed);
                self.late_skipped
                    .store(persisted.late_skipped, Ordering::Relaxed);
                self.edges_evicted
                    .store(persisted.edges_evicted, Ordering::Relaxed);
                self.medians_published
                    .store(persisted.medians_published, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub records_read: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub late_skipped: u64,
    pub edges_evicted: u64,
    pub medians_published: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedStats {
    pub records_read: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub late_skipped: u64,
    pub edges_evicted: u64,
    pub medians_published: u64,
    pub last_updated: DateTime<Utc>,
}

/// Read persisted cumulative stats, for `status`.
pub fn read_persisted(path: &std::path::Path) -> Result<PersistedStats, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

/// Thread-safe shared run statistics.
pub type SharedRunStats = Arc<RunStats>;

/// Create new shared run statistics.
pub fn create_shared_stats() -> SharedRunStats {
    Arc::new(RunStats::new())
}

/// Create new shared run statistics with persistence.
pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedRunStats {
    Arc::new(RunStats::with_persistence(path))
}
