//! Trailing time window over interaction edges.
//!
//! Entries are kept in a `BTreeMap` keyed by `(timestamp, sequence)`, so the
//! window stays sorted even when events arrive out of order. A side index
//! maps each edge to its key, which gives logarithmic refresh.
//!
//! The horizon is measured from the latest timestamp in the window, never
//! from the wall clock.

use crate::core::error::fmt_ts;
use crate::core::graph::Edge;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};

/// Default retention horizon in seconds.
pub const DEFAULT_HORIZON_SECS: i64 = 60;

/// Position of an entry in the window. The sequence number keeps ties stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EntryKey {
    timestamp: DateTime<Utc>,
    seq: u64,
}

/// Outcome of offering an event to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A new pair entered the window.
    Inserted,
    /// The pair was already present and now sits at the event's timestamp,
    /// which may be older than `previous`.
    Refreshed { previous: DateTime<Utc> },
    /// A new pair older than the horizon allows. Nothing was stored.
    Stale,
}

/// Ordered set of active `(timestamp, edge)` entries, one per pair.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    horizon: Duration,
    entries: BTreeMap<EntryKey, Edge>,
    positions: HashMap<Edge, EntryKey>,
    next_seq: u64,
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_HORIZON_SECS))
    }
}

impl SlidingWindow {
    /// Create a window retaining entries within `horizon` of the latest timestamp.
    pub fn new(horizon: Duration) -> Self {
        Self {
            horizon,
            entries: BTreeMap::new(),
            positions: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Latest timestamp currently held.
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.entries.last_key_value().map(|(key, _)| key.timestamp)
    }

    /// Entries strictly before this instant fall outside the window.
    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.latest()
            .and_then(|latest| latest.checked_sub_signed(self.horizon))
    }

    /// Whether an event at `timestamp` would be evicted as soon as it landed.
    pub fn is_stale(&self, timestamp: DateTime<Utc>) -> bool {
        self.cutoff().map(|cutoff| timestamp < cutoff).unwrap_or(false)
    }

    /// Insert or refresh the entry for `edge`.
    ///
    /// A pair keeps a single entry, placed at the timestamp of its latest
    /// event in arrival order. A repeat always moves the pair, even
    /// backwards, and the next `evict` settles whether it stays. Only a new
    /// pair can be turned away as stale, since storing it would just have it
    /// evicted again.
    pub fn insert(&mut self, timestamp: DateTime<Utc>, edge: Edge) -> Insertion {
        let outcome = match self.positions.get(&edge).copied() {
            Some(existing) => {
                self.entries.remove(&existing);
                Insertion::Refreshed {
                    previous: existing.timestamp,
                }
            }
            None if self.is_stale(timestamp) => return Insertion::Stale,
            None => Insertion::Inserted,
        };

        let key = EntryKey {
            timestamp,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, edge.clone());
        self.positions.insert(edge, key);
        outcome
    }

    /// Pop every entry older than `latest - horizon`, oldest first.
    ///
    /// The latest entry is never older than the cutoff, so the window is
    /// never emptied by eviction. A pair moved back past the cutoff by an
    /// older repeat is evicted like any other entry.
    pub fn evict(&mut self) -> Vec<Edge> {
        let Some(cutoff) = self.cutoff() else {
            return Vec::new();
        };

        let mut evicted = Vec::new();
        while let Some((key, _)) = self.entries.first_key_value() {
            if key.timestamp >= cutoff {
                break;
            }
            if let Some((key, edge)) = self.entries.pop_first() {
                tracing::debug!(edge = %edge, at = %fmt_ts(key.timestamp), "evicting edge");
                self.positions.remove(&edge);
                evicted.push(edge);
            }
        }
        evicted
    }

    /// Timestamp of the active entry for `edge`, if any.
    pub fn timestamp_of(&self, edge: &Edge) -> Option<DateTime<Utc>> {
        self.positions.get(edge).map(|key| key.timestamp)
    }

    pub fn contains(&self, edge: &Edge) -> bool {
        self.positions.contains_key(edge)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active entries in ascending timestamp order.
    pub fn entries(&self) -> impl Iterator<Item = (DateTime<Utc>, &Edge)> {
        self.entries.iter().map(|(key, edge)| (key.timestamp, edge))
    }
}
