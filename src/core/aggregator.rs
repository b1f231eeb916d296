//! Per-event fold of the sliding window and interaction graph.
//!
//! Each accepted event runs insert, then evict, then connect, then the
//! median. The median published for event `i` reflects exactly events
//! `1..=i`.

use crate::core::error::{fmt_ts, CoreError};
use crate::core::graph::{Edge, InteractionGraph};
use crate::core::window::{Insertion, SlidingWindow};
use crate::ingest::Transaction;
use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use statrs::statistics::{Data, Median};

/// Median degree of the windowed graph, displayed with two decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DegreeMedian(f64);

impl DegreeMedian {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for DegreeMedian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for DegreeMedian {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Median of a degree multiset, or `None` when it is empty.
pub fn median_degree(degrees: &[usize]) -> Option<DegreeMedian> {
    if degrees.is_empty() {
        return None;
    }
    let data = Data::new(degrees.iter().map(|&d| d as f64).collect::<Vec<_>>());
    // The median of integers is always a multiple of one half
    let median = (data.median() * 2.0).round() / 2.0;
    Some(DegreeMedian(median))
}

/// Result published after one event has been folded in.
#[derive(Debug, Clone, Serialize)]
pub struct DegreeUpdate {
    /// Timestamp of the triggering event
    pub created_time: DateTime<Utc>,
    /// Median degree after this event
    pub median: DegreeMedian,
    /// Nodes in the graph
    pub nodes: usize,
    /// Distinct edges in the graph
    pub edges: usize,
    /// Edges evicted by this event
    pub evicted: usize,
    /// Whether the event fell behind the horizon, leaving its pair out of the window
    #[serde(skip)]
    pub late: bool,
}

/// Owns the window and graph and keeps them in lockstep.
#[derive(Debug, Clone)]
pub struct WindowedDegreeAggregator {
    window: SlidingWindow,
    graph: InteractionGraph,
    processed: u64,
}

impl Default for WindowedDegreeAggregator {
    fn default() -> Self {
        Self::with_window(SlidingWindow::default())
    }
}

impl WindowedDegreeAggregator {
    /// Create an aggregator whose window spans `horizon`.
    pub fn new(horizon: Duration) -> Self {
        Self::with_window(SlidingWindow::new(horizon))
    }

    /// Create an aggregator from a horizon expressed as a std duration.
    pub fn from_std(horizon: std::time::Duration) -> Result<Self, CoreError> {
        let horizon =
            Duration::from_std(horizon).map_err(|e| CoreError::InvalidHorizon(e.to_string()))?;
        Ok(Self::new(horizon))
    }

    fn with_window(window: SlidingWindow) -> Self {
        Self {
            window,
            graph: InteractionGraph::new(),
            processed: 0,
        }
    }

    /// Fold one event into the window and graph and return the new median.
    ///
    /// `actor` and `target` must differ; self-transactions are rejected
    /// upstream.
    pub fn process(
        &mut self,
        created_time: DateTime<Utc>,
        actor: &str,
        target: &str,
    ) -> Result<DegreeUpdate, CoreError> {
        let edge = Edge::new(actor, target);

        let insertion = self.window.insert(created_time, edge.clone());
        match insertion {
            Insertion::Refreshed { previous } => {
                tracing::trace!(edge = %edge, from = %fmt_ts(previous), "refreshing edge");
                // The pair moved inside the window; its graph edge stays put
                // unless eviction below takes it.
                if !self.graph.contains_edge(&edge) {
                    return Err(self.fail(&edge, "refreshed edge missing from graph"));
                }
            }
            Insertion::Stale => {
                tracing::debug!(
                    edge = %edge,
                    at = %fmt_ts(created_time),
                    "event older than window horizon, skipping"
                );
            }
            Insertion::Inserted => {}
        }

        let evicted = self.window.evict();
        for stale in &evicted {
            self.disconnect(stale, "evicted edge missing from graph")?;
        }

        if insertion == Insertion::Inserted && !self.graph.add_edge(&edge) {
            return Err(self.fail(&edge, "new window edge already present in graph"));
        }

        if cfg!(debug_assertions) {
            self.check_consistency()?;
        }

        self.processed += 1;
        Ok(DegreeUpdate {
            created_time,
            median: self.median()?,
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
            evicted: evicted.len(),
            late: !self.window.contains(&edge),
        })
    }

    /// Fold a validated transaction.
    pub fn process_transaction(&mut self, tx: &Transaction) -> Result<DegreeUpdate, CoreError> {
        self.process(tx.created_time, &tx.actor, &tx.target)
    }

    /// Median degree of the current graph.
    pub fn median(&self) -> Result<DegreeMedian, CoreError> {
        median_degree(&self.graph.degrees()).ok_or(CoreError::EmptyGraphQuery)
    }

    /// Verify that every windowed edge is in the graph and nothing else is.
    pub fn check_consistency(&self) -> Result<(), CoreError> {
        for (_, edge) in self.window.entries() {
            if !self.graph.contains_edge(edge) {
                return Err(self.fail(edge, "windowed edge missing from graph"));
            }
        }
        if let Some(edge) = self.graph.edges().find(|edge| !self.window.contains(edge)) {
            return Err(self.fail(&edge, "graph edge missing from window"));
        }
        Ok(())
    }

    fn disconnect(&mut self, edge: &Edge, detail: &'static str) -> Result<(), CoreError> {
        if self.graph.remove_edge(edge) {
            Ok(())
        } else {
            Err(self.fail(edge, detail))
        }
    }

    fn fail(&self, edge: &Edge, detail: &'static str) -> CoreError {
        let (a, b) = edge.endpoints();
        tracing::error!(edge = %edge, detail, "window and graph out of sync");
        CoreError::inconsistency(a, b, detail)
    }

    /// Number of events folded in so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn graph(&self) -> &InteractionGraph {
        &self.graph
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 3, 28, 23, 23, 12).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_median_formatting() {
        assert_eq!(median_degree(&[2, 4]).unwrap().to_string(), "3.00");
        assert_eq!(median_degree(&[1, 2, 1]).unwrap().to_string(), "1.00");
        assert_eq!(median_degree(&[1, 2]).unwrap().to_string(), "1.50");
        assert_eq!(median_degree(&[1, 1, 2, 2, 3, 3]).unwrap().to_string(), "2.00");
        assert_eq!(median_degree(&[7]).unwrap().to_string(), "7.00");
        assert!(median_degree(&[]).is_none());
    }

    #[test]
    fn test_empty_graph_has_no_median() {
        let aggregator = WindowedDegreeAggregator::default();
        assert_eq!(aggregator.median(), Err(CoreError::EmptyGraphQuery));
        assert_eq!(aggregator.processed(), 0);
    }

    #[test]
    fn test_first_event() {
        let mut aggregator = WindowedDegreeAggregator::default();
        let update = aggregator.process(at(0), "amber", "raffi").unwrap();

        assert_eq!(update.median.to_string(), "1.00");
        assert_eq!(update.nodes, 2);
        assert_eq!(update.edges, 1);
        assert_eq!(update.evicted, 0);
    }

    #[test]
    fn test_eviction_scenario() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(0), "A", "B").unwrap();
        aggregator.process(at(10), "B", "C").unwrap();
        let update = aggregator.process(at(70), "C", "D").unwrap();

        assert_eq!(update.evicted, 1);
        assert_eq!(update.median.to_string(), "1.00");
        assert_eq!(aggregator.graph().degree("A"), None);
        assert_eq!(aggregator.graph().degree("B"), Some(1));
        assert_eq!(aggregator.graph().degree("C"), Some(2));
        assert_eq!(aggregator.graph().degree("D"), Some(1));
    }

    #[test]
    fn test_repeat_pair_collapses() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(0), "A", "B").unwrap();
        let update = aggregator.process(at(5), "B", "A").unwrap();

        assert_eq!(update.edges, 1);
        assert_eq!(aggregator.graph().degree("A"), Some(1));
        assert_eq!(aggregator.graph().degree("B"), Some(1));
        assert_eq!(aggregator.window().len(), 1);
        assert_eq!(
            aggregator.window().timestamp_of(&Edge::new("A", "B")),
            Some(at(5))
        );
    }

    #[test]
    fn test_refresh_keeps_edge_alive() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(0), "A", "B").unwrap();
        aggregator.process(at(50), "A", "B").unwrap();
        // Without the refresh A-B would be evicted here
        let update = aggregator.process(at(100), "C", "D").unwrap();

        assert_eq!(update.evicted, 0);
        assert_eq!(update.edges, 2);
    }

    #[test]
    fn test_late_event_publishes_unchanged_median() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(100), "A", "B").unwrap();
        aggregator.process(at(101), "B", "C").unwrap();
        let before = aggregator.median().unwrap();

        let update = aggregator.process(at(5), "X", "Y").unwrap();
        assert!(update.late);
        assert_eq!(update.median, before);
        assert_eq!(aggregator.graph().degree("X"), None);
        assert_eq!(aggregator.processed(), 3);
    }

    #[test]
    fn test_late_event_inside_horizon_counts() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(100), "A", "B").unwrap();
        let update = aggregator.process(at(45), "B", "C").unwrap();

        assert!(!update.late);
        assert_eq!(update.edges, 2);
        // Degrees [1, 2, 1]
        assert_eq!(update.median.to_string(), "1.00");
    }

    #[test]
    fn test_handshake_holds_after_every_event() {
        let events = [
            (0, "A", "B"),
            (3, "A", "C"),
            (20, "C", "D"),
            (8, "B", "D"),
            (61, "A", "C"),
            (62, "E", "A"),
            (1, "Z", "Y"),
            (130, "D", "E"),
        ];
        let mut aggregator = WindowedDegreeAggregator::default();
        for (secs, a, b) in events {
            aggregator.process(at(secs), a, b).unwrap();
            let degrees = aggregator.graph().degrees();
            assert_eq!(
                degrees.iter().sum::<usize>(),
                2 * aggregator.window().len()
            );
            assert!(degrees.iter().all(|&d| d > 0));
            aggregator.check_consistency().unwrap();
        }
    }

    #[test]
    fn test_custom_horizon() {
        let mut aggregator =
            WindowedDegreeAggregator::from_std(std::time::Duration::from_secs(10)).unwrap();
        aggregator.process(at(0), "A", "B").unwrap();
        let update = aggregator.process(at(11), "C", "D").unwrap();

        assert_eq!(update.evicted, 1);
        assert_eq!(update.nodes, 2);
    }

    #[test]
    fn test_older_repeat_can_be_evicted() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(40), "A", "B").unwrap();
        aggregator.process(at(41), "B", "C").unwrap();
        let update = aggregator.process(at(20), "A", "B").unwrap();
        assert!(!update.late);
        assert_eq!(
            aggregator.window().timestamp_of(&Edge::new("A", "B")),
            Some(at(20))
        );

        // Cutoff 25 now reaches A-B at its repeated timestamp
        let update = aggregator.process(at(85), "C", "D").unwrap();
        assert_eq!(update.evicted, 1);
        assert_eq!(update.median.to_string(), "1.00");
        assert_eq!(aggregator.graph().degree("A"), None);
    }

    #[test]
    fn test_stale_repeat_removes_existing_edge() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(50), "A", "B").unwrap();
        aggregator.process(at(60), "B", "C").unwrap();
        aggregator.process(at(100), "C", "D").unwrap();

        let update = aggregator.process(at(10), "A", "B").unwrap();
        assert!(update.late);
        assert_eq!(update.evicted, 1);
        assert_eq!(update.median.to_string(), "1.00");
        assert!(!aggregator.graph().contains_edge(&Edge::new("A", "B")));
        assert_eq!(aggregator.window().len(), 2);
    }

    #[test]
    fn test_evicting_edge_missing_from_graph_fails() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(0), "A", "B").unwrap();
        aggregator.graph.remove_edge(&Edge::new("A", "B"));

        let err = aggregator.process(at(70), "C", "D").unwrap_err();
        assert_eq!(
            err,
            CoreError::inconsistency("A", "B", "evicted edge missing from graph")
        );
    }

    #[test]
    fn test_refreshing_edge_missing_from_graph_fails() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(0), "A", "B").unwrap();
        aggregator.graph.remove_edge(&Edge::new("A", "B"));

        let err = aggregator.process(at(5), "B", "A").unwrap_err();
        assert!(matches!(err, CoreError::WindowGraphInconsistency { .. }));
    }

    #[test]
    fn test_inserting_edge_already_in_graph_fails() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.graph.add_edge(&Edge::new("A", "B"));

        let err = aggregator.process(at(0), "A", "B").unwrap_err();
        assert_eq!(
            err,
            CoreError::inconsistency("A", "B", "new window edge already present in graph")
        );
        assert_eq!(aggregator.processed(), 0);
    }

    #[test]
    fn test_check_consistency_reports_untracked_graph_edge() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(0), "A", "B").unwrap();
        aggregator.graph.add_edge(&Edge::new("Y", "X"));

        let err = aggregator.check_consistency().unwrap_err();
        assert_eq!(
            err,
            CoreError::inconsistency("X", "Y", "graph edge missing from window")
        );
        assert!(err.to_string().contains("X <-> Y"));
    }

    #[test]
    fn test_check_consistency_reports_unconnected_window_edge() {
        let mut aggregator = WindowedDegreeAggregator::default();
        aggregator.process(at(0), "A", "B").unwrap();
        aggregator.process(at(1), "C", "D").unwrap();
        aggregator.graph.remove_edge(&Edge::new("C", "D"));

        let err = aggregator.check_consistency().unwrap_err();
        assert_eq!(
            err,
            CoreError::inconsistency("C", "D", "windowed edge missing from graph")
        );
    }
}
