//! Undirected interaction graph over participant identifiers.
//!
//! Nodes only exist while they have at least one neighbour, so the degree
//! multiset never contains zeros.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// An opaque participant identifier (the `actor` / `target` of a payment).
pub type Participant = String;

/// An unordered pair of distinct participants.
///
/// The endpoints are stored in sorted order so `{a, b}` and `{b, a}` hash
/// and compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Edge {
    low: Participant,
    high: Participant,
}

impl Edge {
    /// Build the unordered edge between `a` and `b`.
    pub fn new(a: impl Into<Participant>, b: impl Into<Participant>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Both endpoints, in sorted order.
    pub fn endpoints(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }

    /// Whether `participant` is one of the endpoints.
    pub fn touches(&self, participant: &str) -> bool {
        self.low == participant || self.high == participant
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <-> {}", self.low, self.high)
    }
}

/// Symmetric adjacency mapping from participant to its active neighbours.
#[derive(Debug, Default, Clone)]
pub struct InteractionGraph {
    adjacency: HashMap<Participant, HashSet<Participant>>,
}

impl InteractionGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect the two endpoints of `edge`.
    ///
    /// Returns `false` if the edge was already present. Sets collapse repeats,
    /// so an existing edge never inflates either degree.
    pub fn add_edge(&mut self, edge: &Edge) -> bool {
        let (a, b) = edge.endpoints();
        let inserted_ab = self
            .adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        let inserted_ba = self
            .adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
        inserted_ab && inserted_ba
    }

    /// Disconnect the two endpoints of `edge`, dropping nodes left isolated.
    ///
    /// Returns `false` if either direction was missing. For the aggregator
    /// that means the window and graph have drifted apart.
    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        let (a, b) = edge.endpoints();
        let removed_ab = self.detach(a, b);
        let removed_ba = self.detach(b, a);
        removed_ab && removed_ba
    }

    fn detach(&mut self, node: &str, neighbour: &str) -> bool {
        let Some(neighbours) = self.adjacency.get_mut(node) else {
            return false;
        };
        let removed = neighbours.remove(neighbour);
        if neighbours.is_empty() {
            self.adjacency.remove(node);
        }
        removed
    }

    /// Whether the graph currently connects the endpoints of `edge`.
    pub fn contains_edge(&self, edge: &Edge) -> bool {
        let (a, b) = edge.endpoints();
        self.adjacency
            .get(a)
            .map(|neighbours| neighbours.contains(b))
            .unwrap_or(false)
    }

    /// Degree of a single participant, or `None` if it has no active edges.
    pub fn degree(&self, participant: &str) -> Option<usize> {
        self.adjacency.get(participant).map(HashSet::len)
    }

    /// The degree of every node, read from the live adjacency.
    pub fn degrees(&self) -> Vec<usize> {
        self.adjacency.values().map(HashSet::len).collect()
    }

    /// Number of nodes with at least one edge.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.degrees().iter().sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Every distinct undirected edge, in no particular order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adjacency.iter().flat_map(|(node, neighbours)| {
            neighbours
                .iter()
                .filter(move |neighbour| node < *neighbour)
                .map(move |neighbour| Edge::new(node.as_str(), neighbour.as_str()))
        })
    }

    /// Neighbours of a participant, sorted for stable display.
    pub fn neighbours(&self, participant: &str) -> Vec<&str> {
        let mut neighbours: Vec<&str> = self
            .adjacency
            .get(participant)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        neighbours.sort_unstable();
        neighbours
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_is_unordered() {
        assert_eq!(Edge::new("amber", "raffi"), Edge::new("raffi", "amber"));
        assert_eq!(Edge::new("raffi", "amber").endpoints(), ("amber", "raffi"));
        assert!(Edge::new("amber", "raffi").touches("raffi"));
        assert!(!Edge::new("amber", "raffi").touches("jordan"));
    }

    #[test]
    fn test_add_edge_is_symmetric() {
        let mut graph = InteractionGraph::new();
        assert!(graph.add_edge(&Edge::new("a", "b")));

        assert_eq!(graph.degree("a"), Some(1));
        assert_eq!(graph.degree("b"), Some(1));
        assert_eq!(graph.neighbours("a"), vec!["b"]);
        assert_eq!(graph.neighbours("b"), vec!["a"]);
    }

    #[test]
    fn test_repeat_edge_does_not_inflate_degree() {
        let mut graph = InteractionGraph::new();
        assert!(graph.add_edge(&Edge::new("a", "b")));
        assert!(!graph.add_edge(&Edge::new("b", "a")));

        assert_eq!(graph.degree("a"), Some(1));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_remove_edge_drops_isolated_nodes() {
        let mut graph = InteractionGraph::new();
        graph.add_edge(&Edge::new("a", "b"));
        graph.add_edge(&Edge::new("b", "c"));

        assert!(graph.remove_edge(&Edge::new("a", "b")));
        assert_eq!(graph.degree("a"), None);
        assert_eq!(graph.degree("b"), Some(1));
        assert_eq!(graph.node_count(), 2);
        assert!(graph.degrees().iter().all(|&d| d > 0));
    }

    #[test]
    fn test_remove_missing_edge_reports_false() {
        let mut graph = InteractionGraph::new();
        graph.add_edge(&Edge::new("a", "b"));

        assert!(!graph.remove_edge(&Edge::new("a", "c")));
        // The existing edge is untouched
        assert!(graph.contains_edge(&Edge::new("a", "b")));
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_handshake_sum() {
        let mut graph = InteractionGraph::new();
        for (a, b) in [("a", "b"), ("a", "c"), ("a", "d"), ("c", "d")] {
            graph.add_edge(&Edge::new(a, b));
        }

        let mut degrees = graph.degrees();
        degrees.sort_unstable();
        assert_eq!(degrees, vec![1, 2, 2, 3]);
        assert_eq!(degrees.iter().sum::<usize>(), 2 * graph.edge_count());
    }

    #[test]
    fn test_edges_lists_each_pair_once() {
        let mut graph = InteractionGraph::new();
        for (a, b) in [("b", "a"), ("a", "c"), ("c", "b")] {
            graph.add_edge(&Edge::new(a, b));
        }

        let mut edges: Vec<Edge> = graph.edges().collect();
        edges.sort();
        assert_eq!(
            edges,
            vec![Edge::new("a", "b"), Edge::new("a", "c"), Edge::new("b", "c")]
        );
    }
}
