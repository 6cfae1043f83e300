//! An undirected social graph over named vertices.
//!
//! The graph is built once from an edge list and is read-only while a simulation runs.
//! Adjacency is always symmetric: adding the edge `a - b` records `b` as a neighbor of `a` and
//! `a` as a neighbor of `b`. Vertices and neighbor sets iterate in insertion order, so a graph
//! built from the same edge list always yields the same orders, which keeps seeded runs
//! reproducible.
use crate::error::ContagionError;
use crate::hashing::{IndexMap, IndexSet};

/// Identifier of an individual in the graph.
pub type Vertex = String;

/// The neighbors of a single vertex, in the order the edges were added.
pub type Neighbors = IndexSet<Vertex>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph {
    adjacency: IndexMap<Vertex, Neighbors>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Graph::default()
    }

    /// Builds a graph from `(a, b)` pairs, as produced by an edge-list loader.
    pub fn from_edges<I, A, B>(edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut graph = Graph::new();
        for (a, b) in edges {
            graph.add_edge(a.as_ref(), b.as_ref());
        }
        graph
    }

    /// Inserts a vertex with no neighbors. Does nothing if it already exists.
    pub fn add_vertex(&mut self, vertex: &str) {
        if !self.adjacency.contains_key(vertex) {
            self.adjacency.insert(vertex.to_string(), Neighbors::default());
        }
    }

    /// Inserts `a` and `b` if absent and links them in both directions. Adding an edge that
    /// already exists changes nothing. A self-loop only registers the vertex, since an
    /// individual never counts as their own contact.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        self.add_vertex(a);
        self.add_vertex(b);
        if a == b {
            return;
        }
        // Both entries exist now.
        if let Some(neighbors) = self.adjacency.get_mut(a) {
            neighbors.insert(b.to_string());
        }
        if let Some(neighbors) = self.adjacency.get_mut(b) {
            neighbors.insert(a.to_string());
        }
    }

    /// Returns the neighbor set of `vertex`.
    ///
    /// # Errors
    ///
    /// Returns `ContagionError::NotFound` if `vertex` is not part of the graph.
    pub fn neighbors(&self, vertex: &str) -> Result<&Neighbors, ContagionError> {
        self.adjacency
            .get(vertex)
            .ok_or_else(|| ContagionError::not_found(vertex))
    }

    /// Returns the number of neighbors of `vertex`.
    ///
    /// # Errors
    ///
    /// Returns `ContagionError::NotFound` if `vertex` is not part of the graph.
    pub fn degree(&self, vertex: &str) -> Result<usize, ContagionError> {
        self.neighbors(vertex).map(IndexSet::len)
    }

    /// All vertex identifiers in insertion order.
    pub fn vertices(&self) -> impl ExactSizeIterator<Item = &Vertex> + '_ {
        self.adjacency.keys()
    }

    #[must_use]
    pub fn contains(&self, vertex: &str) -> bool {
        self.adjacency.contains_key(vertex)
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(IndexSet::len).sum::<usize>() / 2
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Finds every vertex with exactly `degree` neighbors.
    #[must_use]
    pub fn find_vertices_by_degree(&self, degree: usize) -> Vec<&Vertex> {
        self.adjacency
            .iter()
            .filter(|(_, neighbors)| neighbors.len() == degree)
            .map(|(vertex, _)| vertex)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(neighbors: &Neighbors) -> Vec<&str> {
        neighbors.iter().map(String::as_str).collect()
    }

    #[test]
    fn add_edge() {
        let mut graph = Graph::new();
        graph.add_edge("A", "B");

        assert_eq!(names(graph.neighbors("A").unwrap()), vec!["B"]);
        assert_eq!(names(graph.neighbors("B").unwrap()), vec!["A"]);
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn add_edge_is_idempotent() {
        let mut graph = Graph::new();
        graph.add_edge("A", "B");
        graph.add_edge("A", "B");
        graph.add_edge("B", "A");

        assert_eq!(graph.degree("A").unwrap(), 1);
        assert_eq!(graph.degree("B").unwrap(), 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn adjacency_is_symmetric() {
        let graph = Graph::from_edges([("A", "B"), ("B", "C"), ("C", "A"), ("C", "D")]);
        for vertex in graph.vertices() {
            for neighbor in graph.neighbors(vertex).unwrap() {
                assert!(graph.neighbors(neighbor).unwrap().contains(vertex));
            }
        }
    }

    #[test]
    fn self_loop_only_registers_vertex() {
        let mut graph = Graph::new();
        graph.add_edge("A", "A");
        assert!(graph.contains("A"));
        assert_eq!(graph.degree("A").unwrap(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn neighbors_of_missing_vertex() {
        let graph = Graph::from_edges([("A", "B")]);
        let result = graph.neighbors("Z");
        match result {
            Err(ContagionError::NotFound(vertex)) => assert_eq!(vertex, "Z"),
            _ => panic!("expected NotFound"),
        }
        assert!(graph.degree("Z").is_err());
    }

    #[test]
    fn vertices_keep_insertion_order() {
        let graph = Graph::from_edges([("C", "A"), ("B", "A"), ("D", "C")]);
        let vertices: Vec<&str> = graph.vertices().map(String::as_str).collect();
        assert_eq!(vertices, vec!["C", "A", "B", "D"]);
    }

    #[test]
    fn isolated_vertex() {
        let mut graph = Graph::new();
        graph.add_vertex("Hermit");
        graph.add_vertex("Hermit");
        assert_eq!(graph.vertex_count(), 1);
        assert!(graph.neighbors("Hermit").unwrap().is_empty());
    }

    #[test]
    fn find_vertices_by_degree() {
        // A star around "hub" plus one extra edge.
        let graph = Graph::from_edges([("hub", "a"), ("hub", "b"), ("hub", "c"), ("a", "b")]);

        let mut degree_two: Vec<&str> = graph
            .find_vertices_by_degree(2)
            .into_iter()
            .map(String::as_str)
            .collect();
        degree_two.sort_unstable();
        assert_eq!(degree_two, vec!["a", "b"]);
        assert_eq!(graph.find_vertices_by_degree(3), vec!["hub"]);
        assert_eq!(graph.find_vertices_by_degree(1), vec!["c"]);
        assert!(graph.find_vertices_by_degree(7).is_empty());
    }
}
