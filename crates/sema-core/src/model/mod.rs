//! In-memory graph model shared by the schema and semantic graphs.
//!
//! A [`Graph`] is built once, by the catalog loader or the persistence
//! adapter, and is read-only afterwards. All containers are BTree-backed so
//! iteration order is the key order, never insertion or hash order; the
//! resolvers rely on this for reproducible results across processes.

mod edge;
mod node;

pub use edge::{EdgeAttrs, InfluencePolarity, JoinEnrichment};
pub use node::{concept_id, field_id, intent_id, local_name, perspective_id, NodeAttrs, NodeKind};

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors raised while assembling a graph.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Node already present in graph: `{id}`")]
    DuplicateNode { id: String },

    #[error("Edge `{from}` -> `{to}` references unknown node `{missing}`")]
    UnknownNode {
        from: String,
        to: String,
        missing: String,
    },

    #[error("Edge `{from}` -> `{to}` already present in graph")]
    DuplicateEdge { from: String, to: String },
}

/// Directed attributed graph with deterministic iteration order.
///
/// Edges are stored directed; [`Graph::neighbors`] and [`Graph::get_edge`]
/// expose the undirected view the join-path resolver traverses, while
/// [`Graph::oriented_edge`] recovers the stored direction so directional
/// metadata (which side owns the join column) is never lost.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    directed: bool,
    nodes: BTreeMap<String, NodeAttrs>,
    edges: BTreeMap<(String, String), EdgeAttrs>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates an empty directed graph.
    pub fn new() -> Self {
        Self::with_orientation(true)
    }

    /// Creates an empty graph with an explicit orientation marker.
    ///
    /// The marker records how the graph was loaded from the store; lookups
    /// behave identically either way since `get_edge` already checks both
    /// directions.
    pub fn with_orientation(directed: bool) -> Self {
        Self {
            directed,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            adjacency: BTreeMap::new(),
        }
    }

    pub fn directed(&self) -> bool {
        self.directed
    }

    /// Adds a node, failing if the id is already taken.
    pub fn add_node(&mut self, id: impl Into<String>, attrs: NodeAttrs) -> Result<(), GraphError> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode { id });
        }
        self.adjacency.entry(id.clone()).or_default();
        self.nodes.insert(id, attrs);
        Ok(())
    }

    /// Adds a directed edge between two existing nodes.
    ///
    /// At most one edge may exist per ordered node pair; an edge and its
    /// reverse may coexist when they represent distinct relationships.
    pub fn add_edge(&mut self, from: &str, to: &str, attrs: EdgeAttrs) -> Result<(), GraphError> {
        for endpoint in [from, to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::UnknownNode {
                    from: from.to_string(),
                    to: to.to_string(),
                    missing: endpoint.to_string(),
                });
            }
        }
        let key = (from.to_string(), to.to_string());
        if self.edges.contains_key(&key) {
            return Err(GraphError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.edges.insert(key, attrs);
        self.adjacency
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.adjacency
            .entry(to.to_string())
            .or_default()
            .insert(from.to_string());
        Ok(())
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&NodeAttrs> {
        self.nodes.get(id)
    }

    /// Adjacent node ids in the undirected view, ascending by id.
    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Edge attributes between two nodes, checking `a -> b` then `b -> a`.
    pub fn get_edge(&self, a: &str, b: &str) -> Option<&EdgeAttrs> {
        self.oriented_edge(a, b).map(|(_, _, attrs)| attrs)
    }

    /// Edge between two nodes together with its stored `(from, to)`
    /// orientation.
    pub fn oriented_edge<'a>(&'a self, a: &str, b: &str) -> Option<(&'a str, &'a str, &'a EdgeAttrs)> {
        if let Some(((from, to), attrs)) = self.edges.get_key_value(&(a.to_string(), b.to_string())) {
            return Some((from.as_str(), to.as_str(), attrs));
        }
        self.edges
            .get_key_value(&(b.to_string(), a.to_string()))
            .map(|((from, to), attrs)| (from.as_str(), to.as_str(), attrs))
    }

    /// Edge attributes for the exact directed pair `from -> to`.
    pub fn directed_edge(&self, from: &str, to: &str) -> Option<&EdgeAttrs> {
        self.edges.get(&(from.to_string(), to.to_string()))
    }

    /// Outgoing directed edges of a node, ascending by target id.
    pub fn out_edges<'a>(&'a self, id: &'a str) -> impl Iterator<Item = (&'a str, &'a EdgeAttrs)> + 'a {
        self.edges
            .range((id.to_string(), String::new())..)
            .take_while(move |((from, _), _)| from.as_str() == id)
            .map(|((_, to), attrs)| (to.as_str(), attrs))
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &NodeAttrs)> {
        self.nodes.iter().map(|(id, attrs)| (id.as_str(), attrs))
    }

    /// All directed edges in `(from, to)` order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeAttrs)> {
        self.edges
            .iter()
            .map(|((from, to), attrs)| (from.as_str(), to.as_str(), attrs))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> NodeAttrs {
        NodeAttrs::Table {
            kind: "fact".to_string(),
            description: format!("{name} table"),
        }
    }

    fn joins(column: &str) -> EdgeAttrs {
        EdgeAttrs::Joins {
            relationship_kind: "one_to_many".to_string(),
            join_column: column.to_string(),
            weight: 1.0,
            enrichment: JoinEnrichment::default(),
        }
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut graph = Graph::new();
        graph.add_node("orders", table("orders")).unwrap();
        let err = graph.add_node("orders", table("orders")).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateNode {
                id: "orders".to_string()
            }
        );
    }

    #[test]
    fn test_edge_requires_known_endpoints() {
        let mut graph = Graph::new();
        graph.add_node("orders", table("orders")).unwrap();
        let err = graph.add_edge("orders", "customers", joins("customer_id")).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownNode {
                from: "orders".to_string(),
                to: "customers".to_string(),
                missing: "customers".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let mut graph = Graph::new();
        graph.add_node("orders", table("orders")).unwrap();
        graph.add_node("customers", table("customers")).unwrap();
        graph.add_edge("orders", "customers", joins("customer_id")).unwrap();
        let err = graph
            .add_edge("orders", "customers", joins("customer_id"))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateEdge {
                from: "orders".to_string(),
                to: "customers".to_string(),
            }
        );
        // The reverse direction is a distinct relationship and is allowed.
        graph.add_edge("customers", "orders", joins("customer_id")).unwrap();
    }

    #[test]
    fn test_neighbors_sorted_ascending() {
        let mut graph = Graph::new();
        for name in ["orders", "zones", "customers", "products"] {
            graph.add_node(name, table(name)).unwrap();
        }
        graph.add_edge("orders", "zones", joins("zone_id")).unwrap();
        graph.add_edge("orders", "customers", joins("customer_id")).unwrap();
        graph.add_edge("products", "orders", joins("product_id")).unwrap();

        let neighbors: Vec<&str> = graph.neighbors("orders").collect();
        assert_eq!(neighbors, vec!["customers", "products", "zones"]);
    }

    #[test]
    fn test_get_edge_checks_both_directions() {
        let mut graph = Graph::new();
        graph.add_node("orders", table("orders")).unwrap();
        graph.add_node("customers", table("customers")).unwrap();
        graph.add_edge("orders", "customers", joins("customer_id")).unwrap();

        assert!(graph.get_edge("orders", "customers").is_some());
        assert!(graph.get_edge("customers", "orders").is_some());
        assert!(graph.get_edge("orders", "orders").is_none());

        let (from, to, _) = graph.oriented_edge("customers", "orders").unwrap();
        assert_eq!((from, to), ("orders", "customers"));
    }

    #[test]
    fn test_node_lookup_and_kind() {
        let mut graph = Graph::new();
        graph.add_node("orders", table("orders")).unwrap();

        let attrs = graph.node("orders").unwrap();
        assert_eq!(attrs.kind(), NodeKind::Table);
        assert!(graph.node("missing").is_none());
    }

    #[test]
    fn test_out_edges_only_directed() {
        let mut graph = Graph::new();
        graph.add_node("a", table("a")).unwrap();
        graph.add_node("b", table("b")).unwrap();
        graph.add_edge("a", "b", joins("id")).unwrap();

        assert_eq!(graph.out_edges("a").count(), 1);
        assert_eq!(graph.out_edges("b").count(), 0);
    }
}
