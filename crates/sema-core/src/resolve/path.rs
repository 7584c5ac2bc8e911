//! Deterministic shortest join-path resolution over the schema graph.
//!
//! Edges are traversed in either direction. Ranking uses the edge weight as
//! cost; among equal-cost paths the lexicographically smallest node
//! sequence wins, so two processes loading the same catalog always return
//! the identical path. The search itself never touches hash-ordered state.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{EdgeAttrs, Graph};

/// One table-to-table hop of a join path, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStep {
    pub from: String,
    pub to: String,
    pub relationship_kind: String,
    pub join_column: String,
}

/// Errors raised by join-path resolution.
#[derive(Debug, Error, PartialEq)]
pub enum PathError {
    #[error("Unknown table in join path query: `{name}`")]
    UnknownNode { name: String },

    #[error("No join path connects `{source}` to `{target}`")]
    NoPath { source: String, target: String },
}

/// Resolves the cheapest join path from `source` to `target`.
///
/// Both endpoints must be tables of the schema graph. The degenerate query
/// `source == target` returns an empty step list. The search runs over the
/// canonical endpoint order (smaller name first) and reverses the result
/// when needed, so `resolve_join_path(a, b)` and `resolve_join_path(b, a)`
/// always return the same tables in opposite order.
pub fn resolve_join_path(
    schema: &Graph,
    source: &str,
    target: &str,
) -> Result<Vec<JoinStep>, PathError> {
    for name in [source, target] {
        if !schema.contains_node(name) {
            return Err(PathError::UnknownNode {
                name: name.to_string(),
            });
        }
    }
    if source == target {
        return Ok(Vec::new());
    }

    let (start, goal) = if source <= target {
        (source, target)
    } else {
        (target, source)
    };

    let mut sequence = cheapest_sequence(schema, start, goal).ok_or_else(|| PathError::NoPath {
        source: source.to_string(),
        target: target.to_string(),
    })?;
    if start != source {
        sequence.reverse();
    }

    debug!(source, target, hops = sequence.len() - 1, "join path resolved");
    Ok(steps_from_sequence(schema, &sequence))
}

/// Search frontier entry ordered by `(cost, node sequence)`.
///
/// Relationship weights are strictly positive (the loader rejects the
/// rest), so extending a path strictly increases its cost and the composite
/// order stays label-setting: the first time the goal is popped, its
/// sequence is the cheapest and, among those, lexicographically smallest.
#[derive(PartialEq, Eq)]
struct Frontier {
    cost: Cost,
    sequence: Vec<String>,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .cmp(&other.cost)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn cheapest_sequence(schema: &Graph, start: &str, goal: &str) -> Option<Vec<String>> {
    let mut heap = BinaryHeap::new();
    let mut settled: BTreeSet<String> = BTreeSet::new();

    heap.push(Reverse(Frontier {
        cost: Cost(0.0),
        sequence: vec![start.to_string()],
    }));

    while let Some(Reverse(frontier)) = heap.pop() {
        let current = frontier
            .sequence
            .last()
            .map(String::as_str)
            .unwrap_or(start);
        if current == goal {
            return Some(frontier.sequence);
        }
        if !settled.insert(current.to_string()) {
            continue;
        }

        for neighbor in schema.neighbors(current) {
            if settled.contains(neighbor) {
                continue;
            }
            let Some(edge) = schema.get_edge(current, neighbor) else {
                continue;
            };
            let mut sequence = frontier.sequence.clone();
            sequence.push(neighbor.to_string());
            heap.push(Reverse(Frontier {
                cost: Cost(frontier.cost.0 + edge.traversal_weight()),
                sequence,
            }));
        }
    }

    None
}

fn steps_from_sequence(schema: &Graph, sequence: &[String]) -> Vec<JoinStep> {
    sequence
        .windows(2)
        .filter_map(|pair| {
            let edge = schema.get_edge(&pair[0], &pair[1])?;
            let EdgeAttrs::Joins {
                relationship_kind,
                join_column,
                ..
            } = edge
            else {
                return None;
            };
            Some(JoinStep {
                from: pair[0].clone(),
                to: pair[1].clone(),
                relationship_kind: relationship_kind.clone(),
                join_column: join_column.clone(),
            })
        })
        .collect()
}
