//! Node types for the schema and semantic graphs.

use serde::{Deserialize, Serialize};

/// Attributes attached to a graph node.
///
/// One variant per node type: `Table` nodes make up the schema graph, the
/// remaining variants make up the semantic graph. Node names are
/// case-sensitive and unique within their node-type namespace, which is why
/// semantic node ids carry a kind prefix (see [`intent_id`] and friends)
/// while schema nodes are keyed by the bare table name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum NodeAttrs {
    /// A table/dataset in the schema graph.
    Table {
        /// Table role, e.g. "fact", "dimension", "reference".
        kind: String,
        description: String,
    },
    /// A concrete `(table, column)` pair that can mean one or more concepts.
    Field { table: String, column: String },
    /// A named analytical purpose, e.g. "quality-analysis".
    Intent { description: String },
    /// A named viewpoint an intent can operate within, e.g. "Quality".
    Perspective { description: String },
    /// A named abstract business metric, e.g. "MATERIAL_NON_CONFORMANCE".
    Concept { description: String },
}

impl NodeAttrs {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeAttrs::Table { .. } => NodeKind::Table,
            NodeAttrs::Field { .. } => NodeKind::Field,
            NodeAttrs::Intent { .. } => NodeKind::Intent,
            NodeAttrs::Perspective { .. } => NodeKind::Perspective,
            NodeAttrs::Concept { .. } => NodeKind::Concept,
        }
    }
}

/// Discriminant of [`NodeAttrs`], used for filtering and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Table,
    Field,
    Intent,
    Perspective,
    Concept,
}

/// Graph id for an intent node.
pub fn intent_id(name: &str) -> String {
    format!("intent:{name}")
}

/// Graph id for a perspective node.
pub fn perspective_id(name: &str) -> String {
    format!("perspective:{name}")
}

/// Graph id for a concept node.
pub fn concept_id(name: &str) -> String {
    format!("concept:{name}")
}

/// Graph id for a field node.
pub fn field_id(table: &str, column: &str) -> String {
    format!("field:{table}.{column}")
}

/// Name part of a prefixed semantic node id.
pub fn local_name(id: &str) -> &str {
    id.split_once(':').map(|(_, name)| name).unwrap_or(id)
}
