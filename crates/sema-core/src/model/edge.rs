//! Edge types for the schema and semantic graphs.

use serde::{Deserialize, Serialize};

/// Preference signal a perspective (or intent) applies to a concept when
/// several concepts could explain the same ambiguous field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InfluencePolarity {
    /// The concept should be treated as authoritative under this viewpoint.
    Elevates,
    /// The concept should be demoted under this viewpoint.
    Suppresses,
    /// No preference either way.
    #[default]
    Neutral,
}

impl InfluencePolarity {
    /// Signed score contribution for an elevation weight in `[0, 1]`.
    pub fn signed(&self, weight: f64) -> f64 {
        match self {
            InfluencePolarity::Elevates => weight,
            InfluencePolarity::Suppresses => -weight,
            InfluencePolarity::Neutral => 0.0,
        }
    }
}

/// Free-form enrichment carried by a join relationship.
///
/// These fields exist to feed downstream SQL generation prompts; the engine
/// round-trips them through persistence but never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JoinEnrichment {
    pub join_column_description: Option<String>,
    pub natural_language_alias: Option<String>,
    pub example_query: Option<String>,
    pub context: Option<String>,
}

impl JoinEnrichment {
    pub fn is_empty(&self) -> bool {
        self.join_column_description.is_none()
            && self.natural_language_alias.is_none()
            && self.example_query.is_none()
            && self.context.is_none()
    }
}

/// Attributes attached to a directed graph edge.
///
/// `Joins` edges make up the schema graph; the remaining variants make up
/// the semantic graph. A perspective's vocabulary membership and its
/// elevation signal travel on the same `UsesDefinition` edge because both
/// derive from a single catalog row, and the graph holds at most one edge
/// per ordered node pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "edge_type", rename_all = "snake_case")]
pub enum EdgeAttrs {
    /// Table -> table join relationship.
    Joins {
        /// Relationship kind, e.g. "one_to_many".
        relationship_kind: String,
        /// Column the join is performed on.
        join_column: String,
        /// Traversal cost used for join-path ranking. Strictly positive.
        weight: f64,
        #[serde(default)]
        enrichment: JoinEnrichment,
    },
    /// Intent -> perspective: how strongly the intent engages the
    /// perspective, in `[0, 1]`.
    OperatesWithin { weight: f64 },
    /// Perspective -> concept: the concept belongs to the perspective's
    /// vocabulary, with an optional elevation/suppression signal.
    UsesDefinition {
        influence: InfluencePolarity,
        /// Elevation weight in `[0, 1]`.
        weight: f64,
    },
    /// Field -> concept: the field is a candidate carrier of the concept.
    CanMean {
        /// Marks the canonical field for the concept within its table.
        is_primary: bool,
        /// Human-facing alias of the owning table, used as a deterministic
        /// tie-break during elevation.
        table_alias: String,
    },
    /// Intent -> concept: direct preference, weight in `{-1, 0, +1}`.
    Influence { weight: f64 },
}

impl EdgeAttrs {
    /// Traversal cost of this edge for shortest-path purposes.
    pub fn traversal_weight(&self) -> f64 {
        match self {
            EdgeAttrs::Joins { weight, .. } => *weight,
            EdgeAttrs::OperatesWithin { weight } => *weight,
            EdgeAttrs::UsesDefinition { weight, .. } => *weight,
            EdgeAttrs::Influence { weight } => weight.abs(),
            EdgeAttrs::CanMean { .. } => 1.0,
        }
    }
}
