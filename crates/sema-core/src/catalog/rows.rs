//! Row types for the nine catalog relations.
//!
//! Column names mirror the catalog contract; optional columns default so a
//! minimal catalog (no enrichment, no elevation labels) still loads.

use serde::{Deserialize, Serialize};

fn default_weight() -> f64 {
    1.0
}

/// `tables (table_name PK, table_type, description)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub table_name: String,
    pub table_type: String,
    #[serde(default)]
    pub description: String,
}

/// `relationships (from_table, to_table, relationship_type, join_column,
/// weight, enrichment columns...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRow {
    pub from_table: String,
    pub to_table: String,
    pub relationship_type: String,
    pub join_column: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub join_column_description: Option<String>,
    #[serde(default)]
    pub natural_language_alias: Option<String>,
    #[serde(default)]
    pub few_shot_example: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

/// `intents (intent_id PK, intent_name, description)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRow {
    pub intent_id: i64,
    pub intent_name: String,
    #[serde(default)]
    pub description: String,
}

/// `perspectives (perspective_id PK, perspective_name, description)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveRow {
    pub perspective_id: i64,
    pub perspective_name: String,
    #[serde(default)]
    pub description: String,
}

/// `concepts (concept_id PK, concept_name, description)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRow {
    pub concept_id: i64,
    pub concept_name: String,
    #[serde(default)]
    pub description: String,
}

/// `concept_fields (concept_id FK, table_name, field_name, is_primary,
/// table_alias)`
///
/// `is_primary` and `table_alias` formalize the catalog's informal
/// primary/secondary field labels; `table_alias` falls back to the table
/// name when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptFieldRow {
    pub concept_id: i64,
    pub table_name: String,
    pub field_name: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub table_alias: Option<String>,
}

/// `intent_perspectives (intent_id FK, perspective_id FK, intent_factor_weight)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPerspectiveRow {
    pub intent_id: i64,
    pub perspective_id: i64,
    #[serde(default = "default_weight")]
    pub intent_factor_weight: f64,
}

/// `perspective_concepts (perspective_id FK, concept_id FK, influence,
/// elevation_weight)`
///
/// `influence` is one of `elevates`, `suppresses`, `neutral` (the default);
/// `elevation_weight` defaults to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveConceptRow {
    pub perspective_id: i64,
    pub concept_id: i64,
    #[serde(default)]
    pub influence: Option<String>,
    #[serde(default)]
    pub elevation_weight: Option<f64>,
}

/// `intent_concepts (intent_id FK, concept_id FK, intent_factor_weight in {-1,0,1})`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentConceptRow {
    pub intent_id: i64,
    pub concept_id: i64,
    pub intent_factor_weight: f64,
}
