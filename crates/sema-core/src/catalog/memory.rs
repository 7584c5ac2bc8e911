//! In-memory catalog source for fixtures and tests.

use async_trait::async_trait;

use super::rows::{
    ConceptFieldRow, ConceptRow, IntentConceptRow, IntentPerspectiveRow, IntentRow,
    PerspectiveConceptRow, PerspectiveRow, RelationshipRow, TableRow,
};
use super::{CatalogError, CatalogSource};

/// Catalog backed by plain row vectors.
///
/// Rows are sorted by primary key on read, matching the ordering contract
/// of the storage-backed sources, so fixtures can be declared in any order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: Vec<TableRow>,
    relationships: Vec<RelationshipRow>,
    intents: Vec<IntentRow>,
    perspectives: Vec<PerspectiveRow>,
    concepts: Vec<ConceptRow>,
    concept_fields: Vec<ConceptFieldRow>,
    intent_perspectives: Vec<IntentPerspectiveRow>,
    perspective_concepts: Vec<PerspectiveConceptRow>,
    intent_concepts: Vec<IntentConceptRow>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, kind: &str, description: &str) -> Self {
        self.tables.push(TableRow {
            table_name: name.to_string(),
            table_type: kind.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn with_relationship(mut self, row: RelationshipRow) -> Self {
        self.relationships.push(row);
        self
    }

    /// Shorthand for an unenriched relationship with weight 1.0.
    pub fn with_join(mut self, from: &str, to: &str, kind: &str, join_column: &str) -> Self {
        self.relationships.push(RelationshipRow {
            from_table: from.to_string(),
            to_table: to.to_string(),
            relationship_type: kind.to_string(),
            join_column: join_column.to_string(),
            weight: 1.0,
            join_column_description: None,
            natural_language_alias: None,
            few_shot_example: None,
            context: None,
        });
        self
    }

    pub fn with_intent(mut self, id: i64, name: &str, description: &str) -> Self {
        self.intents.push(IntentRow {
            intent_id: id,
            intent_name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn with_perspective(mut self, id: i64, name: &str, description: &str) -> Self {
        self.perspectives.push(PerspectiveRow {
            perspective_id: id,
            perspective_name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn with_concept(mut self, id: i64, name: &str, description: &str) -> Self {
        self.concepts.push(ConceptRow {
            concept_id: id,
            concept_name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn with_concept_field(mut self, row: ConceptFieldRow) -> Self {
        self.concept_fields.push(row);
        self
    }

    pub fn with_intent_perspective(mut self, intent_id: i64, perspective_id: i64, weight: f64) -> Self {
        self.intent_perspectives.push(IntentPerspectiveRow {
            intent_id,
            perspective_id,
            intent_factor_weight: weight,
        });
        self
    }

    pub fn with_perspective_concept(mut self, row: PerspectiveConceptRow) -> Self {
        self.perspective_concepts.push(row);
        self
    }

    pub fn with_intent_concept(mut self, intent_id: i64, concept_id: i64, weight: f64) -> Self {
        self.intent_concepts.push(IntentConceptRow {
            intent_id,
            concept_id,
            intent_factor_weight: weight,
        });
        self
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    async fn tables(&self) -> Result<Vec<TableRow>, CatalogError> {
        let mut rows = self.tables.clone();
        rows.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        Ok(rows)
    }

    async fn relationships(&self) -> Result<Vec<RelationshipRow>, CatalogError> {
        let mut rows = self.relationships.clone();
        rows.sort_by(|a, b| {
            (a.from_table.as_str(), a.to_table.as_str())
                .cmp(&(b.from_table.as_str(), b.to_table.as_str()))
        });
        Ok(rows)
    }

    async fn intents(&self) -> Result<Vec<IntentRow>, CatalogError> {
        let mut rows = self.intents.clone();
        rows.sort_by_key(|r| r.intent_id);
        Ok(rows)
    }

    async fn perspectives(&self) -> Result<Vec<PerspectiveRow>, CatalogError> {
        let mut rows = self.perspectives.clone();
        rows.sort_by_key(|r| r.perspective_id);
        Ok(rows)
    }

    async fn concepts(&self) -> Result<Vec<ConceptRow>, CatalogError> {
        let mut rows = self.concepts.clone();
        rows.sort_by_key(|r| r.concept_id);
        Ok(rows)
    }

    async fn concept_fields(&self) -> Result<Vec<ConceptFieldRow>, CatalogError> {
        let mut rows = self.concept_fields.clone();
        rows.sort_by(|a, b| {
            (a.concept_id, a.table_name.as_str(), a.field_name.as_str())
                .cmp(&(b.concept_id, b.table_name.as_str(), b.field_name.as_str()))
        });
        Ok(rows)
    }

    async fn intent_perspectives(&self) -> Result<Vec<IntentPerspectiveRow>, CatalogError> {
        let mut rows = self.intent_perspectives.clone();
        rows.sort_by_key(|r| (r.intent_id, r.perspective_id));
        Ok(rows)
    }

    async fn perspective_concepts(&self) -> Result<Vec<PerspectiveConceptRow>, CatalogError> {
        let mut rows = self.perspective_concepts.clone();
        rows.sort_by_key(|r| (r.perspective_id, r.concept_id));
        Ok(rows)
    }

    async fn intent_concepts(&self) -> Result<Vec<IntentConceptRow>, CatalogError> {
        let mut rows = self.intent_concepts.clone();
        rows.sort_by_key(|r| (r.intent_id, r.concept_id));
        Ok(rows)
    }
}
