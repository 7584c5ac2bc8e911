//! Catalog loading: turns relational catalog metadata into graphs.
//!
//! The loader reads nine relations through the [`CatalogSource`] seam and
//! builds the schema graph (tables and join relationships) and the semantic
//! graph (intents, perspectives, concepts, fields). Reads are ordered by
//! primary key so construction is reproducible across runs, and every
//! referential-integrity violation aborts the build with the offending row
//! keys; a partially built graph is never returned.

mod loader;
mod memory;
pub mod rows;
mod surreal;

pub use loader::{build_schema_graph, build_semantic_graph, load_graphs, CatalogGraphs};
pub use memory::MemoryCatalog;
pub use surreal::SurrealCatalog;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::GraphError;
use self::rows::{
    ConceptFieldRow, ConceptRow, IntentConceptRow, IntentPerspectiveRow, IntentRow,
    PerspectiveConceptRow, PerspectiveRow, RelationshipRow, TableRow,
};

/// Errors raised while reading the catalog or assembling graphs from it.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The underlying storage failed or returned malformed rows.
    #[error("Catalog read failed: {0}")]
    Source(String),

    /// A row violates referential integrity or a weight bound. Fatal: the
    /// keys identify the row to fix in the catalog.
    #[error("Catalog integrity violation in `{relation}` ({keys}): {message}")]
    Integrity {
        relation: String,
        keys: String,
        message: String,
    },

    /// A catalog read exceeded the configured deadline.
    #[error("Catalog read of `{relation}` timed out after {}ms", .timeout.as_millis())]
    Timeout {
        relation: String,
        timeout: std::time::Duration,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl CatalogError {
    pub(crate) fn integrity(
        relation: &str,
        keys: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CatalogError::Integrity {
            relation: relation.to_string(),
            keys: keys.into(),
            message: message.into(),
        }
    }
}

impl From<surrealdb::Error> for CatalogError {
    fn from(err: surrealdb::Error) -> Self {
        CatalogError::Source(err.to_string())
    }
}

/// Read-only access to the nine catalog relations.
///
/// Implementations must return rows ordered by primary key and must not
/// mutate the source catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn tables(&self) -> Result<Vec<TableRow>, CatalogError>;
    async fn relationships(&self) -> Result<Vec<RelationshipRow>, CatalogError>;
    async fn intents(&self) -> Result<Vec<IntentRow>, CatalogError>;
    async fn perspectives(&self) -> Result<Vec<PerspectiveRow>, CatalogError>;
    async fn concepts(&self) -> Result<Vec<ConceptRow>, CatalogError>;
    async fn concept_fields(&self) -> Result<Vec<ConceptFieldRow>, CatalogError>;
    async fn intent_perspectives(&self) -> Result<Vec<IntentPerspectiveRow>, CatalogError>;
    async fn perspective_concepts(&self) -> Result<Vec<PerspectiveConceptRow>, CatalogError>;
    async fn intent_concepts(&self) -> Result<Vec<IntentConceptRow>, CatalogError>;
}
