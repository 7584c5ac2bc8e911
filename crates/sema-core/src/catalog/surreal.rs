//! SurrealDB-backed catalog source.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;

use crate::config::CatalogConfig;

use super::rows::{
    ConceptFieldRow, ConceptRow, IntentConceptRow, IntentPerspectiveRow, IntentRow,
    PerspectiveConceptRow, PerspectiveRow, RelationshipRow, TableRow,
};
use super::{CatalogError, CatalogSource};

/// Reads the catalog relations from a SurrealDB database.
///
/// Every query is a read-only `SELECT ... ORDER BY` over one relation; the
/// source catalog is never mutated. Ordering by primary key keeps graph
/// construction reproducible across runs and processes.
pub struct SurrealCatalog {
    db: Surreal<Db>,
    timeout: Option<Duration>,
}

impl SurrealCatalog {
    /// Opens the catalog database at the given path.
    pub async fn connect(path: &Path) -> Result<Self, CatalogError> {
        let db = Surreal::new::<RocksDb>(path).await?;
        db.use_ns("sema").use_db("catalog").await?;
        Ok(Self { db, timeout: None })
    }

    /// Opens the catalog described by the configuration.
    pub async fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let db = Surreal::new::<RocksDb>(config.path.as_str()).await?;
        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;
        Ok(Self {
            db,
            timeout: config.timeout(),
        })
    }

    /// Wraps an already established connection.
    pub fn from_connection(db: Surreal<Db>) -> Self {
        Self { db, timeout: None }
    }

    /// Applies a deadline to every catalog read.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        relation: &str,
        query: &str,
    ) -> Result<Vec<T>, CatalogError> {
        let fut = async {
            let mut response = self.db.query(query).await?;
            let rows: Vec<T> = response.take(0)?;
            Ok::<_, surrealdb::Error>(rows)
        };
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(CatalogError::Timeout {
                    relation: relation.to_string(),
                    timeout: limit,
                }),
            },
            None => Ok(fut.await?),
        }
    }
}

#[async_trait]
impl CatalogSource for SurrealCatalog {
    async fn tables(&self) -> Result<Vec<TableRow>, CatalogError> {
        self.fetch("tables", "SELECT * FROM tables ORDER BY table_name")
            .await
    }

    async fn relationships(&self) -> Result<Vec<RelationshipRow>, CatalogError> {
        self.fetch(
            "relationships",
            "SELECT * FROM relationships ORDER BY from_table, to_table",
        )
        .await
    }

    async fn intents(&self) -> Result<Vec<IntentRow>, CatalogError> {
        self.fetch("intents", "SELECT * FROM intents ORDER BY intent_id")
            .await
    }

    async fn perspectives(&self) -> Result<Vec<PerspectiveRow>, CatalogError> {
        self.fetch(
            "perspectives",
            "SELECT * FROM perspectives ORDER BY perspective_id",
        )
        .await
    }

    async fn concepts(&self) -> Result<Vec<ConceptRow>, CatalogError> {
        self.fetch("concepts", "SELECT * FROM concepts ORDER BY concept_id")
            .await
    }

    async fn concept_fields(&self) -> Result<Vec<ConceptFieldRow>, CatalogError> {
        self.fetch(
            "concept_fields",
            "SELECT * FROM concept_fields ORDER BY concept_id, table_name, field_name",
        )
        .await
    }

    async fn intent_perspectives(&self) -> Result<Vec<IntentPerspectiveRow>, CatalogError> {
        self.fetch(
            "intent_perspectives",
            "SELECT * FROM intent_perspectives ORDER BY intent_id, perspective_id",
        )
        .await
    }

    async fn perspective_concepts(&self) -> Result<Vec<PerspectiveConceptRow>, CatalogError> {
        self.fetch(
            "perspective_concepts",
            "SELECT * FROM perspective_concepts ORDER BY perspective_id, concept_id",
        )
        .await
    }

    async fn intent_concepts(&self) -> Result<Vec<IntentConceptRow>, CatalogError> {
        self.fetch(
            "intent_concepts",
            "SELECT * FROM intent_concepts ORDER BY intent_id, concept_id",
        )
        .await
    }
}
