//! Outward-facing engine: one handle for join-path and concept queries.
//!
//! The engine owns immutable [`Graph`] snapshots built by one catalog load.
//! Queries clone an `Arc` to the current snapshot and run lock-free;
//! `rebuild` constructs brand-new graphs and swaps the pointer, so readers
//! mid-query keep the snapshot they started with.

use std::sync::{Arc, PoisonError, RwLock};

use crate::catalog::{load_graphs, CatalogError, CatalogGraphs, CatalogSource};
use crate::model::Graph;
use crate::resolve::{
    resolve_concept, resolve_join_path, ElevationError, JoinStep, PathError, Resolution,
};

/// Schema and semantic graph snapshots plus the two consumer queries.
pub struct Engine {
    current: RwLock<Arc<CatalogGraphs>>,
}

impl Engine {
    /// Builds both graphs from the catalog and wraps them.
    pub async fn from_catalog(source: &dyn CatalogSource) -> Result<Self, CatalogError> {
        let graphs = load_graphs(source).await?;
        Ok(Self {
            current: RwLock::new(Arc::new(graphs)),
        })
    }

    /// Wraps graphs that were built or loaded elsewhere (e.g. imported from
    /// the shared graph store).
    pub fn from_graphs(schema: Graph, semantic: Graph) -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogGraphs { schema, semantic })),
        }
    }

    /// Reloads the catalog and atomically swaps the snapshots.
    ///
    /// On failure the previous snapshots stay in place.
    pub async fn rebuild(&self, source: &dyn CatalogSource) -> Result<(), CatalogError> {
        let graphs = Arc::new(load_graphs(source).await?);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = graphs;
        Ok(())
    }

    /// The current graph snapshot.
    pub fn snapshot(&self) -> Arc<CatalogGraphs> {
        Arc::clone(
            &self
                .current
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Deterministic shortest join path between two tables.
    pub fn resolve_join_path(&self, source: &str, target: &str) -> Result<Vec<JoinStep>, PathError> {
        let snapshot = self.snapshot();
        resolve_join_path(&snapshot.schema, source, target)
    }

    /// Authoritative `(table, column)` for an ambiguous field name under an
    /// intent. `table_scope` narrows the candidates to one table.
    pub fn resolve_concept(
        &self,
        intent_name: &str,
        field_name: &str,
        table_scope: Option<&str>,
    ) -> Result<Resolution, ElevationError> {
        let snapshot = self.snapshot();
        resolve_concept(&snapshot.semantic, intent_name, field_name, table_scope)
    }
}
