//! Sema core: schema graph and concept-disambiguation engine.
//!
//! Turns relational catalog metadata into two navigable graphs and answers
//! the two questions analytical SQL generation needs:
//!
//! - [`Engine::resolve_join_path`] - deterministic shortest join path
//!   between two tables, with per-hop relationship kind and join column.
//! - [`Engine::resolve_concept`] - which business concept, and therefore
//!   which `(table, column)`, is authoritative for an ambiguous field name
//!   under a given analytical intent.
//!
//! Graphs are built by the [`catalog`] loader, are immutable once built,
//! and can be exported to and imported from a shared [`store`] for reuse
//! across sessions.
//!
//! # Example
//!
//! ```ignore
//! use sema_core::{Engine, SurrealCatalog};
//!
//! let catalog = SurrealCatalog::connect(Path::new(".sema/catalog.db")).await?;
//! let engine = Engine::from_catalog(&catalog).await?;
//!
//! let path = engine.resolve_join_path("equipment", "customer")?;
//! let field = engine.resolve_concept("quality-review", "severity", None)?;
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod model;
pub mod resolve;
pub mod store;

pub use catalog::{
    build_schema_graph, build_semantic_graph, load_graphs, CatalogError, CatalogGraphs,
    CatalogSource, MemoryCatalog, SurrealCatalog,
};
pub use config::{Config, ConfigError};
pub use engine::Engine;
pub use model::{EdgeAttrs, Graph, GraphError, InfluencePolarity, JoinEnrichment, NodeAttrs};
pub use resolve::{
    resolve_concept, resolve_join_path, ElevationError, JoinStep, PathError, Resolution,
};
pub use store::{GraphStore, PersistReport, StoreError};
