//! Shared graph store: export/import of graph snapshots over SurrealDB.
//!
//! Each stored graph is a set of node and edge records tagged with the
//! store name and a generation id. A persist writes every record under a
//! fresh generation and only then moves the `graph_meta` pointer, so a
//! failure or cancellation mid-write leaves the previously committed
//! generation untouched and loadable. Old-generation records are swept
//! after the commit.
//!
//! Overwrites of the same store name must be serialized by the caller; the
//! adapter takes no lock of its own.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::model::{Graph, GraphError};

/// Errors raised by the persistence adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or a query failed outright.
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),

    #[error("Graph `{store_name}` already exists; pass overwrite to replace it")]
    AlreadyExists { store_name: String },

    /// A write batch failed mid-stream. Re-run the persist with overwrite
    /// to guarantee a clean state.
    #[error("Partial write persisting graph `{store_name}` at batch {batch}: {message}")]
    PartialWrite {
        store_name: String,
        batch: usize,
        message: String,
    },

    #[error("No graph named `{store_name}` in the store")]
    GraphNotFound { store_name: String },

    #[error("Graph store operation `{operation}` timed out after {}ms", .timeout.as_millis())]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// Stored records did not rebuild into a valid graph.
    #[error("Stored graph `{store_name}` is corrupt: {message}")]
    Corrupt { store_name: String, message: String },
}

/// Outcome of a successful persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistReport {
    pub store_name: String,
    pub generation: String,
    pub nodes_written: usize,
    pub edges_written: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetaRecord {
    store_name: String,
    generation: String,
    directed: bool,
    node_count: usize,
    edge_count: usize,
    persisted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    store_name: String,
    generation: String,
    /// Original node id; record keys are store-generated.
    label: String,
    attrs: crate::model::NodeAttrs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeRecord {
    store_name: String,
    generation: String,
    from_label: String,
    to_label: String,
    attrs: crate::model::EdgeAttrs,
}

/// Database connection for the shared graph store.
pub struct GraphStore {
    db: Surreal<Db>,
    timeout: Option<Duration>,
}

impl GraphStore {
    /// Opens or creates a graph store at the given path.
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        let db = Surreal::new::<RocksDb>(path)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        db.use_ns("sema")
            .use_db("graphs")
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let store = Self { db, timeout: None };
        store.initialize().await?;
        Ok(store)
    }

    /// Opens the store described by the configuration.
    pub async fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let db = Surreal::new::<RocksDb>(config.path.as_str())
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut store = Self { db, timeout: None };
        store.timeout = config.timeout();
        store.initialize().await?;
        Ok(store)
    }

    /// Wraps an already established connection.
    pub async fn from_connection(db: Surreal<Db>) -> Result<Self, StoreError> {
        let store = Self { db, timeout: None };
        store.initialize().await?;
        Ok(store)
    }

    /// Applies a deadline to every store operation.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        self.guard("initialize schema", async {
            self.db
                .query(
                    r#"
                    DEFINE TABLE IF NOT EXISTS graph_meta SCHEMALESS;
                    DEFINE INDEX IF NOT EXISTS meta_store ON graph_meta FIELDS store_name UNIQUE;

                    DEFINE TABLE IF NOT EXISTS graph_node SCHEMALESS;
                    DEFINE INDEX IF NOT EXISTS node_lookup ON graph_node FIELDS store_name, generation, label;

                    DEFINE TABLE IF NOT EXISTS graph_edge SCHEMALESS;
                    DEFINE INDEX IF NOT EXISTS edge_lookup ON graph_edge FIELDS store_name, generation, from_label, to_label;
                    "#,
                )
                .await?;
            Ok(())
        })
        .await
    }

    /// Exports a graph under `store_name`, writing nodes then edges in
    /// batches of `batch_size`.
    ///
    /// With `overwrite` unset, persisting over an existing graph fails
    /// without touching it. With `overwrite` set, the existing graph stays
    /// loadable until the new generation is fully written and committed.
    /// Concurrent overwrites of one name are a caller responsibility.
    pub async fn persist(
        &self,
        graph: &Graph,
        store_name: &str,
        batch_size: usize,
        overwrite: bool,
    ) -> Result<PersistReport, StoreError> {
        let existing = self.meta(store_name).await?;
        if existing.is_some() && !overwrite {
            return Err(StoreError::AlreadyExists {
                store_name: store_name.to_string(),
            });
        }

        let generation = Uuid::new_v4().to_string();
        let batch_size = batch_size.max(1);

        let nodes: Vec<NodeRecord> = graph
            .nodes()
            .map(|(label, attrs)| NodeRecord {
                store_name: store_name.to_string(),
                generation: generation.clone(),
                label: label.to_string(),
                attrs: attrs.clone(),
            })
            .collect();
        let edges: Vec<EdgeRecord> = graph
            .edges()
            .map(|(from, to, attrs)| EdgeRecord {
                store_name: store_name.to_string(),
                generation: generation.clone(),
                from_label: from.to_string(),
                to_label: to.to_string(),
                attrs: attrs.clone(),
            })
            .collect();

        let mut batch_index = 0;
        for chunk in nodes.chunks(batch_size) {
            self.write_batch("graph_node", chunk.to_vec(), store_name, batch_index)
                .await?;
            batch_index += 1;
        }
        for chunk in edges.chunks(batch_size) {
            self.write_batch("graph_edge", chunk.to_vec(), store_name, batch_index)
                .await?;
            batch_index += 1;
        }

        // Commit: a single statement moves the meta pointer to the new
        // generation. Everything before this line is invisible to loads.
        let meta = MetaRecord {
            store_name: store_name.to_string(),
            generation: generation.clone(),
            directed: graph.directed(),
            node_count: nodes.len(),
            edge_count: edges.len(),
            persisted_at: Utc::now(),
        };
        self.guard("commit graph meta", async {
            self.db
                .query("UPSERT type::thing('graph_meta', $key) CONTENT $meta")
                .bind(("key", store_name.to_string()))
                .bind(("meta", meta))
                .await?;
            Ok(())
        })
        .await?;

        // Old generations are unreachable now; sweep failures only leave
        // dead records behind.
        if let Err(err) = self.sweep(store_name, &generation).await {
            warn!(store_name, error = %err, "failed to sweep old generations");
        }

        info!(
            store_name,
            generation = generation.as_str(),
            nodes = nodes.len(),
            edges = edges.len(),
            "graph persisted"
        );
        Ok(PersistReport {
            store_name: store_name.to_string(),
            generation,
            nodes_written: nodes.len(),
            edges_written: edges.len(),
        })
    }

    /// Imports the graph committed under `store_name`.
    ///
    /// The `directed` flag sets the orientation marker on the rebuilt
    /// graph; attributes and labels come back exactly as persisted.
    pub async fn load(&self, store_name: &str, directed: bool) -> Result<Graph, StoreError> {
        let meta = self
            .meta(store_name)
            .await?
            .ok_or_else(|| StoreError::GraphNotFound {
                store_name: store_name.to_string(),
            })?;

        let nodes: Vec<NodeRecord> = self
            .guard("load nodes", async {
                self.db
                    .query(
                        "SELECT * FROM graph_node \
                         WHERE store_name = $name AND generation = $gen ORDER BY label",
                    )
                    .bind(("name", store_name.to_string()))
                    .bind(("gen", meta.generation.clone()))
                    .await?
                    .take(0)
            })
            .await?;
        let edges: Vec<EdgeRecord> = self
            .guard("load edges", async {
                self.db
                    .query(
                        "SELECT * FROM graph_edge \
                         WHERE store_name = $name AND generation = $gen \
                         ORDER BY from_label, to_label",
                    )
                    .bind(("name", store_name.to_string()))
                    .bind(("gen", meta.generation.clone()))
                    .await?
                    .take(0)
            })
            .await?;

        if nodes.len() != meta.node_count || edges.len() != meta.edge_count {
            return Err(StoreError::Corrupt {
                store_name: store_name.to_string(),
                message: format!(
                    "expected {} nodes and {} edges, found {} and {}",
                    meta.node_count,
                    meta.edge_count,
                    nodes.len(),
                    edges.len()
                ),
            });
        }

        let mut graph = Graph::with_orientation(directed);
        for record in nodes {
            graph
                .add_node(record.label, record.attrs)
                .map_err(|e| corrupt(store_name, e))?;
        }
        for record in edges {
            graph
                .add_edge(&record.from_label, &record.to_label, record.attrs)
                .map_err(|e| corrupt(store_name, e))?;
        }

        debug!(
            store_name,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph loaded"
        );
        Ok(graph)
    }

    /// Removes a stored graph and its records.
    pub async fn drop_graph(&self, store_name: &str) -> Result<(), StoreError> {
        if self.meta(store_name).await?.is_none() {
            return Err(StoreError::GraphNotFound {
                store_name: store_name.to_string(),
            });
        }
        self.guard("drop graph", async {
            self.db
                .query("DELETE graph_node WHERE store_name = $name")
                .bind(("name", store_name.to_string()))
                .await?;
            self.db
                .query("DELETE graph_edge WHERE store_name = $name")
                .bind(("name", store_name.to_string()))
                .await?;
            self.db
                .query("DELETE graph_meta WHERE store_name = $name")
                .bind(("name", store_name.to_string()))
                .await?;
            Ok(())
        })
        .await?;
        info!(store_name, "graph dropped");
        Ok(())
    }

    /// Whether a graph is committed under `store_name`.
    pub async fn exists(&self, store_name: &str) -> Result<bool, StoreError> {
        Ok(self.meta(store_name).await?.is_some())
    }

    /// Names of all committed graphs, ascending.
    pub async fn list_graphs(&self) -> Result<Vec<String>, StoreError> {
        #[derive(Deserialize)]
        struct NameRow {
            store_name: String,
        }
        let rows: Vec<NameRow> = self
            .guard("list graphs", async {
                self.db
                    .query("SELECT store_name FROM graph_meta ORDER BY store_name")
                    .await?
                    .take(0)
            })
            .await?;
        Ok(rows.into_iter().map(|r| r.store_name).collect())
    }

    async fn meta(&self, store_name: &str) -> Result<Option<MetaRecord>, StoreError> {
        self.guard("read graph meta", async {
            self.db
                .query("SELECT * FROM graph_meta WHERE store_name = $name LIMIT 1")
                .bind(("name", store_name.to_string()))
                .await?
                .take(0)
        })
        .await
    }

    async fn write_batch<T: Serialize + 'static>(
        &self,
        table: &str,
        chunk: Vec<T>,
        store_name: &str,
        batch_index: usize,
    ) -> Result<(), StoreError> {
        let count = chunk.len();
        self.guard(&format!("write batch {batch_index}"), async {
            let _: Vec<serde_json::Value> = self.db.insert(table).content(chunk).await?;
            Ok(())
        })
        .await
        .map_err(|err| match err {
            StoreError::Timeout { .. } => err,
            other => StoreError::PartialWrite {
                store_name: store_name.to_string(),
                batch: batch_index,
                message: other.to_string(),
            },
        })?;
        debug!(table, batch_index, count, "batch written");
        Ok(())
    }

    async fn sweep(&self, store_name: &str, keep_generation: &str) -> Result<(), StoreError> {
        self.guard("sweep old generations", async {
            self.db
                .query("DELETE graph_node WHERE store_name = $name AND generation != $gen")
                .bind(("name", store_name.to_string()))
                .bind(("gen", keep_generation.to_string()))
                .await?;
            self.db
                .query("DELETE graph_edge WHERE store_name = $name AND generation != $gen")
                .bind(("name", store_name.to_string()))
                .bind(("gen", keep_generation.to_string()))
                .await?;
            Ok(())
        })
        .await
    }

    /// Runs a store operation under the configured deadline.
    async fn guard<T, F>(&self, operation: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, surrealdb::Error>>,
    {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result.map_err(|e| StoreError::Unavailable(e.to_string())),
                Err(_) => Err(StoreError::Timeout {
                    operation: operation.to_string(),
                    timeout: limit,
                }),
            },
            None => fut.await.map_err(|e| StoreError::Unavailable(e.to_string())),
        }
    }
}

fn corrupt(store_name: &str, err: GraphError) -> StoreError {
    StoreError::Corrupt {
        store_name: store_name.to_string(),
        message: err.to_string(),
    }
}
