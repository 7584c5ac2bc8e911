use std::time::Duration;

use sema_core::catalog::rows::{ConceptFieldRow, PerspectiveConceptRow, RelationshipRow};
use sema_core::{load_graphs, Engine, Graph, GraphStore, MemoryCatalog, StoreError};
use serde::Serialize;
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;
use tempfile::TempDir;

async fn open_db(temp: &TempDir) -> Surreal<Db> {
    let db = Surreal::new::<RocksDb>(temp.path().join("graphs.db"))
        .await
        .unwrap();
    db.use_ns("sema").use_db("graphs").await.unwrap();
    db
}

/// A catalog whose relationships carry every enrichment field, so the
/// round-trip checks cover nested attributes.
fn enriched_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_table("product", "dimension", "Products")
        .with_table("order", "fact", "Customer orders")
        .with_table("customer", "dimension", "Customers")
        .with_relationship(RelationshipRow {
            from_table: "product".to_string(),
            to_table: "order".to_string(),
            relationship_type: "one_to_many".to_string(),
            join_column: "order_id".to_string(),
            weight: 2.5,
            join_column_description: Some("Order identifier".to_string()),
            natural_language_alias: Some("orders of a product".to_string()),
            few_shot_example: Some("SELECT * FROM order JOIN product USING (order_id)".to_string()),
            context: Some("Sales reporting".to_string()),
        })
        .with_join("order", "customer", "many_to_one", "customer_id")
        .with_intent(1, "sales-review", "Sales analysis")
        .with_perspective(1, "Sales", "Sales viewpoint")
        .with_concept(1, "ORDER_VALUE", "Monetary value of an order")
        .with_concept_field(ConceptFieldRow {
            concept_id: 1,
            table_name: "order".to_string(),
            field_name: "total".to_string(),
            is_primary: true,
            table_alias: Some("orders".to_string()),
        })
        .with_intent_perspective(1, 1, 0.8)
        .with_perspective_concept(PerspectiveConceptRow {
            perspective_id: 1,
            concept_id: 1,
            influence: Some("elevates".to_string()),
            elevation_weight: Some(0.9),
        })
}

async fn build_graphs() -> (Graph, Graph) {
    let graphs = load_graphs(&enriched_catalog()).await.unwrap();
    (graphs.schema, graphs.semantic)
}

#[tokio::test]
async fn test_round_trip_preserves_all_attributes() {
    let temp = TempDir::new().unwrap();
    let store = GraphStore::connect(&temp.path().join("graphs.db")).await.unwrap();
    let (schema, semantic) = build_graphs().await;

    let report = store.persist(&schema, "schema", 2, false).await.unwrap();
    assert_eq!(report.nodes_written, schema.node_count());
    assert_eq!(report.edges_written, schema.edge_count());
    store.persist(&semantic, "semantic", 100, false).await.unwrap();

    assert_eq!(store.load("schema", true).await.unwrap(), schema);
    assert_eq!(store.load("semantic", true).await.unwrap(), semantic);
}

#[tokio::test]
async fn test_loaded_graph_answers_queries() {
    let temp = TempDir::new().unwrap();
    let store = GraphStore::connect(&temp.path().join("graphs.db")).await.unwrap();
    let (schema, semantic) = build_graphs().await;
    store.persist(&schema, "schema", 10, false).await.unwrap();
    store.persist(&semantic, "semantic", 10, false).await.unwrap();

    let engine = Engine::from_graphs(
        store.load("schema", true).await.unwrap(),
        store.load("semantic", true).await.unwrap(),
    );
    let steps = engine.resolve_join_path("product", "customer").unwrap();
    assert_eq!(steps.len(), 2);
    let resolution = engine.resolve_concept("sales-review", "total", None).unwrap();
    assert_eq!(resolution.concept, "ORDER_VALUE");
}

#[tokio::test]
async fn test_existing_graph_requires_overwrite() {
    let temp = TempDir::new().unwrap();
    let store = GraphStore::connect(&temp.path().join("graphs.db")).await.unwrap();
    let (schema, _) = build_graphs().await;

    store.persist(&schema, "schema", 10, false).await.unwrap();
    let err = store.persist(&schema, "schema", 10, false).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }));

    // The refused persist must not have touched the stored graph.
    assert_eq!(store.load("schema", true).await.unwrap(), schema);
}

#[tokio::test]
async fn test_overwrite_replaces_previous_graph() {
    let temp = TempDir::new().unwrap();
    let store = GraphStore::connect(&temp.path().join("graphs.db")).await.unwrap();
    let (schema, semantic) = build_graphs().await;

    store.persist(&schema, "current", 10, false).await.unwrap();
    store.persist(&semantic, "current", 10, true).await.unwrap();

    assert_eq!(store.load("current", true).await.unwrap(), semantic);
}

#[tokio::test]
async fn test_missing_graph_reports_not_found() {
    let temp = TempDir::new().unwrap();
    let store = GraphStore::connect(&temp.path().join("graphs.db")).await.unwrap();
    let err = store.load("nope", true).await.unwrap_err();
    assert!(matches!(err, StoreError::GraphNotFound { .. }));
}

#[derive(Serialize)]
struct StrayRecord {
    store_name: String,
    generation: String,
    label: String,
    attrs: serde_json::Value,
}

#[tokio::test]
async fn test_uncommitted_generation_is_invisible() {
    let temp = TempDir::new().unwrap();
    let db = open_db(&temp).await;
    let store = GraphStore::from_connection(db.clone()).await.unwrap();
    let (schema, _) = build_graphs().await;
    store.persist(&schema, "schema", 10, false).await.unwrap();

    // Records of a generation that never reached its meta commit, as an
    // aborted overwrite would leave behind.
    let stray = StrayRecord {
        store_name: "schema".to_string(),
        generation: "aborted-generation".to_string(),
        label: "zzz_partial".to_string(),
        attrs: serde_json::json!({"node_type": "table", "kind": "fact", "description": ""}),
    };
    let _: Vec<serde_json::Value> = db.insert("graph_node").content(vec![stray]).await.unwrap();

    assert_eq!(store.load("schema", true).await.unwrap(), schema);
}

#[tokio::test]
async fn test_cancelled_overwrite_leaves_prior_graph_intact() {
    let temp = TempDir::new().unwrap();
    let db = open_db(&temp).await;
    let store = GraphStore::from_connection(db.clone()).await.unwrap();
    let (schema, semantic) = build_graphs().await;
    store.persist(&schema, "schema", 10, false).await.unwrap();

    // A deadline this tight cancels the persist before its meta commit.
    let cancelled = GraphStore::from_connection(db.clone())
        .await
        .unwrap()
        .with_timeout(Duration::from_nanos(1));
    let err = cancelled.persist(&semantic, "schema", 1, true).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Timeout { .. } | StoreError::PartialWrite { .. }
    ));

    assert_eq!(store.load("schema", true).await.unwrap(), schema);
}

#[tokio::test]
async fn test_drop_graph_removes_it() {
    let temp = TempDir::new().unwrap();
    let store = GraphStore::connect(&temp.path().join("graphs.db")).await.unwrap();
    let (schema, _) = build_graphs().await;
    store.persist(&schema, "schema", 10, false).await.unwrap();

    store.drop_graph("schema").await.unwrap();
    assert!(matches!(
        store.load("schema", true).await.unwrap_err(),
        StoreError::GraphNotFound { .. }
    ));
    assert!(matches!(
        store.drop_graph("schema").await.unwrap_err(),
        StoreError::GraphNotFound { .. }
    ));
}

#[tokio::test]
async fn test_exists_and_list_graphs() {
    let temp = TempDir::new().unwrap();
    let store = GraphStore::connect(&temp.path().join("graphs.db")).await.unwrap();
    let (schema, semantic) = build_graphs().await;

    assert!(!store.exists("schema").await.unwrap());
    store.persist(&schema, "schema", 10, false).await.unwrap();
    store.persist(&semantic, "semantic", 10, false).await.unwrap();

    assert!(store.exists("schema").await.unwrap());
    assert_eq!(
        store.list_graphs().await.unwrap(),
        vec!["schema".to_string(), "semantic".to_string()]
    );
}

#[tokio::test]
async fn test_undirected_load_keeps_lookups_working() {
    let temp = TempDir::new().unwrap();
    let store = GraphStore::connect(&temp.path().join("graphs.db")).await.unwrap();
    let (schema, _) = build_graphs().await;
    store.persist(&schema, "schema", 10, false).await.unwrap();

    let undirected = store.load("schema", false).await.unwrap();
    assert!(!undirected.directed());
    assert_eq!(undirected.node_count(), schema.node_count());
    assert_eq!(undirected.edge_count(), schema.edge_count());
    assert!(undirected.get_edge("customer", "order").is_some());
}
