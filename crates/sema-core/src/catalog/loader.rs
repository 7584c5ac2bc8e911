//! Graph construction from catalog rows.
//!
//! Nodes are loaded before edges, and association edges only after both
//! endpoint node types, so integrity validation never has to handle forward
//! references. Construction either fully succeeds or fails with the
//! offending row keys; callers never see a partially built graph.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::model::{
    concept_id, field_id, intent_id, perspective_id, EdgeAttrs, Graph, GraphError,
    InfluencePolarity, JoinEnrichment, NodeAttrs,
};

use super::rows::{
    ConceptFieldRow, ConceptRow, IntentConceptRow, IntentPerspectiveRow, IntentRow,
    PerspectiveConceptRow, PerspectiveRow, RelationshipRow, TableRow,
};
use super::{CatalogError, CatalogSource};

/// The two graphs produced by one catalog load.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogGraphs {
    pub schema: Graph,
    pub semantic: Graph,
}

/// Builds the schema graph: table nodes and join-relationship edges.
pub async fn build_schema_graph(source: &dyn CatalogSource) -> Result<Graph, CatalogError> {
    let tables = source.tables().await?;
    let relationships = source.relationships().await?;
    schema_from_rows(&tables, &relationships)
}

/// Builds the semantic graph: intent/perspective/concept/field nodes and
/// their association edges.
pub async fn build_semantic_graph(source: &dyn CatalogSource) -> Result<Graph, CatalogError> {
    let input = SemanticInput {
        tables: source.tables().await?,
        intents: source.intents().await?,
        perspectives: source.perspectives().await?,
        concepts: source.concepts().await?,
        concept_fields: source.concept_fields().await?,
        intent_perspectives: source.intent_perspectives().await?,
        perspective_concepts: source.perspective_concepts().await?,
        intent_concepts: source.intent_concepts().await?,
    };
    semantic_from_rows(&input)
}

/// Builds both graphs from a single pass over the catalog.
pub async fn load_graphs(source: &dyn CatalogSource) -> Result<CatalogGraphs, CatalogError> {
    let tables = source.tables().await?;
    let relationships = source.relationships().await?;
    let input = SemanticInput {
        tables: tables.clone(),
        intents: source.intents().await?,
        perspectives: source.perspectives().await?,
        concepts: source.concepts().await?,
        concept_fields: source.concept_fields().await?,
        intent_perspectives: source.intent_perspectives().await?,
        perspective_concepts: source.perspective_concepts().await?,
        intent_concepts: source.intent_concepts().await?,
    };

    let graphs = CatalogGraphs {
        schema: schema_from_rows(&tables, &relationships)?,
        semantic: semantic_from_rows(&input)?,
    };
    info!(
        schema_nodes = graphs.schema.node_count(),
        schema_edges = graphs.schema.edge_count(),
        semantic_nodes = graphs.semantic.node_count(),
        semantic_edges = graphs.semantic.edge_count(),
        "catalog load complete"
    );
    Ok(graphs)
}

struct SemanticInput {
    tables: Vec<TableRow>,
    intents: Vec<IntentRow>,
    perspectives: Vec<PerspectiveRow>,
    concepts: Vec<ConceptRow>,
    concept_fields: Vec<ConceptFieldRow>,
    intent_perspectives: Vec<IntentPerspectiveRow>,
    perspective_concepts: Vec<PerspectiveConceptRow>,
    intent_concepts: Vec<IntentConceptRow>,
}

fn schema_from_rows(
    tables: &[TableRow],
    relationships: &[RelationshipRow],
) -> Result<Graph, CatalogError> {
    let mut graph = Graph::new();

    for row in tables {
        graph
            .add_node(
                row.table_name.clone(),
                NodeAttrs::Table {
                    kind: row.table_type.clone(),
                    description: row.description.clone(),
                },
            )
            .map_err(|_| {
                CatalogError::integrity(
                    "tables",
                    format!("table_name={}", row.table_name),
                    "duplicate table name",
                )
            })?;
    }

    for row in relationships {
        let keys = format!("from_table={}, to_table={}", row.from_table, row.to_table);
        for endpoint in [&row.from_table, &row.to_table] {
            if !graph.contains_node(endpoint) {
                return Err(CatalogError::integrity(
                    "relationships",
                    keys.clone(),
                    format!("references unknown table `{endpoint}`"),
                ));
            }
        }
        if !row.weight.is_finite() || row.weight <= 0.0 {
            return Err(CatalogError::integrity(
                "relationships",
                keys.clone(),
                format!("weight must be finite and positive, got {}", row.weight),
            ));
        }
        let attrs = EdgeAttrs::Joins {
            relationship_kind: row.relationship_type.clone(),
            join_column: row.join_column.clone(),
            weight: row.weight,
            enrichment: JoinEnrichment {
                join_column_description: row.join_column_description.clone(),
                natural_language_alias: row.natural_language_alias.clone(),
                example_query: row.few_shot_example.clone(),
                context: row.context.clone(),
            },
        };
        add_row_edge(&mut graph, &row.from_table, &row.to_table, attrs, "relationships", &keys)?;
    }

    debug!(
        tables = tables.len(),
        relationships = relationships.len(),
        "schema graph built"
    );
    Ok(graph)
}

fn semantic_from_rows(input: &SemanticInput) -> Result<Graph, CatalogError> {
    let mut graph = Graph::new();

    let table_names: BTreeSet<&str> =
        input.tables.iter().map(|t| t.table_name.as_str()).collect();

    let intents = named_nodes(
        &mut graph,
        "intents",
        input.intents.iter().map(|r| (r.intent_id, r.intent_name.as_str(), r.description.as_str())),
        |name| intent_id(name),
        |description| NodeAttrs::Intent {
            description: description.to_string(),
        },
    )?;
    let perspectives = named_nodes(
        &mut graph,
        "perspectives",
        input
            .perspectives
            .iter()
            .map(|r| (r.perspective_id, r.perspective_name.as_str(), r.description.as_str())),
        |name| perspective_id(name),
        |description| NodeAttrs::Perspective {
            description: description.to_string(),
        },
    )?;
    let concepts = named_nodes(
        &mut graph,
        "concepts",
        input
            .concepts
            .iter()
            .map(|r| (r.concept_id, r.concept_name.as_str(), r.description.as_str())),
        |name| concept_id(name),
        |description| NodeAttrs::Concept {
            description: description.to_string(),
        },
    )?;

    // Field nodes and CAN_MEAN edges. A field may carry several concepts,
    // but each concept has at most one primary field per table.
    let mut primary_seen: BTreeSet<(i64, &str)> = BTreeSet::new();
    for row in &input.concept_fields {
        let keys = format!(
            "concept_id={}, table_name={}, field_name={}",
            row.concept_id, row.table_name, row.field_name
        );
        let concept_node = concepts.get(&row.concept_id).ok_or_else(|| {
            CatalogError::integrity("concept_fields", keys.clone(), "references unknown concept_id")
        })?;
        if !table_names.contains(row.table_name.as_str()) {
            return Err(CatalogError::integrity(
                "concept_fields",
                keys.clone(),
                format!("references unknown table `{}`", row.table_name),
            ));
        }
        if row.is_primary && !primary_seen.insert((row.concept_id, row.table_name.as_str())) {
            return Err(CatalogError::integrity(
                "concept_fields",
                keys.clone(),
                "second primary field for the same concept and table",
            ));
        }

        let field = field_id(&row.table_name, &row.field_name);
        if !graph.contains_node(&field) {
            graph.add_node(
                field.clone(),
                NodeAttrs::Field {
                    table: row.table_name.clone(),
                    column: row.field_name.clone(),
                },
            )?;
        }
        let attrs = EdgeAttrs::CanMean {
            is_primary: row.is_primary,
            table_alias: row
                .table_alias
                .clone()
                .unwrap_or_else(|| row.table_name.clone()),
        };
        add_row_edge(&mut graph, &field, concept_node, attrs, "concept_fields", &keys)?;
    }

    for row in &input.intent_perspectives {
        let keys = format!(
            "intent_id={}, perspective_id={}",
            row.intent_id, row.perspective_id
        );
        let intent_node = intents.get(&row.intent_id).ok_or_else(|| {
            CatalogError::integrity("intent_perspectives", keys.clone(), "references unknown intent_id")
        })?;
        let perspective_node = perspectives.get(&row.perspective_id).ok_or_else(|| {
            CatalogError::integrity(
                "intent_perspectives",
                keys.clone(),
                "references unknown perspective_id",
            )
        })?;
        check_unit_weight(row.intent_factor_weight, "intent_perspectives", &keys)?;
        let attrs = EdgeAttrs::OperatesWithin {
            weight: row.intent_factor_weight,
        };
        add_row_edge(&mut graph, intent_node, perspective_node, attrs, "intent_perspectives", &keys)?;
    }

    for row in &input.perspective_concepts {
        let keys = format!(
            "perspective_id={}, concept_id={}",
            row.perspective_id, row.concept_id
        );
        let perspective_node = perspectives.get(&row.perspective_id).ok_or_else(|| {
            CatalogError::integrity(
                "perspective_concepts",
                keys.clone(),
                "references unknown perspective_id",
            )
        })?;
        let concept_node = concepts.get(&row.concept_id).ok_or_else(|| {
            CatalogError::integrity("perspective_concepts", keys.clone(), "references unknown concept_id")
        })?;
        let influence = parse_influence(row.influence.as_deref(), &keys)?;
        let weight = row.elevation_weight.unwrap_or(1.0);
        check_unit_weight(weight, "perspective_concepts", &keys)?;
        let attrs = EdgeAttrs::UsesDefinition { influence, weight };
        add_row_edge(&mut graph, perspective_node, concept_node, attrs, "perspective_concepts", &keys)?;
    }

    for row in &input.intent_concepts {
        let keys = format!("intent_id={}, concept_id={}", row.intent_id, row.concept_id);
        let intent_node = intents.get(&row.intent_id).ok_or_else(|| {
            CatalogError::integrity("intent_concepts", keys.clone(), "references unknown intent_id")
        })?;
        let concept_node = concepts.get(&row.concept_id).ok_or_else(|| {
            CatalogError::integrity("intent_concepts", keys.clone(), "references unknown concept_id")
        })?;
        if ![-1.0, 0.0, 1.0].contains(&row.intent_factor_weight) {
            return Err(CatalogError::integrity(
                "intent_concepts",
                keys.clone(),
                format!(
                    "intent_factor_weight must be -1, 0 or 1, got {}",
                    row.intent_factor_weight
                ),
            ));
        }
        let attrs = EdgeAttrs::Influence {
            weight: row.intent_factor_weight,
        };
        add_row_edge(&mut graph, intent_node, concept_node, attrs, "intent_concepts", &keys)?;
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "semantic graph built"
    );
    Ok(graph)
}

/// Inserts id-keyed named nodes, rejecting duplicate ids and names, and
/// returns the id -> graph-node-id map used to resolve association rows.
fn named_nodes<'a>(
    graph: &mut Graph,
    relation: &str,
    rows: impl Iterator<Item = (i64, &'a str, &'a str)>,
    node_id: impl Fn(&str) -> String,
    attrs: impl Fn(&str) -> NodeAttrs,
) -> Result<BTreeMap<i64, String>, CatalogError> {
    let mut by_id = BTreeMap::new();
    for (id, name, description) in rows {
        let graph_id = node_id(name);
        if by_id.insert(id, graph_id.clone()).is_some() {
            return Err(CatalogError::integrity(
                relation,
                format!("id={id}"),
                "duplicate primary key",
            ));
        }
        graph.add_node(graph_id, attrs(description)).map_err(|_| {
            CatalogError::integrity(relation, format!("id={id}, name={name}"), "duplicate name")
        })?;
    }
    Ok(by_id)
}

fn add_row_edge(
    graph: &mut Graph,
    from: &str,
    to: &str,
    attrs: EdgeAttrs,
    relation: &str,
    keys: &str,
) -> Result<(), CatalogError> {
    match graph.add_edge(from, to, attrs) {
        Ok(()) => Ok(()),
        Err(GraphError::DuplicateEdge { .. }) => Err(CatalogError::integrity(
            relation,
            keys.to_string(),
            "duplicate row for the same ordered pair",
        )),
        Err(err) => Err(err.into()),
    }
}

fn check_unit_weight(weight: f64, relation: &str, keys: &str) -> Result<(), CatalogError> {
    if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
        return Err(CatalogError::integrity(
            relation,
            keys.to_string(),
            format!("weight must be within [0, 1], got {weight}"),
        ));
    }
    Ok(())
}

fn parse_influence(raw: Option<&str>, keys: &str) -> Result<InfluencePolarity, CatalogError> {
    match raw {
        None => Ok(InfluencePolarity::Neutral),
        Some("elevates") => Ok(InfluencePolarity::Elevates),
        Some("suppresses") => Ok(InfluencePolarity::Suppresses),
        Some("neutral") => Ok(InfluencePolarity::Neutral),
        Some(other) => Err(CatalogError::integrity(
            "perspective_concepts",
            keys.to_string(),
            format!("unknown influence label `{other}`"),
        )),
    }
}
