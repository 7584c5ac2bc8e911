//! Concept elevation: resolving which concept owns an ambiguous field name.
//!
//! A field name such as `severity` can carry different concepts in
//! different tables. Given an intent, each candidate concept is scored from
//! the perspectives the intent operates within plus any direct intent
//! preference, and the highest-scoring concept's primary field wins. Every
//! decision is reported back in the resolution rationale so catalog authors
//! can audit why a field was chosen.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{concept_id, intent_id, local_name, EdgeAttrs, Graph, InfluencePolarity, NodeAttrs};

/// The authoritative field for an ambiguous name under a given intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub concept: String,
    pub table: String,
    pub column: String,
    /// Elevation score of the winning concept.
    pub score: f64,
    /// Names the perspective/intent edges that decided the outcome.
    pub rationale: String,
}

/// Errors raised by concept resolution.
#[derive(Debug, Error, PartialEq)]
pub enum ElevationError {
    #[error("Unknown intent: `{name}`")]
    UnknownIntent { name: String },

    #[error("No concept can mean field `{field}`{}", scope_suffix(.scope))]
    NoApplicableConcept { field: String, scope: Option<String> },

    /// Resolution stalled at the table level; the candidate list tells the
    /// operator which disambiguating catalog edge (or table scope) to add.
    #[error("Ambiguous resolution of `{field}` for intent `{intent}`: {detail}; candidates: {candidates:?}")]
    AmbiguousResolution {
        intent: String,
        field: String,
        detail: String,
        candidates: Vec<String>,
    },
}

fn scope_suffix(scope: &Option<String>) -> String {
    match scope {
        Some(table) => format!(" in table `{table}`"),
        None => String::new(),
    }
}

#[derive(Debug, Clone)]
struct FieldCandidate {
    table: String,
    column: String,
    is_primary: bool,
    table_alias: String,
}

/// Resolves the authoritative `(table, column)` for `field_name` under
/// `intent_name`.
///
/// `table_scope` narrows the candidate fields to one table; callers pass it
/// when a previous attempt reported a table-level ambiguity.
pub fn resolve_concept(
    semantic: &Graph,
    intent_name: &str,
    field_name: &str,
    table_scope: Option<&str>,
) -> Result<Resolution, ElevationError> {
    let intent_node = intent_id(intent_name);
    if !semantic.contains_node(&intent_node) {
        return Err(ElevationError::UnknownIntent {
            name: intent_name.to_string(),
        });
    }

    // Every concept reachable via CAN_MEAN from a field with the ambiguous
    // name, together with the fields that carry it.
    let mut candidates: BTreeMap<String, Vec<FieldCandidate>> = BTreeMap::new();
    for (field_node, attrs) in semantic.nodes() {
        let NodeAttrs::Field { table, column } = attrs else {
            continue;
        };
        if column != field_name {
            continue;
        }
        if let Some(scope) = table_scope {
            if table != scope {
                continue;
            }
        }
        for (target, edge) in semantic.out_edges(field_node) {
            let EdgeAttrs::CanMean {
                is_primary,
                table_alias,
            } = edge
            else {
                continue;
            };
            candidates
                .entry(local_name(target).to_string())
                .or_default()
                .push(FieldCandidate {
                    table: table.clone(),
                    column: column.clone(),
                    is_primary: *is_primary,
                    table_alias: table_alias.clone(),
                });
        }
    }

    if candidates.is_empty() {
        return Err(ElevationError::NoApplicableConcept {
            field: field_name.to_string(),
            scope: table_scope.map(str::to_string),
        });
    }

    let mut scored: Vec<(String, f64, String)> = candidates
        .keys()
        .map(|concept| {
            let (score, rationale) = elevation_score(semantic, &intent_node, intent_name, concept);
            debug!(intent = intent_name, concept = concept.as_str(), score, "scored candidate");
            (concept.clone(), score, rationale)
        })
        .collect();

    // Highest score wins; exact ties fall back to the smallest CAN_MEAN
    // table alias, then the concept name. Names are unique, so the order is
    // total and a winner always exists.
    let min_alias = |concept: &str| -> String {
        candidates[concept]
            .iter()
            .map(|f| f.table_alias.clone())
            .min()
            .unwrap_or_default()
    };
    scored.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| min_alias(&a.0).cmp(&min_alias(&b.0)))
            .then_with(|| a.0.cmp(&b.0))
    });

    let (winner, score, mut rationale) = scored[0].clone();
    let tied: Vec<&str> = scored[1..]
        .iter()
        .filter(|(_, s, _)| s.total_cmp(&score).is_eq())
        .map(|(name, _, _)| name.as_str())
        .collect();
    if !tied.is_empty() {
        rationale.push_str(&format!(
            "; tie with {} broken by table alias `{}`",
            tied.join(", "),
            min_alias(&winner)
        ));
    }

    let fields = &candidates[&winner];
    let primaries: Vec<&FieldCandidate> = fields.iter().filter(|f| f.is_primary).collect();
    let describe = |list: &[&FieldCandidate]| -> Vec<String> {
        list.iter().map(|f| format!("{}.{}", f.table, f.column)).collect()
    };
    let resolved = match primaries.as_slice() {
        [only] => *only,
        [] => {
            return Err(ElevationError::AmbiguousResolution {
                intent: intent_name.to_string(),
                field: field_name.to_string(),
                detail: match table_scope {
                    Some(scope) => {
                        format!("concept `{winner}` has no primary field in table `{scope}`")
                    }
                    None => format!("concept `{winner}` has no primary field"),
                },
                candidates: describe(&fields.iter().collect::<Vec<_>>()),
            });
        }
        _ => {
            return Err(ElevationError::AmbiguousResolution {
                intent: intent_name.to_string(),
                field: field_name.to_string(),
                detail: format!(
                    "concept `{winner}` has primary fields in several tables; pass a table scope"
                ),
                candidates: describe(&primaries),
            });
        }
    };

    Ok(Resolution {
        concept: winner,
        table: resolved.table.clone(),
        column: resolved.column.clone(),
        score,
        rationale,
    })
}

/// Scores one concept for one intent and explains the contributions.
fn elevation_score(
    semantic: &Graph,
    intent_node: &str,
    intent_name: &str,
    concept: &str,
) -> (f64, String) {
    let concept_node = concept_id(concept);
    let mut score = 0.0;
    let mut parts: Vec<String> = Vec::new();

    for (perspective_node, edge) in semantic.out_edges(intent_node) {
        let EdgeAttrs::OperatesWithin { weight: factor } = edge else {
            continue;
        };
        let Some(EdgeAttrs::UsesDefinition { influence, weight }) =
            semantic.directed_edge(perspective_node, &concept_node)
        else {
            continue;
        };
        let contribution = factor * influence.signed(*weight);
        score += contribution;
        let verb = match influence {
            InfluencePolarity::Elevates => "elevates",
            InfluencePolarity::Suppresses => "suppresses",
            InfluencePolarity::Neutral => "is neutral on",
        };
        parts.push(format!(
            "perspective `{}` {verb} `{concept}` (factor {factor:.2} x weight {weight:.2} = {contribution:+.2})",
            local_name(perspective_node),
        ));
    }

    if let Some(EdgeAttrs::Influence { weight }) = semantic.directed_edge(intent_node, &concept_node)
    {
        score += weight;
        parts.push(format!("intent `{intent_name}` adds direct weight {weight:+.0}"));
    }

    let rationale = if parts.is_empty() {
        format!("no perspective or direct weighting applies to `{concept}`; score 0.00")
    } else {
        format!("{}; score {score:.2}", parts.join("; "))
    };
    (score, rationale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{field_id, perspective_id};

    fn node(graph: &mut Graph, id: String, attrs: NodeAttrs) {
        graph.add_node(id, attrs).unwrap();
    }

    fn intent(graph: &mut Graph, name: &str) {
        node(
            graph,
            intent_id(name),
            NodeAttrs::Intent {
                description: String::new(),
            },
        );
    }

    fn perspective(graph: &mut Graph, name: &str) {
        node(
            graph,
            perspective_id(name),
            NodeAttrs::Perspective {
                description: String::new(),
            },
        );
    }

    fn concept(graph: &mut Graph, name: &str) {
        node(
            graph,
            concept_id(name),
            NodeAttrs::Concept {
                description: String::new(),
            },
        );
    }

    fn field(graph: &mut Graph, table: &str, column: &str) {
        node(
            graph,
            field_id(table, column),
            NodeAttrs::Field {
                table: table.to_string(),
                column: column.to_string(),
            },
        );
    }

    fn can_mean(graph: &mut Graph, table: &str, column: &str, concept: &str, primary: bool) {
        graph
            .add_edge(
                &field_id(table, column),
                &concept_id(concept),
                EdgeAttrs::CanMean {
                    is_primary: primary,
                    table_alias: table.to_string(),
                },
            )
            .unwrap();
    }

    fn operates(graph: &mut Graph, intent: &str, perspective: &str, weight: f64) {
        graph
            .add_edge(
                &intent_id(intent),
                &perspective_id(perspective),
                EdgeAttrs::OperatesWithin { weight },
            )
            .unwrap();
    }

    fn uses(graph: &mut Graph, perspective: &str, concept: &str, influence: InfluencePolarity, weight: f64) {
        graph
            .add_edge(
                &perspective_id(perspective),
                &concept_id(concept),
                EdgeAttrs::UsesDefinition { influence, weight },
            )
            .unwrap();
    }

    /// Severity appears in two tables meaning two different concepts; the
    /// quality perspective elevates one and suppresses the other.
    fn quality_graph(elevation: f64) -> Graph {
        let mut graph = Graph::new();
        intent(&mut graph, "quality-review");
        perspective(&mut graph, "Quality");
        concept(&mut graph, "MATERIAL_NON_CONFORMANCE");
        concept(&mut graph, "PRODUCTION_DEFECT");
        field(&mut graph, "non_conformant_materials", "severity");
        field(&mut graph, "product_defects", "severity");
        can_mean(&mut graph, "non_conformant_materials", "severity", "MATERIAL_NON_CONFORMANCE", true);
        can_mean(&mut graph, "product_defects", "severity", "PRODUCTION_DEFECT", true);
        operates(&mut graph, "quality-review", "Quality", 1.0);
        uses(&mut graph, "Quality", "MATERIAL_NON_CONFORMANCE", InfluencePolarity::Elevates, elevation);
        uses(&mut graph, "Quality", "PRODUCTION_DEFECT", InfluencePolarity::Suppresses, 0.0);
        graph
    }

    #[test]
    fn test_elevated_concept_wins() {
        let graph = quality_graph(1.0);
        let resolution = resolve_concept(&graph, "quality-review", "severity", None).unwrap();
        assert_eq!(resolution.concept, "MATERIAL_NON_CONFORMANCE");
        assert_eq!(resolution.table, "non_conformant_materials");
        assert_eq!(resolution.column, "severity");
        assert!(resolution.rationale.contains("perspective `Quality` elevates"));
    }

    #[test]
    fn test_score_monotonic_in_elevation_weight() {
        let low = resolve_concept(&quality_graph(0.4), "quality-review", "severity", None).unwrap();
        let high = resolve_concept(&quality_graph(0.9), "quality-review", "severity", None).unwrap();
        assert!(high.score > low.score);
        assert_eq!(low.concept, high.concept);
    }

    #[test]
    fn test_suppression_lowers_score_below_neutral() {
        let mut graph = Graph::new();
        intent(&mut graph, "review");
        perspective(&mut graph, "P");
        concept(&mut graph, "GOOD");
        concept(&mut graph, "BAD");
        field(&mut graph, "t1", "x");
        field(&mut graph, "t2", "x");
        can_mean(&mut graph, "t1", "x", "GOOD", true);
        can_mean(&mut graph, "t2", "x", "BAD", true);
        operates(&mut graph, "review", "P", 1.0);
        uses(&mut graph, "P", "GOOD", InfluencePolarity::Neutral, 1.0);
        uses(&mut graph, "P", "BAD", InfluencePolarity::Suppresses, 0.8);
        let resolution = resolve_concept(&graph, "review", "x", None).unwrap();
        assert_eq!(resolution.concept, "GOOD");
    }

    #[test]
    fn test_direct_intent_weight_decides() {
        let mut graph = Graph::new();
        intent(&mut graph, "review");
        concept(&mut graph, "A_CONCEPT");
        concept(&mut graph, "B_CONCEPT");
        field(&mut graph, "ta", "x");
        field(&mut graph, "tb", "x");
        can_mean(&mut graph, "ta", "x", "A_CONCEPT", true);
        can_mean(&mut graph, "tb", "x", "B_CONCEPT", true);
        graph
            .add_edge(&intent_id("review"), &concept_id("B_CONCEPT"), EdgeAttrs::Influence { weight: 1.0 })
            .unwrap();

        let resolution = resolve_concept(&graph, "review", "x", None).unwrap();
        assert_eq!(resolution.concept, "B_CONCEPT");
        assert!(resolution.rationale.contains("direct weight +1"));
    }

    #[test]
    fn test_tie_breaks_by_table_alias_then_name() {
        let mut graph = Graph::new();
        intent(&mut graph, "review");
        concept(&mut graph, "ZULU");
        concept(&mut graph, "ALPHA");
        field(&mut graph, "m_table", "x");
        field(&mut graph, "z_table", "x");
        // ZULU's field sits in the alphabetically smaller table, so the
        // alias tie-break picks ZULU despite its later name.
        can_mean(&mut graph, "m_table", "x", "ZULU", true);
        can_mean(&mut graph, "z_table", "x", "ALPHA", true);

        let resolution = resolve_concept(&graph, "review", "x", None).unwrap();
        assert_eq!(resolution.concept, "ZULU");
        assert!(resolution.rationale.contains("tie with ALPHA"));
    }

    #[test]
    fn test_no_applicable_concept() {
        let graph = quality_graph(1.0);
        let err = resolve_concept(&graph, "quality-review", "missing_column", None).unwrap_err();
        assert_eq!(
            err,
            ElevationError::NoApplicableConcept {
                field: "missing_column".to_string(),
                scope: None,
            }
        );
    }

    #[test]
    fn test_multiple_primaries_need_scope() {
        let mut graph = Graph::new();
        intent(&mut graph, "review");
        concept(&mut graph, "COST");
        field(&mut graph, "t1", "x");
        field(&mut graph, "t2", "x");
        can_mean(&mut graph, "t1", "x", "COST", true);
        can_mean(&mut graph, "t2", "x", "COST", true);

        let err = resolve_concept(&graph, "review", "x", None).unwrap_err();
        match err {
            ElevationError::AmbiguousResolution { candidates, .. } => {
                assert_eq!(candidates, vec!["t1.x", "t2.x"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }

        let scoped = resolve_concept(&graph, "review", "x", Some("t2")).unwrap();
        assert_eq!(scoped.table, "t2");
    }

    #[test]
    fn test_no_primary_in_scope() {
        let mut graph = Graph::new();
        intent(&mut graph, "review");
        concept(&mut graph, "COST");
        field(&mut graph, "t1", "x");
        can_mean(&mut graph, "t1", "x", "COST", false);

        let err = resolve_concept(&graph, "review", "x", Some("t1")).unwrap_err();
        assert!(matches!(err, ElevationError::AmbiguousResolution { .. }));
    }

    #[test]
    fn test_unknown_intent() {
        let graph = quality_graph(1.0);
        let err = resolve_concept(&graph, "nope", "severity", None).unwrap_err();
        assert_eq!(
            err,
            ElevationError::UnknownIntent {
                name: "nope".to_string()
            }
        );
    }
}
