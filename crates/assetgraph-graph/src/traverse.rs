//! Generic traversal/aggregation engine.
//!
//! One store round trip per request. The Cypher text is assembled from a
//! fixed set of templates: three direction patterns, three result shapes
//! (count, numeric, list), three validity clauses. Every variable part —
//! start ids, relationship types, target label, property name, as-of
//! instant, limit — is a bound parameter, so no caller-controlled string
//! ever reaches the query text.
//!
//! Node-identity dedup happens in the query (`WITH target, count(r)`), so a
//! target reachable from several start nodes or via several qualifying
//! edges is aggregated once while `relationships_traversed` keeps the raw
//! edge count.

use assetgraph_core::{
    AggregationKind, AggregationRequest, AggregationResult, AggregationValue, Direction,
    NodeRecord, ValidityFilter,
};
use neo4rs::query;

use crate::client::{GraphClient, GraphError};
use crate::rows::node_record_from_value;

/// Hard ceiling applied when the request carries no limit.
pub const DEFAULT_LIMIT: i64 = 1000;

/// The three result shapes a template can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultShape {
    Count,
    Numeric,
    List,
}

impl ResultShape {
    fn for_kind(kind: AggregationKind) -> Self {
        match kind {
            AggregationKind::Count => ResultShape::Count,
            AggregationKind::List => ResultShape::List,
            AggregationKind::Sum
            | AggregationKind::Avg
            | AggregationKind::Min
            | AggregationKind::Max => ResultShape::Numeric,
        }
    }
}

/// The traversal pattern for each direction. `start` and `target` are the
/// fixed variable names shared by all templates.
fn direction_pattern(direction: Direction) -> &'static str {
    match direction {
        Direction::Incoming => "(target)-[r]->(start)",
        Direction::Outgoing => "(start)-[r]->(target)",
        Direction::Both => "(start)-[r]-(target)",
    }
}

/// The validity clause for the filter shape. Open edges carry no
/// `validity_to` (or an empty string, matching ingested data); the as-of
/// end compare is strict, so an edge closed at `t` is not live at `t`.
fn validity_clause(filter: Option<&ValidityFilter>) -> &'static str {
    match filter {
        Some(f) if f.as_of.is_some() => {
            " AND r.validity_from <= datetime($as_of)\
             \n  AND (r.validity_to IS NULL OR r.validity_to = '' OR r.validity_to > datetime($as_of))"
        }
        Some(f) if f.current_only == Some(true) => {
            " AND (r.validity_to IS NULL OR r.validity_to = '')"
        }
        _ => "",
    }
}

/// Assemble the Cypher for a request shape. Pure; unit-tested.
fn build_cypher(shape: ResultShape, direction: Direction, filter: Option<&ValidityFilter>) -> String {
    let pattern = direction_pattern(direction);
    let validity = validity_clause(filter);
    let head = format!(
        "MATCH (start) WHERE elementId(start) IN $start_ids\n\
         MATCH {pattern}\n\
         WHERE type(r) IN $rel_types\n\
         \x20 AND ($target_label = '' OR $target_label IN labels(target)){validity}\n\
         WITH target, count(r) AS edge_count\n"
    );
    let tail = match shape {
        ResultShape::Count => {
            "RETURN coalesce(sum(edge_count), 0) AS rels, count(target) AS targets"
        }
        ResultShape::Numeric => {
            "RETURN coalesce(sum(edge_count), 0) AS rels,\n\
             \x20      count(target) AS targets,\n\
             \x20      count(CASE WHEN target[$prop] IS NULL THEN 1 END) AS missing,\n\
             \x20      toFloat(sum(target[$prop])) AS agg_sum,\n\
             \x20      toFloat(avg(target[$prop])) AS agg_avg,\n\
             \x20      toFloat(min(target[$prop])) AS agg_min,\n\
             \x20      toFloat(max(target[$prop])) AS agg_max"
        }
        ResultShape::List => {
            "WITH collect({node_id: elementId(target), labels: labels(target), props: properties(target)}) AS ts,\n\
             \x20    coalesce(sum(edge_count), 0) AS rels\n\
             RETURN rels, size(ts) AS targets, ts[0..$limit] AS nodes"
        }
    };
    format!("{head}{tail}")
}

impl GraphClient {
    /// Enumerate neighbors of the start node set and reduce them under the
    /// requested aggregation.
    ///
    /// The request is assumed validated (allow-listed labels and
    /// relationship types, unambiguous validity filter, property name
    /// present for numeric kinds); validation lives with the tool layer so
    /// every caller goes through one choke point.
    pub async fn aggregate(&self, req: &AggregationRequest) -> Result<AggregationResult, GraphError> {
        if req.start_node_ids.is_empty() {
            return Ok(empty_result(req.aggregation));
        }

        let shape = ResultShape::for_kind(req.aggregation);
        let cypher = build_cypher(shape, req.direction, req.validity_filter.as_ref());
        let limit = req.limit.unwrap_or(DEFAULT_LIMIT);

        let mut q = query(&cypher)
            .param("start_ids", req.start_node_ids.clone())
            .param("rel_types", req.relationship_types.clone())
            .param(
                "target_label",
                req.target_label.clone().unwrap_or_default(),
            );
        if shape == ResultShape::List {
            q = q.param("limit", limit);
        }
        if shape == ResultShape::Numeric {
            q = q.param("prop", req.property_name.clone().unwrap_or_default());
        }
        if let Some(filter) = &req.validity_filter {
            if let Some(as_of) = filter.as_of {
                q = q.param("as_of", as_of.to_rfc3339());
            }
        }

        tracing::debug!(
            aggregation = req.aggregation.as_str(),
            direction = req.direction.as_str(),
            starts = req.start_node_ids.len(),
            "running aggregation query"
        );

        let row = match self.query_one(q).await? {
            Some(row) => row,
            None => return Ok(empty_result(req.aggregation)),
        };

        let rels: i64 = row
            .get("rels")
            .map_err(|e| GraphError::Serialization(format!("missing rels column: {e}")))?;
        let targets: i64 = row
            .get("targets")
            .map_err(|e| GraphError::Serialization(format!("missing targets column: {e}")))?;

        match shape {
            ResultShape::Count => Ok(AggregationResult {
                value: AggregationValue::Count(targets),
                relationships_traversed: rels,
                targets_matched: targets,
                missing_property: None,
            }),
            ResultShape::Numeric => {
                let missing: i64 = row
                    .get("missing")
                    .map_err(|e| GraphError::Serialization(format!("missing column: {e}")))?;
                let column = match req.aggregation {
                    AggregationKind::Sum => "agg_sum",
                    AggregationKind::Avg => "agg_avg",
                    AggregationKind::Min => "agg_min",
                    AggregationKind::Max => "agg_max",
                    _ => unreachable!("numeric shape covers only numeric kinds"),
                };
                let raw: Option<f64> = row.get(column).unwrap_or(None);
                // All nulls (or zero survivors) means "no data", not zero.
                let value = if targets - missing == 0 { None } else { raw };
                Ok(AggregationResult {
                    value: AggregationValue::Number(value),
                    relationships_traversed: rels,
                    targets_matched: targets,
                    missing_property: Some(missing),
                })
            }
            ResultShape::List => {
                let nodes_raw: serde_json::Value = row
                    .get("nodes")
                    .map_err(|e| GraphError::Serialization(format!("missing nodes column: {e}")))?;
                let mut nodes = Vec::new();
                if let serde_json::Value::Array(entries) = nodes_raw {
                    for entry in &entries {
                        let mut record = node_record_from_value(entry)?;
                        if let Some(keys) = &req.include_attributes {
                            record.project_attributes(keys);
                        }
                        nodes.push(record);
                    }
                }
                Ok(AggregationResult {
                    value: AggregationValue::Nodes(nodes),
                    relationships_traversed: rels,
                    targets_matched: targets,
                    missing_property: None,
                })
            }
        }
    }
}

fn empty_result(kind: AggregationKind) -> AggregationResult {
    let value = match ResultShape::for_kind(kind) {
        ResultShape::Count => AggregationValue::Count(0),
        ResultShape::Numeric => AggregationValue::Number(None),
        ResultShape::List => AggregationValue::Nodes(Vec::new()),
    };
    AggregationResult {
        value,
        relationships_traversed: 0,
        targets_matched: 0,
        missing_property: if matches!(ResultShape::for_kind(kind), ResultShape::Numeric) {
            Some(0)
        } else {
            None
        },
    }
}

/// Helper for tool-layer compositions that list live neighbors.
pub fn neighbor_list_request(
    start_node_ids: Vec<String>,
    relationship_types: Vec<String>,
    direction: Direction,
    limit: i64,
) -> AggregationRequest {
    AggregationRequest {
        start_node_ids,
        relationship_types,
        direction,
        aggregation: AggregationKind::List,
        target_label: None,
        property_name: None,
        validity_filter: Some(ValidityFilter::current_only()),
        limit: Some(limit),
        include_attributes: None,
    }
}
