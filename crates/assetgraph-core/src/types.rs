//! Core domain types for the asset knowledge graph.
//!
//! Nodes carry opaque store-assigned identifiers, a label set (first label
//! is the primary type for display), and a free-form attribute map that
//! passes embedding vectors and fingerprint hashes through untouched.

use serde::{Deserialize, Serialize};

use crate::validity::ValidityFilter;

/// A node as returned across the tool boundary.
///
/// `node_id` is an opaque string assigned by the store; it is stable within
/// a session but callers must never parse or construct one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: String,
    pub labels: Vec<String>,
    pub attributes: serde_json::Value,
}

impl NodeRecord {
    /// The primary label (first in the label set), used for display.
    pub fn primary_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or("")
    }

    /// The human-readable `name` attribute, if present.
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(|v| v.as_str())
    }

    /// The `fingerprint` version hash, if present. Opaque to this core.
    pub fn fingerprint(&self) -> Option<&str> {
        self.attributes.get("fingerprint").and_then(|v| v.as_str())
    }

    /// Project the attribute map down to the requested keys.
    pub fn project_attributes(&mut self, keys: &[String]) {
        if let serde_json::Value::Object(map) = &mut self.attributes {
            map.retain(|k, _| keys.iter().any(|want| want == k));
        }
    }
}

/// Traversal direction relative to the start node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// `(target)-[r]->(start)` — e.g. assets LOCATED_IN a location.
    #[default]
    Incoming,
    /// `(start)-[r]->(target)`.
    Outgoing,
    /// Either direction.
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
            Direction::Both => "both",
        }
    }
}

/// How the surviving neighbor set is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    Count,
    List,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregationKind {
    /// Numeric reductions require a `property_name` on the request.
    pub fn requires_property(&self) -> bool {
        matches!(
            self,
            AggregationKind::Sum | AggregationKind::Avg | AggregationKind::Min | AggregationKind::Max
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::List => "list",
            AggregationKind::Sum => "sum",
            AggregationKind::Avg => "avg",
            AggregationKind::Min => "min",
            AggregationKind::Max => "max",
        }
    }
}

/// Name-matching mode for node resolution. Both modes compare
/// case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Exact,
    Prefix,
}

/// An immutable traversal/aggregation request.
///
/// Multiple start nodes (e.g. a prefix match that expanded to several
/// containers) run as a single query; a target reachable from more than one
/// start node, or via more than one qualifying edge, is counted once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub start_node_ids: Vec<String>,
    pub relationship_types: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
    pub aggregation: AggregationKind,
    #[serde(default)]
    pub target_label: Option<String>,
    /// Required for sum/avg/min/max.
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub validity_filter: Option<ValidityFilter>,
    #[serde(default)]
    pub limit: Option<i64>,
    /// For `list`: restrict returned attributes to these keys (None = all).
    #[serde(default)]
    pub include_attributes: Option<Vec<String>>,
}

/// The reduced value of an aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregationValue {
    Count(i64),
    /// Numeric reduction; None when no surviving node carried the property.
    Number(Option<f64>),
    Nodes(Vec<NodeRecord>),
}

/// Result of one aggregation request.
///
/// `relationships_traversed` is the raw qualifying edge count before node
/// dedup; `targets_matched` the distinct node count. The two can
/// legitimately differ and both are part of the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    pub value: AggregationValue,
    pub relationships_traversed: i64,
    pub targets_matched: i64,
    /// Nodes excluded from a numeric reduction because they lack the
    /// requested property. Never silently coerced to zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_property: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_label_and_name() {
        let node = NodeRecord {
            node_id: "4:abc:17".to_string(),
            labels: vec!["Location".to_string(), "Container".to_string()],
            attributes: serde_json::json!({"name": "Biofilter 11", "fingerprint": "AA_H01"}),
        };
        assert_eq!(node.primary_label(), "Location");
        assert_eq!(node.name(), Some("Biofilter 11"));
        assert_eq!(node.fingerprint(), Some("AA_H01"));
    }

    #[test]
    fn test_project_attributes() {
        let mut node = NodeRecord {
            node_id: "4:abc:17".to_string(),
            labels: vec!["Asset".to_string()],
            attributes: serde_json::json!({"name": "Pump_001", "description": "main pump"}),
        };
        node.project_attributes(&["name".to_string()]);
        let map = node.attributes.as_object().unwrap();
        assert!(map.contains_key("name"));
        assert!(!map.contains_key("description"));
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: AggregationRequest = serde_json::from_value(serde_json::json!({
            "start_node_ids": ["4:abc:17"],
            "relationship_types": ["LOCATED_IN"],
            "aggregation": "count"
        }))
        .unwrap();
        assert_eq!(req.direction, Direction::Incoming);
        assert!(req.target_label.is_none());
        assert!(req.validity_filter.is_none());
    }

    #[test]
    fn test_requires_property() {
        assert!(AggregationKind::Sum.requires_property());
        assert!(AggregationKind::Avg.requires_property());
        assert!(!AggregationKind::Count.requires_property());
        assert!(!AggregationKind::List.requires_property());
    }
}
