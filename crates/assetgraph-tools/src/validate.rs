//! Parameter validation against schema-derived allow-lists.
//!
//! Labels and relationship types must be members of the allow-list fetched
//! from the store (once, then cached); unknown values are rejected here and
//! never reach query construction. Strings used for name matching are not
//! restricted — they are always bound as query parameters downstream.

use std::collections::BTreeSet;

use assetgraph_core::ValidityFilter;
use assetgraph_graph::{mutations::is_valid_property_key, GraphSchema};

use crate::error::ToolError;
use crate::registry::ToolCall;

/// Allow-lists derived from the graph schema, fetched once per process.
#[derive(Debug, Clone)]
pub struct SchemaCache {
    labels: BTreeSet<String>,
    relationship_types: BTreeSet<String>,
    schema: GraphSchema,
}

impl SchemaCache {
    pub fn new(schema: GraphSchema) -> Self {
        Self {
            labels: schema.labels.iter().cloned().collect(),
            relationship_types: schema.relationship_types.iter().cloned().collect(),
            schema,
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn has_relationship_type(&self, rel_type: &str) -> bool {
        self.relationship_types.contains(rel_type)
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    fn labels_hint(&self) -> String {
        self.labels.iter().cloned().collect::<Vec<_>>().join(", ")
    }

    fn relationship_types_hint(&self) -> String {
        self.relationship_types
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Caps applied to caller-supplied values.
#[derive(Debug, Clone)]
pub struct ToolLimits {
    /// Result cap for list aggregations; caller values are clamped, never
    /// trusted.
    pub max_limit: i64,
    /// Depth bound for the transitive parent-containment walk.
    pub max_parent_depth: usize,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            max_limit: 1000,
            max_parent_depth: 10,
        }
    }
}

impl ToolLimits {
    /// Clamp a caller-supplied limit into `[1, max_limit]`.
    pub fn clamp(&self, limit: Option<i64>) -> i64 {
        limit.unwrap_or(self.max_limit).clamp(1, self.max_limit)
    }
}

/// Validate a parsed tool call before any query is built. Pure: no store
/// access happens here or before this point.
pub fn precheck(call: &ToolCall, schema: &SchemaCache, _limits: &ToolLimits) -> Result<(), ToolError> {
    match call {
        ToolCall::FindNode(input) => {
            require_name(&input.name)?;
            check_label(schema, input.label.as_deref(), "label")?;
        }
        ToolCall::CountNodesByName(input) => {
            require_name(&input.name)?;
            check_label(schema, input.label.as_deref(), "label")?;
        }
        ToolCall::CountByLabel(input) => {
            check_label(schema, Some(&input.label), "label")?;
        }
        ToolCall::AggregateRelated(input) => {
            if input.start_node_ids.is_empty() {
                return Err(ToolError::validation("start_node_ids cannot be empty"));
            }
            check_relationship_types(schema, &input.relationship_types)?;
            check_label(schema, input.target_label.as_deref(), "target_label")?;
            check_validity(&input.validity_filter)?;
            check_property_name(input.aggregation, input.property_name.as_deref())?;
        }
        ToolCall::AggregateRelatedByName(input) => {
            require_name(&input.name)?;
            if !matches!(
                input.aggregation,
                assetgraph_core::AggregationKind::Count | assetgraph_core::AggregationKind::List
            ) {
                return Err(ToolError::validation(
                    "aggregation must be 'count' or 'list' for aggregate_related_by_name",
                ));
            }
            check_relationship_types(schema, &input.relationship_types)?;
            check_label(schema, input.label.as_deref(), "label")?;
            check_label(schema, input.target_label.as_deref(), "target_label")?;
            check_validity(&input.validity_filter)?;
        }
        ToolCall::DescribeNodeConnections(input) => {
            require_name(&input.name)?;
        }
        ToolCall::GetSchema => {}
        ToolCall::UpdateNodeProperties(input) => {
            if input.node_id.is_empty() {
                return Err(ToolError::validation("node_id cannot be empty"));
            }
            if input.update.is_empty() {
                return Err(ToolError::validation(
                    "update must set or unset at least one property",
                ));
            }
            for key in input.update.set.keys().chain(input.update.unset.iter()) {
                if !is_valid_property_key(key) {
                    return Err(ToolError::validation(format!(
                        "invalid property key: {key:?}"
                    )));
                }
            }
            let mut seen = BTreeSet::new();
            for key in &input.update.unset {
                if !seen.insert(key.as_str()) {
                    return Err(ToolError::validation(format!(
                        "duplicate key in unset: {key}"
                    )));
                }
                if input.update.set.contains_key(key) {
                    return Err(ToolError::validation(format!(
                        "key appears in both set and unset: {key}"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn require_name(name: &str) -> Result<(), ToolError> {
    if name.trim().is_empty() {
        return Err(ToolError::validation("name cannot be empty"));
    }
    Ok(())
}

fn check_label(schema: &SchemaCache, label: Option<&str>, field: &str) -> Result<(), ToolError> {
    if let Some(label) = label {
        if !schema.has_label(label) {
            return Err(ToolError::validation(format!(
                "{field} must be one of [{}], got {label:?}",
                schema.labels_hint()
            )));
        }
    }
    Ok(())
}

fn check_relationship_types(schema: &SchemaCache, types: &[String]) -> Result<(), ToolError> {
    if types.is_empty() {
        return Err(ToolError::validation("relationship_types cannot be empty"));
    }
    for t in types {
        if !schema.has_relationship_type(t) {
            return Err(ToolError::validation(format!(
                "relationship type must be one of [{}], got {t:?}",
                schema.relationship_types_hint()
            )));
        }
    }
    Ok(())
}

fn check_validity(filter: &Option<ValidityFilter>) -> Result<(), ToolError> {
    if let Some(filter) = filter {
        if filter.is_ambiguous() {
            return Err(ToolError::validation(
                "validity_filter: as_of and current_only are mutually exclusive",
            ));
        }
    }
    Ok(())
}

fn check_property_name(
    aggregation: assetgraph_core::AggregationKind,
    property_name: Option<&str>,
) -> Result<(), ToolError> {
    if aggregation.requires_property() {
        let Some(name) = property_name else {
            return Err(ToolError::validation(format!(
                "aggregation '{}' requires property_name",
                aggregation.as_str()
            )));
        };
        if !is_valid_property_key(name) {
            return Err(ToolError::validation(format!(
                "invalid property_name: {name:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolCall;
    use assetgraph_core::AggregationKind;

    fn test_schema() -> SchemaCache {
        SchemaCache::new(GraphSchema {
            labels: ["Category", "Location", "System", "MeasuringUnit", "Asset", "Signal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            relationship_types: ["LOCATED_IN", "BELONGS_TO", "MEASURED_BY"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            property_keys: vec!["name".to_string(), "power_kw".to_string()],
        })
    }

    fn parse(name: &str, input: serde_json::Value) -> ToolCall {
        ToolCall::parse(name, input).unwrap()
    }

    #[test]
    fn test_unknown_relationship_type_rejected_before_any_store_call() {
        // precheck is pure; rejection proves no query was ever built.
        let call = parse(
            "aggregate_related",
            serde_json::json!({
                "start_node_ids": ["4:abc:1"],
                "relationship_types": ["LOCATED_IN", "DROP_EVERYTHING"],
                "aggregation": "count"
            }),
        );
        let err = precheck(&call, &test_schema(), &ToolLimits::default()).unwrap_err();
        assert_eq!(err.kind, crate::ToolErrorKind::Validation);
        assert!(err.message.contains("DROP_EVERYTHING"));
    }

    #[test]
    fn test_unknown_label_rejected() {
        let call = parse("count_by_label", serde_json::json!({"label": "Nope"}));
        assert!(precheck(&call, &test_schema(), &ToolLimits::default()).is_err());

        let call = parse("count_by_label", serde_json::json!({"label": "Asset"}));
        assert!(precheck(&call, &test_schema(), &ToolLimits::default()).is_ok());
    }

    #[test]
    fn test_numeric_aggregation_requires_property_name() {
        let call = parse(
            "aggregate_related",
            serde_json::json!({
                "start_node_ids": ["4:abc:1"],
                "relationship_types": ["LOCATED_IN"],
                "aggregation": "sum"
            }),
        );
        let err = precheck(&call, &test_schema(), &ToolLimits::default()).unwrap_err();
        assert!(err.message.contains("property_name"));

        let call = parse(
            "aggregate_related",
            serde_json::json!({
                "start_node_ids": ["4:abc:1"],
                "relationship_types": ["LOCATED_IN"],
                "aggregation": "sum",
                "property_name": "power_kw"
            }),
        );
        assert!(precheck(&call, &test_schema(), &ToolLimits::default()).is_ok());
    }

    #[test]
    fn test_ambiguous_validity_filter_rejected() {
        let call = parse(
            "aggregate_related",
            serde_json::json!({
                "start_node_ids": ["4:abc:1"],
                "relationship_types": ["LOCATED_IN"],
                "aggregation": "count",
                "validity_filter": {"current_only": true, "as_of": "2023-06-01T00:00:00Z"}
            }),
        );
        let err = precheck(&call, &test_schema(), &ToolLimits::default()).unwrap_err();
        assert!(err.message.contains("mutually exclusive"));
    }

    #[test]
    fn test_by_name_aggregation_restricted_to_count_and_list() {
        let call = parse(
            "aggregate_related_by_name",
            serde_json::json!({
                "name": "Biofilter",
                "relationship_types": ["LOCATED_IN"],
                "aggregation": "sum"
            }),
        );
        assert!(precheck(&call, &test_schema(), &ToolLimits::default()).is_err());
    }

    #[test]
    fn test_empty_relationship_types_rejected() {
        let call = parse(
            "aggregate_related",
            serde_json::json!({
                "start_node_ids": ["4:abc:1"],
                "relationship_types": [],
                "aggregation": "count"
            }),
        );
        assert!(precheck(&call, &test_schema(), &ToolLimits::default()).is_err());
    }

    #[test]
    fn test_update_key_overlap_rejected() {
        let call = parse(
            "update_node_properties",
            serde_json::json!({
                "node_id": "4:abc:1",
                "set": {"description": "new"},
                "unset": ["description"]
            }),
        );
        let err = precheck(&call, &test_schema(), &ToolLimits::default()).unwrap_err();
        assert!(err.message.contains("both set and unset"));
    }

    #[test]
    fn test_update_injection_shaped_key_rejected() {
        let call = parse(
            "update_node_properties",
            serde_json::json!({
                "node_id": "4:abc:1",
                "set": {"x` = 1 REMOVE n.`y": "boom"}
            }),
        );
        assert!(precheck(&call, &test_schema(), &ToolLimits::default()).is_err());
    }

    #[test]
    fn test_limit_clamped() {
        let limits = ToolLimits::default();
        assert_eq!(limits.clamp(None), 1000);
        assert_eq!(limits.clamp(Some(50)), 50);
        assert_eq!(limits.clamp(Some(1_000_000)), 1000);
        assert_eq!(limits.clamp(Some(0)), 1);
        assert_eq!(limits.clamp(Some(-5)), 1);
    }

    #[test]
    fn test_aggregation_kinds_closed_set() {
        // Unknown aggregation names fail at parse time, before validation.
        let err = ToolCall::parse(
            "aggregate_related",
            serde_json::json!({
                "start_node_ids": ["4:abc:1"],
                "relationship_types": ["LOCATED_IN"],
                "aggregation": "median"
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::ToolErrorKind::ModelProtocol);
    }
}
