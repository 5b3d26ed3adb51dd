//! Row-to-record conversion helpers.
//!
//! All node-returning templates project the same three columns:
//! `node_id` (elementId), `labels`, and `props` (the full property map).

use assetgraph_core::NodeRecord;
use neo4rs::Row;

use crate::client::GraphError;

/// Build a [`NodeRecord`] from a row carrying the conventional columns.
pub fn node_record_from_row(row: &Row) -> Result<NodeRecord, GraphError> {
    let node_id: String = row
        .get("node_id")
        .map_err(|e| GraphError::Serialization(format!("missing node_id column: {e}")))?;
    let labels: Vec<String> = row
        .get("labels")
        .map_err(|e| GraphError::Serialization(format!("missing labels column: {e}")))?;
    let attributes: serde_json::Value = row
        .get("props")
        .map_err(|e| GraphError::Serialization(format!("failed to decode properties: {e}")))?;
    Ok(NodeRecord {
        node_id,
        labels,
        attributes,
    })
}

/// Build a [`NodeRecord`] from an already-decoded JSON object with
/// `node_id`/`labels`/`props` keys (used when nodes arrive inside a
/// collected list rather than as row columns).
pub fn node_record_from_value(value: &serde_json::Value) -> Result<NodeRecord, GraphError> {
    let node_id = value
        .get("node_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GraphError::Serialization("collected node missing node_id".to_string()))?
        .to_string();
    let labels = value
        .get("labels")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|l| l.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    let attributes = value
        .get("props")
        .cloned()
        .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));
    Ok(NodeRecord {
        node_id,
        labels,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_record_from_value() {
        let value = serde_json::json!({
            "node_id": "4:abc:42",
            "labels": ["Asset"],
            "props": {"name": "Pump_001", "power_kw": 2.5}
        });
        let record = node_record_from_value(&value).unwrap();
        assert_eq!(record.node_id, "4:abc:42");
        assert_eq!(record.primary_label(), "Asset");
        assert_eq!(record.name(), Some("Pump_001"));
    }

    #[test]
    fn test_node_record_from_value_missing_id() {
        let value = serde_json::json!({"labels": ["Asset"], "props": {}});
        assert!(node_record_from_value(&value).is_err());
    }
}
