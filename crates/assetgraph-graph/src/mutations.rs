//! The single write path: edit named properties on one node.
//!
//! Everything else about the graph is append-only and owned by the
//! ingestion collaborator; closing and reopening versioned edges never
//! happens here.
//!
//! Property keys cannot be bound as Cypher parameters, so they are
//! interpolated as backtick-quoted identifiers — which is why every key
//! must pass [`is_valid_property_key`] first. Values are always bound as
//! parameters.

use assetgraph_core::NodeRecord;
use neo4rs::{query, Query};

use crate::client::{GraphClient, GraphError};
use crate::rows::node_record_from_row;

/// A validated set/unset request against one node.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PropertyUpdate {
    #[serde(default)]
    pub set: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub unset: Vec<String>,
}

impl PropertyUpdate {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }
}

/// Identifier-shaped keys only: ASCII alphanumeric or underscore, not
/// starting with a digit, non-empty. Anything else is rejected before the
/// key is interpolated into query text.
pub fn is_valid_property_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn bind_value(q: Query, param: &str, value: &serde_json::Value) -> Result<Query, GraphError> {
    match value {
        serde_json::Value::String(s) => Ok(q.param(param, s.clone())),
        serde_json::Value::Bool(b) => Ok(q.param(param, *b)),
        serde_json::Value::Number(n) if n.is_i64() => {
            Ok(q.param(param, n.as_i64().unwrap_or_default()))
        }
        serde_json::Value::Number(n) => Ok(q.param(param, n.as_f64().unwrap_or_default())),
        serde_json::Value::Array(items) => {
            let strings: Option<Vec<String>> = items
                .iter()
                .map(|v| v.as_str().map(String::from))
                .collect();
            match strings {
                Some(list) => Ok(q.param(param, list)),
                None => Err(GraphError::UnsupportedValue {
                    key: param.to_string(),
                    reason: "arrays must contain only strings".to_string(),
                }),
            }
        }
        other => Err(GraphError::UnsupportedValue {
            key: param.to_string(),
            reason: format!("unsupported JSON type: {other}"),
        }),
    }
}

impl GraphClient {
    /// Apply a property update to one node and return the updated node.
    ///
    /// Keys are assumed pre-validated (non-empty, identifier-shaped, no
    /// overlap between set and unset) by the tool layer; identifier shape
    /// is checked again here since interpolation safety depends on it.
    pub async fn update_node_properties(
        &self,
        node_id: &str,
        update: &PropertyUpdate,
    ) -> Result<NodeRecord, GraphError> {
        for key in update.set.keys().chain(update.unset.iter()) {
            if !is_valid_property_key(key) {
                return Err(GraphError::UnsupportedValue {
                    key: key.clone(),
                    reason: "not an identifier-shaped property key".to_string(),
                });
            }
        }

        let mut clauses = Vec::new();
        if !update.set.is_empty() {
            let assignments: Vec<String> = update
                .set
                .keys()
                .enumerate()
                .map(|(i, key)| format!("n.`{key}` = $v{i}"))
                .collect();
            clauses.push(format!("SET {}", assignments.join(", ")));
        }
        if !update.unset.is_empty() {
            let removals: Vec<String> = update
                .unset
                .iter()
                .map(|key| format!("n.`{key}`"))
                .collect();
            clauses.push(format!("REMOVE {}", removals.join(", ")));
        }

        let cypher = format!(
            "MATCH (n) WHERE elementId(n) = $node_id\n{}\n\
             RETURN elementId(n) AS node_id, labels(n) AS labels, properties(n) AS props",
            clauses.join("\n")
        );

        let mut q = query(&cypher).param("node_id", node_id.to_string());
        for (i, value) in update.set.values().enumerate() {
            q = bind_value(q, &format!("v{i}"), value)?;
        }

        tracing::info!(
            node_id,
            set = update.set.len(),
            unset = update.unset.len(),
            "updating node properties"
        );

        match self.query_one(q).await? {
            Some(row) => node_record_from_row(&row),
            None => Err(GraphError::NodeNotFound {
                node_id: node_id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_property_keys() {
        assert!(is_valid_property_key("name"));
        assert!(is_valid_property_key("power_kw"));
        assert!(is_valid_property_key("_internal"));
        assert!(is_valid_property_key("x2"));
    }

    #[test]
    fn test_invalid_property_keys() {
        assert!(!is_valid_property_key(""));
        assert!(!is_valid_property_key("2fast"));
        assert!(!is_valid_property_key("name` = 1 REMOVE n.`x"));
        assert!(!is_valid_property_key("with space"));
        assert!(!is_valid_property_key("dash-ed"));
    }

    #[test]
    fn test_update_is_empty() {
        assert!(PropertyUpdate::default().is_empty());
        let update: PropertyUpdate = serde_json::from_value(serde_json::json!({
            "unset": ["description"]
        }))
        .unwrap();
        assert!(!update.is_empty());
    }
}
