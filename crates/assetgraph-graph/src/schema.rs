//! Graph schema introspection.
//!
//! The label and relationship-type lists feed the tool layer's allow-list
//! cache; unknown values are rejected there before any query is built.

use neo4rs::query;

use crate::client::{GraphClient, GraphError};

/// The structural schema of the graph.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct GraphSchema {
    pub labels: Vec<String>,
    pub relationship_types: Vec<String>,
    pub property_keys: Vec<String>,
}

impl GraphSchema {
    /// One-line human summary for tool output.
    pub fn summary(&self) -> String {
        let keys_shown: Vec<&str> = self
            .property_keys
            .iter()
            .take(20)
            .map(String::as_str)
            .collect();
        let ellipsis = if self.property_keys.len() > 20 { "..." } else { "" };
        format!(
            "Labels ({}): {}. Relationship types ({}): {}. Property keys ({}): {}{}",
            self.labels.len(),
            self.labels.join(", "),
            self.relationship_types.len(),
            self.relationship_types.join(", "),
            self.property_keys.len(),
            keys_shown.join(", "),
            ellipsis,
        )
    }
}

impl GraphClient {
    /// Fetch labels, relationship types, and property keys from the store.
    pub async fn fetch_schema(&self) -> Result<GraphSchema, GraphError> {
        let mut labels = Vec::new();
        for row in self
            .query_rows(query("CALL db.labels() YIELD label RETURN label ORDER BY label"))
            .await?
        {
            labels.push(row.get::<String>("label").unwrap_or_default());
        }

        let mut relationship_types = Vec::new();
        for row in self
            .query_rows(query(
                "CALL db.relationshipTypes() YIELD relationshipType \
                 RETURN relationshipType ORDER BY relationshipType",
            ))
            .await?
        {
            relationship_types.push(row.get::<String>("relationshipType").unwrap_or_default());
        }

        // Older servers lack db.propertyKeys; an empty list just means
        // property-name checks fall back to shape validation.
        let property_keys = match self
            .query_rows(query(
                "CALL db.propertyKeys() YIELD propertyKey \
                 RETURN propertyKey ORDER BY propertyKey",
            ))
            .await
        {
            Ok(rows) => rows
                .iter()
                .map(|row| row.get::<String>("propertyKey").unwrap_or_default())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "db.propertyKeys unavailable; continuing without");
                Vec::new()
            }
        };

        tracing::info!(
            labels = labels.len(),
            relationship_types = relationship_types.len(),
            "fetched graph schema"
        );

        Ok(GraphSchema {
            labels,
            relationship_types,
            property_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let schema = GraphSchema {
            labels: vec!["Asset".to_string(), "Location".to_string()],
            relationship_types: vec!["LOCATED_IN".to_string()],
            property_keys: vec!["name".to_string(), "fingerprint".to_string()],
        };
        let summary = schema.summary();
        assert!(summary.contains("Labels (2): Asset, Location"));
        assert!(summary.contains("Relationship types (1): LOCATED_IN"));
        assert!(!summary.ends_with("..."));
    }

    #[test]
    fn test_summary_truncates_property_keys() {
        let schema = GraphSchema {
            labels: vec![],
            relationship_types: vec![],
            property_keys: (0..25).map(|i| format!("key_{i}")).collect(),
        };
        assert!(schema.summary().ends_with("..."));
    }
}
