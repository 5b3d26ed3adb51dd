//! Node resolution: map (label, name, match mode) to canonical node ids.
//!
//! Name comparison is case-insensitive in both modes, matching the
//! ingested data where users type "biofilter 11" for "Biofilter 11".
//! An empty result is not an error; the tool layer turns it into a
//! `found: false` payload.

use assetgraph_core::{Direction, MatchMode, NodeRecord};
use neo4rs::query;

use crate::client::{GraphClient, GraphError};
use crate::rows::node_record_from_row;
use crate::traverse::neighbor_list_request;

/// A resolution request against one label.
#[derive(Debug, Clone)]
pub struct ResolveSpec<'a> {
    pub label: &'a str,
    pub name: &'a str,
    pub match_mode: MatchMode,
}

/// One relationship in a connection summary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionRecord {
    pub relationship_type: String,
    pub other_name: Option<String>,
    pub other_label: Option<String>,
    pub other_fingerprint: Option<String>,
}

const RESOLVE_EXACT: &str = "MATCH (n) WHERE $label IN labels(n) \
     AND toLower(n.name) = toLower($name) \
     RETURN elementId(n) AS node_id, labels(n) AS labels, properties(n) AS props";

const RESOLVE_PREFIX: &str = "MATCH (n) WHERE $label IN labels(n) \
     AND toLower(n.name) STARTS WITH toLower($name) \
     RETURN elementId(n) AS node_id, labels(n) AS labels, properties(n) AS props";

const COUNT_BY_NAME: &str = "MATCH (n) WHERE $label IN labels(n) \
     AND toLower(n.name) = toLower($name) \
     RETURN count(n) AS total";

const COUNT_LABEL: &str = "MATCH (n) WHERE $label IN labels(n) RETURN count(n) AS total";

const CONNECTIONS_OUT: &str = "MATCH (start) WHERE elementId(start) = $node_id \
     MATCH (start)-[r]->(other) \
     RETURN type(r) AS rel_type, other.name AS other_name, \
            labels(other)[0] AS other_label, other.fingerprint AS other_fingerprint \
     ORDER BY rel_type, other_name";

const CONNECTIONS_IN: &str = "MATCH (start) WHERE elementId(start) = $node_id \
     MATCH (other)-[r]->(start) \
     RETURN type(r) AS rel_type, other.name AS other_name, \
            labels(other)[0] AS other_label, other.fingerprint AS other_fingerprint \
     ORDER BY rel_type, other_name";

impl GraphClient {
    /// Resolve nodes by name under one label. Returns every match; callers
    /// needing a single node disambiguate themselves.
    pub async fn resolve_nodes(&self, spec: &ResolveSpec<'_>) -> Result<Vec<NodeRecord>, GraphError> {
        let template = match spec.match_mode {
            MatchMode::Exact => RESOLVE_EXACT,
            MatchMode::Prefix => RESOLVE_PREFIX,
        };
        let q = query(template)
            .param("label", spec.label.to_string())
            .param("name", spec.name.to_string());
        let rows = self.query_rows(q).await?;
        rows.iter().map(node_record_from_row).collect()
    }

    /// Count nodes with the given name under one label (exact match).
    pub async fn count_by_name(&self, label: &str, name: &str) -> Result<i64, GraphError> {
        let q = query(COUNT_BY_NAME)
            .param("label", label.to_string())
            .param("name", name.to_string());
        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("total").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Count all nodes carrying the given label.
    pub async fn count_label(&self, label: &str) -> Result<i64, GraphError> {
        let q = query(COUNT_LABEL).param("label", label.to_string());
        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("total").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// List the relationships of one node in the given direction.
    pub async fn list_connections(
        &self,
        node_id: &str,
        direction: Direction,
    ) -> Result<Vec<ConnectionRecord>, GraphError> {
        let template = match direction {
            Direction::Outgoing => CONNECTIONS_OUT,
            _ => CONNECTIONS_IN,
        };
        let q = query(template).param("node_id", node_id.to_string());
        let rows = self.query_rows(q).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(ConnectionRecord {
                relationship_type: row.get("rel_type").unwrap_or_default(),
                other_name: row.get("other_name").unwrap_or(None),
                other_label: row.get("other_label").unwrap_or(None),
                other_fingerprint: row.get("other_fingerprint").unwrap_or(None),
            });
        }
        Ok(records)
    }

    /// Keep only candidates transitively contained under a node named
    /// `parent_name`, following live outgoing containment edges.
    ///
    /// Reuses the aggregation engine for each upward hop rather than a
    /// dedicated variable-length query, so the containment check shares the
    /// engine's validity and dedup semantics.
    pub async fn filter_by_ancestor(
        &self,
        candidates: Vec<NodeRecord>,
        parent_name: &str,
        containment_types: &[String],
        max_depth: usize,
    ) -> Result<Vec<NodeRecord>, GraphError> {
        let wanted = parent_name.to_lowercase();
        let mut kept = Vec::new();
        for candidate in candidates {
            if self
                .has_ancestor_named(&candidate.node_id, &wanted, containment_types, max_depth)
                .await?
            {
                kept.push(candidate);
            }
        }
        Ok(kept)
    }

    async fn has_ancestor_named(
        &self,
        node_id: &str,
        wanted_lower: &str,
        containment_types: &[String],
        max_depth: usize,
    ) -> Result<bool, GraphError> {
        let mut frontier = vec![node_id.to_string()];
        let mut seen: std::collections::HashSet<String> = frontier.iter().cloned().collect();

        for _ in 0..max_depth {
            if frontier.is_empty() {
                return Ok(false);
            }
            let req = neighbor_list_request(
                std::mem::take(&mut frontier),
                containment_types.to_vec(),
                Direction::Outgoing,
                crate::traverse::DEFAULT_LIMIT,
            );
            let result = self.aggregate(&req).await?;
            let assetgraph_core::AggregationValue::Nodes(parents) = result.value else {
                return Ok(false);
            };
            for parent in parents {
                if parent
                    .name()
                    .is_some_and(|n| n.to_lowercase() == wanted_lower)
                {
                    return Ok(true);
                }
                if seen.insert(parent.node_id.clone()) {
                    frontier.push(parent.node_id);
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_templates_bind_name_as_parameter() {
        for template in [RESOLVE_EXACT, RESOLVE_PREFIX, COUNT_BY_NAME] {
            assert!(template.contains("$name"));
            assert!(template.contains("$label IN labels(n)"));
        }
        assert!(RESOLVE_PREFIX.contains("STARTS WITH"));
        assert!(!RESOLVE_EXACT.contains("STARTS WITH"));
    }

    #[test]
    fn test_connection_templates_directional() {
        assert!(CONNECTIONS_OUT.contains("(start)-[r]->(other)"));
        assert!(CONNECTIONS_IN.contains("(other)-[r]->(start)"));
    }
}
