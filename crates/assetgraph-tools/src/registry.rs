//! The tool registry: a closed set of tagged tool calls dispatched through
//! an exhaustive match, so adding a tool is a compile-time-checked change
//! rather than a string-keyed registration.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use assetgraph_core::{
    AggregationKind, AggregationRequest, Direction, MatchMode, NodeRecord, ValidityFilter,
};
use assetgraph_graph::{GraphClient, PropertyUpdate, ResolveSpec};

use crate::error::ToolError;
use crate::schemas::{all_schemas, ToolSchema};
use crate::validate::{precheck, SchemaCache, ToolLimits};

// ── Tool inputs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FindNodeInput {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub parent_location_name: Option<String>,
    #[serde(default)]
    pub include_attributes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CountNodesByNameInput {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CountByLabelInput {
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct AggregateRelatedInput {
    pub start_node_ids: Vec<String>,
    pub relationship_types: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
    pub aggregation: AggregationKind,
    #[serde(default)]
    pub target_label: Option<String>,
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub validity_filter: Option<ValidityFilter>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub include_attributes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AggregateRelatedByNameInput {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub name_match: MatchMode,
    #[serde(default)]
    pub parent_location_name: Option<String>,
    pub relationship_types: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
    pub aggregation: AggregationKind,
    #[serde(default)]
    pub target_label: Option<String>,
    #[serde(default)]
    pub validity_filter: Option<ValidityFilter>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DescribeNodeConnectionsInput {
    pub name: String,
    #[serde(default)]
    pub include_attributes: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNodePropertiesInput {
    pub node_id: String,
    #[serde(flatten)]
    pub update: PropertyUpdate,
}

// ── The closed call set ──────────────────────────────────────────

/// One parsed tool invocation. Every tool the registry knows is a variant
/// here; dispatch is an exhaustive match.
#[derive(Debug)]
pub enum ToolCall {
    FindNode(FindNodeInput),
    CountNodesByName(CountNodesByNameInput),
    CountByLabel(CountByLabelInput),
    AggregateRelated(AggregateRelatedInput),
    AggregateRelatedByName(AggregateRelatedByNameInput),
    DescribeNodeConnections(DescribeNodeConnectionsInput),
    GetSchema,
    UpdateNodeProperties(UpdateNodePropertiesInput),
}

impl ToolCall {
    /// Parse a named invocation. Unknown names and malformed arguments are
    /// model-protocol errors: reported per call, never a crash.
    pub fn parse(name: &str, input: Value) -> Result<Self, ToolError> {
        fn args<T: serde::de::DeserializeOwned>(tool: &str, input: Value) -> Result<T, ToolError> {
            serde_json::from_value(input)
                .map_err(|e| ToolError::model_protocol(format!("invalid arguments for {tool}: {e}")))
        }
        match name {
            "find_node" => Ok(Self::FindNode(args(name, input)?)),
            "count_nodes_by_name" => Ok(Self::CountNodesByName(args(name, input)?)),
            "count_by_label" => Ok(Self::CountByLabel(args(name, input)?)),
            "aggregate_related" => Ok(Self::AggregateRelated(args(name, input)?)),
            "aggregate_related_by_name" => Ok(Self::AggregateRelatedByName(args(name, input)?)),
            "describe_node_connections" => Ok(Self::DescribeNodeConnections(args(name, input)?)),
            "get_schema" => Ok(Self::GetSchema),
            "update_node_properties" => Ok(Self::UpdateNodeProperties(args(name, input)?)),
            other => Err(ToolError::model_protocol(format!("unknown tool '{other}'"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FindNode(_) => "find_node",
            Self::CountNodesByName(_) => "count_nodes_by_name",
            Self::CountByLabel(_) => "count_by_label",
            Self::AggregateRelated(_) => "aggregate_related",
            Self::AggregateRelatedByName(_) => "aggregate_related_by_name",
            Self::DescribeNodeConnections(_) => "describe_node_connections",
            Self::GetSchema => "get_schema",
            Self::UpdateNodeProperties(_) => "update_node_properties",
        }
    }
}

// ── Registry ─────────────────────────────────────────────────────

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub limits: ToolLimits,
    /// Label order tried when a name lookup has no label, most specific
    /// first (so "01_WMS" matches the System node before Category).
    pub lookup_order: Vec<String>,
    /// Relationship types that form the structural containment hierarchy.
    pub containment_types: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            limits: ToolLimits::default(),
            lookup_order: ["Location", "System", "Asset", "Category"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            containment_types: vec!["LOCATED_IN".to_string()],
        }
    }
}

/// Uniform access point for tool execution. All validation happens inside
/// [`Registry::invoke`]; no tool is reachable around it.
pub struct Registry {
    client: GraphClient,
    config: RegistryConfig,
    schema: OnceCell<SchemaCache>,
}

impl Registry {
    pub fn new(client: GraphClient, config: RegistryConfig) -> Self {
        Self {
            client,
            config,
            schema: OnceCell::new(),
        }
    }

    /// Seed the allow-list cache instead of fetching it on first use.
    pub fn with_schema(client: GraphClient, config: RegistryConfig, schema: SchemaCache) -> Self {
        let cell = OnceCell::new();
        // A fresh cell accepts exactly one value.
        let _ = cell.set(schema);
        Self {
            client,
            config,
            schema: cell,
        }
    }

    async fn schema_cache(&self) -> Result<&SchemaCache, ToolError> {
        self.schema
            .get_or_try_init(|| async {
                let schema = self.client.fetch_schema().await?;
                Ok::<_, ToolError>(SchemaCache::new(schema))
            })
            .await
    }

    /// Execute one named tool call: parse, validate, dispatch.
    pub async fn invoke(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        let call = ToolCall::parse(name, input)?;
        let schema = self.schema_cache().await?;
        precheck(&call, schema, &self.config.limits)?;
        tracing::debug!(tool = call.name(), "dispatching tool call");

        match call {
            ToolCall::FindNode(input) => self.find_node(input).await,
            ToolCall::CountNodesByName(input) => self.count_nodes_by_name(input).await,
            ToolCall::CountByLabel(input) => self.count_by_label(input).await,
            ToolCall::AggregateRelated(input) => self.aggregate_related(input).await,
            ToolCall::AggregateRelatedByName(input) => self.aggregate_related_by_name(input).await,
            ToolCall::DescribeNodeConnections(input) => self.describe_node_connections(input).await,
            ToolCall::GetSchema => self.get_schema().await,
            ToolCall::UpdateNodeProperties(input) => self.update_node_properties(input).await,
        }
    }

    // ── Handlers ─────────────────────────────────────────────────

    /// Resolve start nodes by name across the configured lookup order,
    /// deduplicating by node id (a node carrying two looked-up labels must
    /// not appear twice).
    async fn resolve_starts(
        &self,
        name: &str,
        label: Option<&str>,
        match_mode: MatchMode,
        parent_location_name: Option<&str>,
    ) -> Result<Vec<NodeRecord>, ToolError> {
        let labels: Vec<String> = match label {
            Some(l) => vec![l.to_string()],
            None => self.config.lookup_order.clone(),
        };

        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for label in &labels {
            let spec = ResolveSpec {
                label,
                name,
                match_mode,
            };
            for node in self.client.resolve_nodes(&spec).await? {
                if seen.insert(node.node_id.clone()) {
                    nodes.push(node);
                }
            }
        }

        if let Some(parent) = parent_location_name {
            nodes = self
                .client
                .filter_by_ancestor(
                    nodes,
                    parent,
                    &self.config.containment_types,
                    self.config.limits.max_parent_depth,
                )
                .await?;
        }
        Ok(nodes)
    }

    async fn find_node(&self, input: FindNodeInput) -> Result<Value, ToolError> {
        let mut nodes = self
            .resolve_starts(
                &input.name,
                input.label.as_deref(),
                input.match_mode,
                input.parent_location_name.as_deref(),
            )
            .await?;
        if let Some(keys) = &input.include_attributes {
            for node in &mut nodes {
                node.project_attributes(keys);
            }
        }
        Ok(json!({
            "found": !nodes.is_empty(),
            "total_count": nodes.len(),
            "nodes": nodes,
        }))
    }

    async fn count_nodes_by_name(&self, input: CountNodesByNameInput) -> Result<Value, ToolError> {
        let labels: Vec<String> = match &input.label {
            Some(l) => vec![l.clone()],
            None => self.config.lookup_order.clone(),
        };
        let mut by_label = serde_json::Map::new();
        let mut total = 0i64;
        for label in &labels {
            let count = self.client.count_by_name(label, &input.name).await?;
            by_label.insert(label.clone(), json!(count));
            total += count;
        }
        Ok(json!({
            "name": input.name,
            "total_count": total,
            "by_label": by_label,
            "found": total > 0,
        }))
    }

    async fn count_by_label(&self, input: CountByLabelInput) -> Result<Value, ToolError> {
        let total = self.client.count_label(&input.label).await?;
        Ok(json!({"label": input.label, "total_count": total}))
    }

    async fn aggregate_related(&self, input: AggregateRelatedInput) -> Result<Value, ToolError> {
        let request = AggregationRequest {
            start_node_ids: input.start_node_ids,
            relationship_types: input.relationship_types,
            direction: input.direction,
            aggregation: input.aggregation,
            target_label: input.target_label,
            property_name: input.property_name,
            validity_filter: input.validity_filter,
            limit: Some(self.config.limits.clamp(input.limit)),
            include_attributes: input.include_attributes,
        };
        let result = self.client.aggregate(&request).await?;
        serde_json::to_value(result).map_err(|e| ToolError::internal(e.to_string()))
    }

    async fn aggregate_related_by_name(
        &self,
        input: AggregateRelatedByNameInput,
    ) -> Result<Value, ToolError> {
        let starts = self
            .resolve_starts(
                &input.name,
                input.label.as_deref(),
                input.name_match,
                input.parent_location_name.as_deref(),
            )
            .await?;
        if starts.is_empty() {
            return Ok(json!({
                "name": input.name,
                "found": false,
                "nodes_count": 0,
                "per_node": [],
                "total": {"value": 0, "relationships_traversed": 0, "targets_matched": 0},
            }));
        }

        let limit = self.config.limits.clamp(input.limit);
        let base = AggregationRequest {
            start_node_ids: Vec::new(),
            relationship_types: input.relationship_types,
            direction: input.direction,
            aggregation: input.aggregation,
            target_label: input.target_label,
            property_name: None,
            validity_filter: input.validity_filter,
            limit: Some(limit),
            include_attributes: None,
        };

        let mut per_node = Vec::with_capacity(starts.len());
        for node in &starts {
            let result = self
                .client
                .aggregate(&AggregationRequest {
                    start_node_ids: vec![node.node_id.clone()],
                    ..base.clone()
                })
                .await?;
            per_node.push(json!({
                "node_id": node.node_id,
                "label": node.primary_label(),
                "name": node.name(),
                "fingerprint": node.fingerprint(),
                "result": result.value,
                "relationships_traversed": result.relationships_traversed,
                "targets_matched": result.targets_matched,
            }));
        }

        // Merged totals across all start nodes; a target reachable from
        // two different starts counts once here, so the total can be less
        // than the per-node sum.
        let merged = self
            .client
            .aggregate(&AggregationRequest {
                start_node_ids: starts.iter().map(|n| n.node_id.clone()).collect(),
                ..base
            })
            .await?;

        Ok(json!({
            "name": input.name,
            "found": true,
            "nodes_count": starts.len(),
            "per_node": per_node,
            "total": merged,
        }))
    }

    async fn describe_node_connections(
        &self,
        input: DescribeNodeConnectionsInput,
    ) -> Result<Value, ToolError> {
        let nodes = self
            .resolve_starts(&input.name, None, MatchMode::Exact, None)
            .await?;
        let Some(node) = nodes.first() else {
            return Ok(json!({
                "found": false,
                "name": input.name,
                "incoming": [],
                "outgoing": [],
                "message": format!(
                    "No node found with this name (searched {}).",
                    self.config.lookup_order.join(", ")
                ),
            }));
        };

        let incoming = self
            .client
            .list_connections(&node.node_id, Direction::Incoming)
            .await?;
        let outgoing = self
            .client
            .list_connections(&node.node_id, Direction::Outgoing)
            .await?;

        let mut out = json!({
            "found": true,
            "name": input.name,
            "node_id": node.node_id,
            "label": node.primary_label(),
            "incoming_count": incoming.len(),
            "outgoing_count": outgoing.len(),
            "incoming": incoming,
            "outgoing": outgoing,
        });
        if input.include_attributes {
            out["attributes"] = node.attributes.clone();
        }
        Ok(out)
    }

    async fn get_schema(&self) -> Result<Value, ToolError> {
        let cache = self.schema_cache().await?;
        let schema = cache.schema();
        Ok(json!({
            "labels": schema.labels,
            "relationship_types": schema.relationship_types,
            "property_keys": schema.property_keys,
            "summary": schema.summary(),
        }))
    }

    async fn update_node_properties(
        &self,
        input: UpdateNodePropertiesInput,
    ) -> Result<Value, ToolError> {
        let updated = self
            .client
            .update_node_properties(&input.node_id, &input.update)
            .await?;
        Ok(json!({"updated_node": updated}))
    }
}

// ── Loop-facing seam ─────────────────────────────────────────────

/// What the orchestration loop needs from a tool provider. The registry is
/// the production implementation; tests use scripted doubles.
#[allow(async_fn_in_trait)]
pub trait ToolDispatch {
    /// Schemas offered to the reasoning model (mutating tools excluded).
    fn tool_schemas(&self) -> Vec<ToolSchema>;

    /// Execute one named call.
    async fn dispatch(&self, name: &str, input: Value) -> Result<Value, ToolError>;
}

impl ToolDispatch for Registry {
    fn tool_schemas(&self) -> Vec<ToolSchema> {
        all_schemas().into_iter().filter(|s| !s.mutating).collect()
    }

    async fn dispatch(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        self.invoke(name, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolErrorKind;

    #[test]
    fn test_parse_known_tools() {
        let call = ToolCall::parse(
            "find_node",
            json!({"name": "Biofilter 11", "match_mode": "prefix"}),
        )
        .unwrap();
        assert_eq!(call.name(), "find_node");
        let ToolCall::FindNode(input) = call else {
            panic!("wrong variant");
        };
        assert_eq!(input.match_mode, MatchMode::Prefix);
        assert!(input.label.is_none());
    }

    #[test]
    fn test_parse_unknown_tool_is_model_protocol_error() {
        let err = ToolCall::parse("run_cypher", json!({})).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::ModelProtocol);
        assert!(err.message.contains("run_cypher"));
    }

    #[test]
    fn test_parse_malformed_arguments() {
        // relationship_types as a string instead of an array.
        let err = ToolCall::parse(
            "aggregate_related",
            json!({
                "start_node_ids": ["4:abc:1"],
                "relationship_types": "LOCATED_IN",
                "aggregation": "count"
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::ModelProtocol);
    }

    #[test]
    fn test_parse_validity_filter_as_of() {
        let call = ToolCall::parse(
            "aggregate_related",
            json!({
                "start_node_ids": ["4:abc:1"],
                "relationship_types": ["LOCATED_IN"],
                "aggregation": "count",
                "validity_filter": {"as_of": "2023-06-01T00:00:00Z"}
            }),
        )
        .unwrap();
        let ToolCall::AggregateRelated(input) = call else {
            panic!("wrong variant");
        };
        assert!(input.validity_filter.unwrap().as_of.is_some());
    }

    #[test]
    fn test_parse_update_with_flattened_body() {
        let call = ToolCall::parse(
            "update_node_properties",
            json!({
                "node_id": "4:abc:1",
                "set": {"description": "rebuilt impeller"},
                "unset": ["obsolete_tag"]
            }),
        )
        .unwrap();
        let ToolCall::UpdateNodeProperties(input) = call else {
            panic!("wrong variant");
        };
        assert_eq!(input.update.set.len(), 1);
        assert_eq!(input.update.unset, vec!["obsolete_tag".to_string()]);
    }

    #[test]
    fn test_default_lookup_order() {
        let config = RegistryConfig::default();
        assert_eq!(
            config.lookup_order,
            vec!["Location", "System", "Asset", "Category"]
        );
        assert_eq!(config.containment_types, vec!["LOCATED_IN"]);
    }
}
