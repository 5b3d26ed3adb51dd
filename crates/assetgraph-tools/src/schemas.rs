//! JSON Schemas for every tool, declared by hand so a caller (human,
//! script, or reasoning model) can construct valid input without reading
//! engine internals.

use serde::Serialize;
use serde_json::json;

/// A tool's callable description.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    /// Mutating tools are reachable through `invoke` but are not offered
    /// to the reasoning model.
    #[serde(skip)]
    pub mutating: bool,
}

fn validity_filter_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "description": "Temporal filter on relationship validity. Either current_only or as_of, not both; omit for no temporal filtering.",
        "properties": {
            "current_only": {"type": "boolean", "description": "Only relationships whose validity window is still open."},
            "as_of": {"type": "string", "description": "RFC 3339 instant; only relationships live at that instant."}
        }
    })
}

/// All registered tools, in registry dispatch order.
pub fn all_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "find_node".to_string(),
            description: "Find nodes by their name attribute (case-insensitive). Use match_mode='prefix' for partial names like 'Biofilter' to match 'Biofilter 1', 'Biofilter 11', ... Returns all matches with node_id for use in aggregate_related. For existence/count questions prefer count_nodes_by_name.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Name to look up."},
                    "label": {"type": "string", "description": "Restrict the lookup to this label; default tries Location, System, Asset, Category in order."},
                    "match_mode": {"type": "string", "enum": ["exact", "prefix"], "description": "exact = full name match (default); prefix = names starting with the given string."},
                    "parent_location_name": {"type": "string", "description": "Only nodes transitively contained under this parent (e.g. 'Hall 1' or 'RAS')."},
                    "include_attributes": {"type": "array", "items": {"type": "string"}, "description": "Restrict returned attributes to these keys; omit for all."}
                },
                "required": ["name"]
            }),
            mutating: false,
        },
        ToolSchema {
            name: "count_nodes_by_name".to_string(),
            description: "Count nodes with the given name (exact, case-insensitive). Use for existence questions like 'Do we have any Acidity?'. Returns total and per-label breakdown.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "label": {"type": "string", "description": "Restrict to this label; default counts across the lookup order."}
                },
                "required": ["name"]
            }),
            mutating: false,
        },
        ToolSchema {
            name: "count_by_label".to_string(),
            description: "Count all nodes with the given label. Use for global counts like 'How many Assets in total?'.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "label": {"type": "string"}
                },
                "required": ["label"]
            }),
            mutating: false,
        },
        ToolSchema {
            name: "aggregate_related".to_string(),
            description: "Aggregate over neighbor nodes of the given start nodes (node ids from find_node). E.g. assets in a location: relationship_types=['LOCATED_IN'], direction='incoming', target_label='Asset', aggregation='count'. For sum/avg/min/max set property_name. A neighbor reachable via several qualifying edges counts once; relationships_traversed keeps the raw edge count.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "start_node_ids": {"type": "array", "items": {"type": "string"}},
                    "relationship_types": {"type": "array", "items": {"type": "string"}},
                    "direction": {"type": "string", "enum": ["incoming", "outgoing", "both"], "description": "Default incoming: neighbors pointing at the start node."},
                    "aggregation": {"type": "string", "enum": ["count", "list", "sum", "avg", "min", "max"]},
                    "target_label": {"type": "string", "description": "Only neighbors carrying this label."},
                    "property_name": {"type": "string", "description": "Numeric property for sum/avg/min/max."},
                    "validity_filter": validity_filter_schema(),
                    "limit": {"type": "integer", "description": "Cap for list results; clamped server-side."},
                    "include_attributes": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["start_node_ids", "relationship_types", "aggregation"]
            }),
            mutating: false,
        },
        ToolSchema {
            name: "aggregate_related_by_name".to_string(),
            description: "Find ALL nodes matching a name, then count or list their related nodes in one call, with per-node breakdown and a deduplicated total. Use for 'How many assets in Biofilter 11?' (exact) or 'How many items in Biofilter?' (prefix matches Biofilter 1, Biofilter 2, ...). parent_location_name restricts to containers under that parent.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "label": {"type": "string", "description": "Restrict the name lookup to this label."},
                    "name_match": {"type": "string", "enum": ["exact", "prefix"]},
                    "parent_location_name": {"type": "string"},
                    "relationship_types": {"type": "array", "items": {"type": "string"}},
                    "direction": {"type": "string", "enum": ["incoming", "outgoing", "both"]},
                    "aggregation": {"type": "string", "enum": ["count", "list"]},
                    "target_label": {"type": "string"},
                    "validity_filter": validity_filter_schema(),
                    "limit": {"type": "integer"}
                },
                "required": ["name", "relationship_types", "aggregation"]
            }),
            mutating: false,
        },
        ToolSchema {
            name: "describe_node_connections".to_string(),
            description: "For a node found by name, list all incoming and outgoing relationships with the other node's name and label. Use for 'How is Feeding System connected?' or 'What links to Aardal?'.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "include_attributes": {"type": "boolean", "description": "Also return the node's own attributes."}
                },
                "required": ["name"]
            }),
            mutating: false,
        },
        ToolSchema {
            name: "get_schema".to_string(),
            description: "Introspect the graph structure: node labels, relationship types, and property keys. Use when you need to understand the schema to answer a question.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
            mutating: false,
        },
        ToolSchema {
            name: "update_node_properties".to_string(),
            description: "Set and/or unset named properties on one node by id. The only write operation; everything else is read-only.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "node_id": {"type": "string"},
                    "set": {"type": "object", "description": "Property name to new value."},
                    "unset": {"type": "array", "items": {"type": "string"}, "description": "Property names to remove."}
                },
                "required": ["node_id"]
            }),
            mutating: true,
        },
    ]
}
