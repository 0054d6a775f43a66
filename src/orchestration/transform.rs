//! # Mapping Transform
//!
//! The seam where business-specific schema evolution happens. The pipeline
//! treats the transform as opaque: given a source index's mappings, settings,
//! and stats it must return a create-ready body for the target index.
//!
//! [`SingleTypeTransform`] is the shipped implementation: it merges the
//! legacy multi-subtype mappings into one document type, sizes the primary
//! shard count from the source's store size, carries routing allocation over,
//! and raises the field limit when the merged field count gets close to the
//! engine default.

use serde_json::{json, Map, Value};

use crate::cluster::IndexStats;
use crate::constants::{DEFAULT_FIELD_LIMIT, FIELD_LIMIT_HEADROOM, SINGLE_TYPE_NAME};
use crate::error::{PipelineError, Result};

/// Everything a transform may consult about the source index
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    /// Target index name (for error reporting)
    pub index: &'a str,
    /// Source `mappings` object
    pub mapping: &'a Value,
    /// Source `settings` object
    pub settings: &'a Value,
    /// Source store/doc statistics (totals across all shard copies)
    pub stats: IndexStats,
    /// Configured target size for one primary shard
    pub shard_target_bytes: u64,
}

/// Create-ready description of the target index
#[derive(Debug, Clone)]
pub struct TargetIndexSpec {
    pub mappings: Value,
    pub settings: Value,
    /// Whether reindexed documents need their type metadata normalized
    pub normalize_doc_type: bool,
}

impl TargetIndexSpec {
    /// Body for the index-creation call
    pub fn body(&self) -> Value {
        json!({
            "mappings": self.mappings,
            "settings": self.settings,
        })
    }
}

/// Pure schema transform: no I/O, deterministic for a given context
pub trait MappingTransform: Send + Sync {
    fn transform(&self, ctx: &TransformContext<'_>) -> Result<TargetIndexSpec>;
}

/// Approximate primary-only store size from the all-copies total
pub fn primary_store_bytes(total_store_bytes: u64, replicas: u64) -> u64 {
    total_store_bytes / (replicas + 1)
}

/// Primary shard count for a given size: `ceil(size / target)`, minimum 1
pub fn shard_count(primary_bytes: u64, shard_target_bytes: u64) -> u64 {
    primary_bytes.div_ceil(shard_target_bytes).max(1)
}

/// Read the replica count out of a source `settings` object.
///
/// The engine reports settings values as strings; missing means the engine
/// default of one replica.
pub fn replica_count(settings: &Value) -> u64 {
    let value = &settings["index"]["number_of_replicas"];
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value.as_u64())
        .unwrap_or(1)
}

/// Script normalizing document-type metadata during reindex
pub fn single_type_script() -> String {
    format!("ctx._type = '{SINGLE_TYPE_NAME}'")
}

/// Default transform: merge all mapping subtypes into a single doc type
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleTypeTransform;

impl MappingTransform for SingleTypeTransform {
    fn transform(&self, ctx: &TransformContext<'_>) -> Result<TargetIndexSpec> {
        let merged = merge_subtypes(ctx)?;
        let field_count = count_fields(&merged);

        let shards = shard_count(
            primary_store_bytes(ctx.stats.store_size_bytes, replica_count(ctx.settings)),
            ctx.shard_target_bytes,
        );

        let mut index_settings = Map::new();
        index_settings.insert("number_of_shards".to_string(), json!(shards));
        index_settings.insert(
            "number_of_replicas".to_string(),
            json!(replica_count(ctx.settings)),
        );

        // Keep the source's shard allocation constraints on the target
        if let Some(routing) = ctx.settings["index"].get("routing") {
            index_settings.insert("routing".to_string(), routing.clone());
        }

        if field_count + FIELD_LIMIT_HEADROOM > DEFAULT_FIELD_LIMIT {
            index_settings.insert(
                "mapping.total_fields.limit".to_string(),
                json!(field_count + FIELD_LIMIT_HEADROOM),
            );
        }

        Ok(TargetIndexSpec {
            mappings: json!({ SINGLE_TYPE_NAME: { "properties": merged } }),
            settings: json!({ "index": Value::Object(index_settings) }),
            normalize_doc_type: true,
        })
    }
}

/// Merge the property maps of every mapping subtype into one
fn merge_subtypes(ctx: &TransformContext<'_>) -> Result<Value> {
    let types = ctx.mapping.as_object().ok_or_else(|| {
        PipelineError::transform(ctx.index, "source mappings are not an object")
    })?;

    // Typeless mapping: already a bare { properties: ... } object
    if let Some(properties) = types.get("properties") {
        return Ok(properties.clone());
    }

    let mut merged = Value::Object(Map::new());
    for (type_name, type_mapping) in types {
        if type_name == "_default_" {
            continue;
        }
        if let Some(properties) = type_mapping.get("properties") {
            merge_properties(&mut merged, properties);
        }
    }

    if merged.as_object().is_some_and(Map::is_empty) {
        return Err(PipelineError::transform(
            ctx.index,
            "source mappings contain no properties",
        ));
    }
    Ok(merged)
}

fn merge_properties(merged: &mut Value, incoming: &Value) {
    let Some(incoming) = incoming.as_object() else {
        return;
    };
    let Some(merged) = merged.as_object_mut() else {
        return;
    };

    for (field, definition) in incoming {
        match merged.get_mut(field) {
            None => {
                merged.insert(field.clone(), definition.clone());
            }
            Some(existing) => merge_field(existing, definition),
        }
    }
}

/// Merge two definitions of the same field across subtypes
fn merge_field(existing: &mut Value, incoming: &Value) {
    // Object fields merge recursively
    if existing.get("properties").is_some() || incoming.get("properties").is_some() {
        if let Some(incoming_props) = incoming.get("properties") {
            if existing.get("properties").is_none() {
                existing["properties"] = Value::Object(Map::new());
            }
            let mut props = existing["properties"].take();
            merge_properties(&mut props, incoming_props);
            existing["properties"] = props;
        }
        return;
    }

    let existing_type = existing["type"].as_str().unwrap_or_default().to_string();
    let incoming_type = incoming["type"].as_str().unwrap_or_default();
    if existing_type == incoming_type {
        return;
    }

    // Conflicting scalar types are coerced to the widest safe type
    existing["type"] = Value::String(coerce_type(&existing_type, incoming_type));
}

const TEXT_TYPES: &[&str] = &["string", "text", "keyword"];
const NUMERIC_TYPES: &[&str] = &[
    "long",
    "integer",
    "short",
    "byte",
    "double",
    "float",
    "half_float",
    "scaled_float",
];

/// Widest safe type for two conflicting field types: mixed numerics widen to
/// `double`, anything involving a text-like type collapses to `keyword`
fn coerce_type(a: &str, b: &str) -> String {
    if NUMERIC_TYPES.contains(&a) && NUMERIC_TYPES.contains(&b) {
        "double".to_string()
    } else if TEXT_TYPES.contains(&a) || TEXT_TYPES.contains(&b) {
        "keyword".to_string()
    } else {
        // Disjoint non-scalar types (date vs ip, ...) degrade to keyword too
        "keyword".to_string()
    }
}

/// Count leaf fields in a merged properties object
fn count_fields(properties: &Value) -> u64 {
    let Some(map) = properties.as_object() else {
        return 0;
    };
    map.values()
        .map(|definition| match definition.get("properties") {
            Some(nested) => 1 + count_fields(nested),
            None => 1,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn context<'a>(
        mapping: &'a Value,
        settings: &'a Value,
        stats: IndexStats,
    ) -> TransformContext<'a> {
        TransformContext {
            index: "logstash-2019.08.01",
            mapping,
            settings,
            stats,
            shard_target_bytes: 50 * GIB,
        }
    }

    #[test]
    fn test_shard_count_ceiling() {
        // 130 GiB at a 50 GiB target needs 3 shards
        assert_eq!(shard_count(130 * GIB, 50 * GIB), 3);
        assert_eq!(shard_count(50 * GIB, 50 * GIB), 1);
        assert_eq!(shard_count(51 * GIB, 50 * GIB), 2);
    }

    #[test]
    fn test_shard_count_minimum_one() {
        assert_eq!(shard_count(0, 50 * GIB), 1);
        assert_eq!(shard_count(1, 50 * GIB), 1);
    }

    #[test]
    fn test_primary_store_approximation() {
        // One replica doubles the total store; primaries are half
        assert_eq!(primary_store_bytes(260 * GIB, 1), 130 * GIB);
        assert_eq!(primary_store_bytes(130 * GIB, 0), 130 * GIB);
    }

    #[test]
    fn test_replica_count_parses_string_settings() {
        let settings = json!({ "index": { "number_of_replicas": "2" } });
        assert_eq!(replica_count(&settings), 2);
        assert_eq!(replica_count(&json!({})), 1);
    }

    #[test]
    fn test_subtype_merge_with_type_coercion() {
        // Two legacy subtypes disagree on field types: `code` is long in one
        // and string-like in the other, `ratio` is long vs double
        let mapping = json!({
            "apache": {
                "properties": {
                    "code": { "type": "long" },
                    "ratio": { "type": "long" },
                    "host": { "type": "keyword" },
                }
            },
            "nginx": {
                "properties": {
                    "code": { "type": "text" },
                    "ratio": { "type": "double" },
                    "path": { "type": "keyword" },
                }
            }
        });
        let settings = json!({ "index": { "number_of_replicas": "1" } });
        let stats = IndexStats {
            store_size_bytes: 260 * GIB,
            doc_count: 1000,
        };

        let spec = SingleTypeTransform
            .transform(&context(&mapping, &settings, stats))
            .expect("transform");

        let properties = &spec.mappings[SINGLE_TYPE_NAME]["properties"];
        assert_eq!(properties["code"]["type"], "keyword");
        assert_eq!(properties["ratio"]["type"], "double");
        assert_eq!(properties["host"]["type"], "keyword");
        assert_eq!(properties["path"]["type"], "keyword");

        // 260 GiB total, 1 replica -> 130 GiB primary -> 3 shards at 50 GiB
        assert_eq!(spec.settings["index"]["number_of_shards"], 3);
        assert!(spec.normalize_doc_type);
    }

    #[test]
    fn test_nested_object_fields_merge_recursively() {
        let mapping = json!({
            "a": { "properties": { "geo": { "properties": { "lat": { "type": "float" } } } } },
            "b": { "properties": { "geo": { "properties": { "lon": { "type": "float" } } } } }
        });
        let settings = json!({});
        let stats = IndexStats { store_size_bytes: GIB, doc_count: 1 };

        let spec = SingleTypeTransform
            .transform(&context(&mapping, &settings, stats))
            .expect("transform");

        let geo = &spec.mappings[SINGLE_TYPE_NAME]["properties"]["geo"]["properties"];
        assert!(geo.get("lat").is_some());
        assert!(geo.get("lon").is_some());
    }

    #[test]
    fn test_routing_allocation_carried_over() {
        let mapping = json!({ "doc": { "properties": { "f": { "type": "keyword" } } } });
        let settings = json!({
            "index": {
                "number_of_replicas": "0",
                "routing": { "allocation": { "require": { "box_type": "warm" } } }
            }
        });
        let stats = IndexStats { store_size_bytes: GIB, doc_count: 1 };

        let spec = SingleTypeTransform
            .transform(&context(&mapping, &settings, stats))
            .expect("transform");

        assert_eq!(
            spec.settings["index"]["routing"]["allocation"]["require"]["box_type"],
            "warm"
        );
        assert_eq!(spec.settings["index"]["number_of_replicas"], 0);
    }

    #[test]
    fn test_field_limit_raised_near_default() {
        let mut properties = Map::new();
        for i in 0..950 {
            properties.insert(format!("field_{i}"), json!({ "type": "keyword" }));
        }
        let mapping = json!({ "doc": { "properties": Value::Object(properties) } });
        let settings = json!({});
        let stats = IndexStats { store_size_bytes: GIB, doc_count: 1 };

        let spec = SingleTypeTransform
            .transform(&context(&mapping, &settings, stats))
            .expect("transform");

        assert_eq!(
            spec.settings["index"]["mapping.total_fields.limit"],
            950 + FIELD_LIMIT_HEADROOM
        );
    }

    #[test]
    fn test_empty_mapping_rejected() {
        let mapping = json!({});
        let settings = json!({});
        let stats = IndexStats { store_size_bytes: GIB, doc_count: 0 };

        let err = SingleTypeTransform
            .transform(&context(&mapping, &settings, stats))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transform { .. }));
    }

    #[test]
    fn test_typeless_mapping_passes_through() {
        let mapping = json!({ "properties": { "f": { "type": "keyword" } } });
        let settings = json!({});
        let stats = IndexStats { store_size_bytes: GIB, doc_count: 1 };

        let spec = SingleTypeTransform
            .transform(&context(&mapping, &settings, stats))
            .expect("transform");
        assert_eq!(
            spec.mappings[SINGLE_TYPE_NAME]["properties"]["f"]["type"],
            "keyword"
        );
    }
}
