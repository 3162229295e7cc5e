//! Deterministic JSON-Schema inference.
//!
//! `RuleInferencer` applies the same type rules the schema system prompt asks
//! the model to follow, without a model:
//! - integers become `"integer"`, decimals `"number"`
//! - booleans become `"boolean"`, strings `"string"`, null `"null"`
//! - objects become `"object"` with nested `properties` and `required`
//! - arrays with one element type use `"items": {"type": ...}`, mixed arrays
//!   use `"items": {"oneOf": [...]}`
//!
//! Unparsable input produces `{"error": "Invalid JSON: <reason>"}`.

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::provider::CompletionClient;

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Rule-based stand-in for the completion engine on the schema path
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleInferencer;

impl RuleInferencer {
    pub fn new() -> Self {
        Self
    }

    /// Infer a draft-07 schema document from raw JSON text
    pub fn infer_text(&self, document: &str) -> String {
        match serde_json::from_str::<Value>(document) {
            Ok(value) => document_schema(&value).to_string(),
            Err(e) => json!({ "error": format!("Invalid JSON: {}", e) }).to_string(),
        }
    }
}

#[async_trait]
impl CompletionClient for RuleInferencer {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_text: &str,
        _temperature: f32,
    ) -> Result<String> {
        Ok(self.infer_text(user_text))
    }

    fn model(&self) -> &str {
        "rules"
    }
}

/// Schema for a whole document, tagged with the draft-07 `$schema` keyword
pub fn document_schema(value: &Value) -> Value {
    let mut schema = schema_for(value);
    if let Value::Object(map) = &mut schema {
        let mut tagged = Map::new();
        tagged.insert("$schema".to_string(), Value::String(DRAFT_07.to_string()));
        tagged.append(map);
        return Value::Object(tagged);
    }
    schema
}

/// Schema for a single value
pub fn schema_for(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "type": "null" }),
        Value::Bool(_) => json!({ "type": "boolean" }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "type": "integer" }),
        Value::Number(_) => json!({ "type": "number" }),
        Value::String(_) => json!({ "type": "string" }),
        Value::Array(items) => json!({ "type": "array", "items": items_schema(items) }),
        Value::Object(fields) => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|(key, v)| (key.clone(), schema_for(v)))
                .collect();
            let mut required: Vec<&String> = fields.keys().collect();
            required.sort();
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
            })
        }
    }
}

fn items_schema(items: &[Value]) -> Value {
    unify(items.iter().map(schema_for).collect())
}

/// One schema covering every candidate: identical candidates collapse, object
/// candidates merge, anything else becomes `oneOf`
fn unify(candidates: Vec<Value>) -> Value {
    let mut distinct: Vec<Value> = Vec::new();
    for schema in candidates {
        if !distinct.contains(&schema) {
            distinct.push(schema);
        }
    }

    match distinct.len() {
        0 => json!({}),
        1 => distinct.remove(0),
        _ if distinct.iter().all(|s| s["type"] == "object") => merge_objects(&distinct),
        _ => json!({ "oneOf": distinct }),
    }
}

/// Merge object schemas seen across array elements: every property seen is
/// listed, and only properties present in all of them stay required.
/// A property whose schemas differ between elements is unified in turn.
fn merge_objects(schemas: &[Value]) -> Value {
    let mut seen: Map<String, Value> = Map::new();
    for schema in schemas {
        if let Some(props) = schema["properties"].as_object() {
            for (key, prop) in props {
                let entry = seen.entry(key.clone()).or_insert_with(|| json!([]));
                if let Value::Array(list) = entry {
                    list.push(prop.clone());
                }
            }
        }
    }

    let properties: Map<String, Value> = seen
        .into_iter()
        .map(|(key, candidates)| match candidates {
            Value::Array(list) => (key, unify(list)),
            other => (key, other),
        })
        .collect();

    let required: Vec<&String> = properties
        .keys()
        .filter(|key| {
            schemas
                .iter()
                .all(|s| s["properties"].get(key.as_str()).is_some())
        })
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
