use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::model::CanonicalIntentModel;

/// Fields that may change between runs without the behavior changing.
pub const VOLATILE_FIELDS: &[&str] = &[
    "extraction_version",
    "generated_at",
    "debug_info",
    "llm_metadata",
];

/// SHA-256 hex digest of the canonical model with volatile fields removed.
pub fn fingerprint(model: &CanonicalIntentModel) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(model)?;
    Ok(fingerprint_value(&value))
}

/// Same hash over an arbitrary JSON document.
pub fn fingerprint_value(value: &Value) -> String {
    let canonical = strip_volatile(value).to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Deep copy without volatile keys, with every object's keys in sorted order.
pub fn strip_volatile(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map
                .keys()
                .filter(|k| !VOLATILE_FIELDS.contains(&k.as_str()))
                .collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                if let Some(inner) = map.get(key) {
                    out.insert(key.clone(), strip_volatile(inner));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(strip_volatile).collect()),
        other => other.clone(),
    }
}
