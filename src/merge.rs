//! Deep merge for settings documents
//!
//! Combines hardcoded defaults with whatever partial JSON was persisted.
//! The contract is asymmetric on purpose: object values merge key-by-key,
//! while arrays and scalars from the source replace the target wholesale.

use serde_json::Value;

/// Recursively merge `source` into `target`.
///
/// For every key in `source`: if both sides hold an object the objects
/// merge key-wise (an empty object is initialized on the target side if
/// it held a non-object); any other value, including arrays, overwrites
/// the target value.
pub fn merge_deep(target: &mut Value, source: &Value) {
    let Some(source_map) = source.as_object() else {
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }

    let Value::Object(target_map) = target else {
        return;
    };

    for (key, source_value) in source_map {
        if source_value.is_object() {
            let slot = target_map
                .entry(key.clone())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            merge_deep(slot, source_value);
        } else {
            target_map.insert(key.clone(), source_value.clone());
        }
    }
}

/// Merge `source` over a clone of `defaults` and return the result.
pub fn merged(defaults: &Value, source: &Value) -> Value {
    let mut out = defaults.clone();
    merge_deep(&mut out, source);
    out
}
