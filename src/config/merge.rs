//! Configuration merge logic
//!
//! Layers merge lowest precedence first. Tables merge key by key; any other
//! value in a higher layer, arrays and `null` included, replaces what is below.

use serde_json::Value;

/// Merge `overlay` onto `base`.
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

fn merge_into(slot: &mut Value, overlay: Value) {
    match (slot, overlay) {
        (Value::Object(lower), Value::Object(upper)) => {
            for (key, value) in upper {
                match lower.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        lower.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Fold `layers` in order; the last layer wins.
pub fn merge_layers<I>(layers: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    layers.into_iter().fold(Value::Null, deep_merge)
}
