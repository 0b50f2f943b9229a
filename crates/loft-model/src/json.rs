//! JSON interchange.
//!
//! Payloads arriving from a fetch layer come in as `serde_json` values;
//! these helpers lift them into model values and back. Objects become
//! ordered maps, so field application order follows the document.

use crate::{Item, List, Value, WrapPolicy};

/// Convert a JSON document into a model value.
pub fn value_from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => {
            Value::Seq(items.into_iter().map(value_from_json).collect())
        }
        serde_json::Value::Object(map) => {
            Value::Map(map.into_iter().map(|(k, v)| (k, value_from_json(v))).collect())
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        value_from_json(json)
    }
}

/// Parse a JSON object into an [`Item`]. Non-object documents yield an
/// empty item.
pub fn item_from_json(text: &str) -> serde_json::Result<Item> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(match value_from_json(json) {
        Value::Map(pairs) => Item::from_pairs(pairs),
        _ => Item::new(),
    })
}

/// Parse a JSON array into a [`List`] with the given wrap policy.
/// Non-array documents yield an empty list.
pub fn list_from_json(text: &str, wrap: WrapPolicy) -> serde_json::Result<List> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(match value_from_json(json) {
        Value::Seq(values) => List::from_values(values, wrap),
        _ => List::new(wrap),
    })
}

/// Convert a model value back into JSON. Nested models serialize by
/// content.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Value::from(*f),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Seq(vs) => serde_json::Value::Array(vs.iter().map(to_json).collect()),
        Value::Map(pairs) => serde_json::Value::Object(
            pairs.iter().map(|(k, v)| (k.clone(), to_json(v))).collect(),
        ),
        Value::Item(item) => serde_json::Value::Object(
            item.fields()
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
        Value::List(list) => {
            serde_json::Value::Array(list.items().iter().map(to_json).collect())
        }
    }
}
