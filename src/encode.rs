//! Outbound transform: domain values to Potion wire JSON.
//!
//! | Domain | Wire |
//! |--------|------|
//! | saved item | `{"$ref": "<prefix><uri>"}` |
//! | unsaved item | its writable properties, inline |
//! | date | `{"$date": <epoch millis>}` |
//! | object | snake_case keys, values encoded |
//! | array | element-wise |

use crate::naming::to_snake_case;
use crate::value::PotionValue;
use serde_json::{json, Map, Value};

/// Encodes `value` for the wire. `api_prefix` is prepended to `$ref` URIs.
pub fn to_potion_json(value: &PotionValue, api_prefix: &str) -> Value {
    match value {
        PotionValue::Null => Value::Null,
        PotionValue::Bool(b) => Value::Bool(*b),
        PotionValue::Number(n) => Value::Number(n.clone()),
        PotionValue::String(s) => Value::String(s.clone()),
        PotionValue::Date(d) => json!({ "$date": d.timestamp_millis() }),
        PotionValue::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| to_potion_json(v, api_prefix))
                .collect(),
        ),
        PotionValue::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (to_snake_case(k), to_potion_json(v, api_prefix)))
                .collect::<Map<String, Value>>(),
        ),
        PotionValue::Item(item) => match item.uri() {
            Some(uri) => json!({ "$ref": format!("{}{}", api_prefix, uri) }),
            None => to_potion_json(&PotionValue::Object(item.to_properties()), api_prefix),
        },
    }
}
