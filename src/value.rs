//! Domain values produced by decoding Potion JSON.
//!
//! A decoded tree is made of plain JSON scalars plus two richer leaves:
//! dates and live [`Item`](crate::item::Item) references.

use crate::item::ItemRef;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// An insertion-ordered mapping of camelCase keys to domain values.
pub type PotionMap = IndexMap<String, PotionValue>;

/// A decoded domain value.
#[derive(Debug, Clone, Default)]
pub enum PotionValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<PotionValue>),
    Object(PotionMap),
    Item(ItemRef),
}

impl PotionValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PotionValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PotionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PotionValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PotionValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PotionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            PotionValue::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PotionValue]> {
        match self {
            PotionValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PotionMap> {
        match self {
            PotionValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&ItemRef> {
        match self {
            PotionValue::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_item(self) -> Option<ItemRef> {
        match self {
            PotionValue::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<PotionValue>> {
        match self {
            PotionValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Renders the value as plain camelCase JSON.
    ///
    /// Dates become RFC 3339 strings and items become their local URI
    /// (`null` while unsaved). Used for typed property access, not for the
    /// wire; see [`to_potion_json`](crate::encode::to_potion_json) for that.
    pub fn to_json(&self) -> Value {
        match self {
            PotionValue::Null => Value::Null,
            PotionValue::Bool(b) => Value::Bool(*b),
            PotionValue::Number(n) => Value::Number(n.clone()),
            PotionValue::String(s) => Value::String(s.clone()),
            PotionValue::Date(d) => {
                Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            PotionValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            PotionValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            PotionValue::Item(item) => item.uri().map(Value::String).unwrap_or(Value::Null),
        }
    }
}

impl PartialEq for PotionValue {
    /// Structural equality, except items which compare by identity.
    fn eq(&self, other: &Self) -> bool {
        use PotionValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Item(a), Item(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Plain JSON converts without interpreting any `$` markers.
impl From<Value> for PotionValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PotionValue::Null,
            Value::Bool(b) => PotionValue::Bool(b),
            Value::Number(n) => PotionValue::Number(n),
            Value::String(s) => PotionValue::String(s),
            Value::Array(items) => {
                PotionValue::Array(items.into_iter().map(PotionValue::from).collect())
            }
            Value::Object(map) => PotionValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, PotionValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<ItemRef> for PotionValue {
    fn from(item: ItemRef) -> Self {
        PotionValue::Item(item)
    }
}

impl From<DateTime<Utc>> for PotionValue {
    fn from(date: DateTime<Utc>) -> Self {
        PotionValue::Date(date)
    }
}

impl From<PotionMap> for PotionValue {
    fn from(map: PotionMap) -> Self {
        PotionValue::Object(map)
    }
}

impl From<Vec<PotionValue>> for PotionValue {
    fn from(items: Vec<PotionValue>) -> Self {
        PotionValue::Array(items)
    }
}

impl From<&str> for PotionValue {
    fn from(s: &str) -> Self {
        PotionValue::String(s.to_string())
    }
}

impl From<String> for PotionValue {
    fn from(s: String) -> Self {
        PotionValue::String(s)
    }
}

impl From<bool> for PotionValue {
    fn from(b: bool) -> Self {
        PotionValue::Bool(b)
    }
}

impl From<i64> for PotionValue {
    fn from(n: i64) -> Self {
        PotionValue::Number(n.into())
    }
}

impl From<u64> for PotionValue {
    fn from(n: u64) -> Self {
        PotionValue::Number(n.into())
    }
}

impl From<f64> for PotionValue {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n)
            .map(PotionValue::Number)
            .unwrap_or(PotionValue::Null)
    }
}

/// A resource-local identifier: the last path segment of a resource URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemId {
    Number(u64),
    Name(String),
}

impl ItemId {
    /// Numeric when the segment is all digits, otherwise kept verbatim.
    pub fn from_segment(segment: &str) -> Self {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = segment.parse() {
                return ItemId::Number(n);
            }
        }
        ItemId::Name(segment.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{}", n),
            ItemId::Name(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId::Number(n)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::from_segment(s)
    }
}
