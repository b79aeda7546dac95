//! Key casing between the wire (`snake_case`) and the domain (`camelCase`).
//!
//! Only object *keys* are rewritten. Values pass through untouched, so a
//! string value that happens to look like an identifier is never renamed.

use serde_json::{Map, Value};

/// Converts `snake_case` to `camelCase`.
///
/// Every `_` followed by a character upper-cases that character and is
/// dropped. Leading and trailing `_` are kept, so private keys stay
/// private. Leading `$` markers survive as-is.
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next_if_eq(&'_') {
        out.push(c);
    }
    while let Some(c) = chars.next() {
        if c == '_' {
            match chars.next() {
                Some(next) => out.extend(next.to_uppercase()),
                None => out.push('_'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts `camelCase` to `snake_case`.
///
/// Each upper-case character becomes `_` plus its lower-case form.
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_uppercase() {
            out.push('_');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Recursively renames every object key to `camelCase`.
pub fn camelize_keys(value: Value) -> Value {
    rename_keys(value, &to_camel_case)
}

/// Recursively renames every object key to `snake_case`.
pub fn snakify_keys(value: Value) -> Value {
    rename_keys(value, &to_snake_case)
}

fn rename_keys(value: Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (rename(&k), rename_keys(v, rename)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| rename_keys(v, rename)).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("foo_bar"), "fooBar");
        assert_eq!(to_camel_case("foo_bar_baz"), "fooBarBaz");
        assert_eq!(to_camel_case("foo"), "foo");
        assert_eq!(to_camel_case("$uri"), "$uri");
        assert_eq!(to_camel_case("trailing_"), "trailing_");
    }

    #[test]
    fn test_leading_underscore_is_kept() {
        assert_eq!(to_camel_case("_private"), "_private");
        assert_eq!(to_camel_case("_foo_bar"), "_fooBar");
        assert_eq!(to_camel_case("__dunder"), "__dunder");
        assert_eq!(to_snake_case("_fooBar"), "_foo_bar");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("fooBar"), "foo_bar");
        assert_eq!(to_snake_case("perPage"), "per_page");
        assert_eq!(to_snake_case("foo"), "foo");
        assert_eq!(to_snake_case("$ref"), "$ref");
    }

    #[test]
    fn test_double_underscore_does_not_round_trip() {
        let camel = to_camel_case("foo__bar");
        assert_eq!(camel, "foo_bar");
        assert_ne!(to_snake_case(&camel), "foo__bar");
    }

    #[test]
    fn test_nested_keys_are_renamed_values_are_not() {
        let wire = json!({
            "first_name": "snake_value",
            "nested_list": [{"inner_key": 1}, 2, "x_y"],
            "child": {"deep_key": {"deeper_key": null}}
        });

        let domain = camelize_keys(wire.clone());
        assert_eq!(
            domain,
            json!({
                "firstName": "snake_value",
                "nestedList": [{"innerKey": 1}, 2, "x_y"],
                "child": {"deepKey": {"deeperKey": null}}
            })
        );
        assert_eq!(snakify_keys(domain), wire);
    }
}
