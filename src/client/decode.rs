//! # Inbound Transform
//!
//! Turns Potion wire JSON into domain values, resolving resources through the
//! identity cache and following `$ref` stubs with cached GETs.
//!
//! | Wire | Domain |
//! |------|--------|
//! | `{"$uri": "...", ...}` | the canonical [`Item`] for that URI, properties merged in |
//! | `{"$schema": "...", ...}` | plain object, keys camelCased, nothing resolved |
//! | `{"$ref": "#"}` | the string `"#"` (self references are not followed) |
//! | `{"$ref": "..."}` | the referenced item, via a cached GET |
//! | `{"$date": <millis>}` | a UTC date |
//! | any other object | plain object, keys camelCased, values decoded |
//! | array | element-wise, order preserved |
//!
//! ## Identity protocol
//!
//! A `$uri` object first registers its instance as under construction,
//! creating and caching a placeholder if the cache has none. Anything inside
//! that points back at the same URI (nested `$uri` or `$ref`) lands on that
//! instance instead of recursing or fetching, even if a bounded cache evicted
//! it meanwhile. Once every property has settled, the cached instance
//! receives the merged properties. If decoding fails, a placeholder created
//! for it is removed again.

use super::core::{FetchOptions, Fetched, PotionClient};
use crate::error::PotionError;
use crate::item::Item;
use crate::naming::{camelize_keys, to_camel_case};
use crate::value::{PotionMap, PotionValue};
use chrono::DateTime;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tracing::debug;

/// The reference value that is never dereferenced.
pub const SELF_REFERENCE: &str = "#";

impl PotionClient {
    /// Decodes a wire JSON value.
    ///
    /// Sibling values are decoded concurrently. The first failure fails the
    /// whole decode.
    pub fn decode(&self, value: Value) -> BoxFuture<'static, Result<PotionValue, PotionError>> {
        let client = self.clone();
        async move {
            match value {
                Value::Array(items) => {
                    let decoded = try_join_all(items.into_iter().map(|v| client.decode(v))).await?;
                    Ok(PotionValue::Array(decoded))
                }
                Value::Object(map) => client.decode_object(map).await,
                scalar => Ok(PotionValue::from(scalar)),
            }
        }
        .boxed()
    }

    async fn decode_object(&self, map: Map<String, Value>) -> Result<PotionValue, PotionError> {
        if let Some(Value::String(uri)) = map.get("$uri") {
            let uri = uri.clone();
            return self.decode_resource(uri, map).await;
        }

        if matches!(map.get("$schema"), Some(Value::String(_))) {
            return Ok(PotionValue::from(camelize_keys(Value::Object(map))));
        }

        if map.len() == 1 {
            if let Some(Value::String(reference)) = map.get("$ref") {
                let reference = reference.clone();
                return self.decode_reference(reference).await;
            }
            if let Some(date) = map
                .get("$date")
                .and_then(Value::as_i64)
                .and_then(DateTime::from_timestamp_millis)
            {
                return Ok(PotionValue::Date(date));
            }
        }

        Ok(PotionValue::Object(self.decode_entries(map, None).await?))
    }

    /// Decodes every value concurrently, renaming keys to camelCase.
    async fn decode_entries(
        &self,
        map: Map<String, Value>,
        skip: Option<&str>,
    ) -> Result<PotionMap, PotionError> {
        let (keys, values): (Vec<String>, Vec<Value>) = map
            .into_iter()
            .filter(|(key, _)| Some(key.as_str()) != skip)
            .map(|(key, value)| (to_camel_case(&key), value))
            .unzip();
        let decoded = try_join_all(values.into_iter().map(|v| self.decode(v))).await?;
        Ok(keys.into_iter().zip(decoded).collect())
    }

    async fn decode_resource(
        &self,
        uri: String,
        map: Map<String, Value>,
    ) -> Result<PotionValue, PotionError> {
        let parsed = self.parse_uri(&uri)?;
        let id = parsed.id();

        let placeholder = self.begin_decoding(&parsed.uri, || {
            Item::placeholder(parsed.resource.clone(), parsed.uri.clone(), id)
        });
        let properties = self.decode_entries(map, Some("$uri")).await;
        let item = self.finish_decoding(&parsed.uri, placeholder, properties)?;

        debug!(uri = %parsed.uri, resource = parsed.resource.name(), "Decoded resource");
        Ok(PotionValue::Item(item))
    }

    async fn decode_reference(&self, reference: String) -> Result<PotionValue, PotionError> {
        if reference == SELF_REFERENCE {
            return Ok(PotionValue::String(reference));
        }
        let parsed = self.parse_uri(&reference)?;
        self.fetch(&parsed.uri, FetchOptions::get().cache(true), None)
            .await
            .map(Fetched::into_value)
    }
}
