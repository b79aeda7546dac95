//! # Items
//!
//! An [`Item`] is the single in-memory instance of one server resource. Items
//! are shared as [`ItemRef`] (`Arc<Item>`) and updated in place, so every
//! holder observes the latest decoded state.
//!
//! Mutations (`update`, `save`, `destroy`) route through the [`Store`] of the
//! item's resource type.

use crate::client::{Fetched, FetchOptions};
use crate::encode::to_potion_json;
use crate::error::PotionError;
use crate::registry::ResourceType;
use crate::store::Store;
use crate::transport::Method;
use crate::value::{ItemId, PotionMap, PotionValue};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

pub type ItemRef = Arc<Item>;

struct ItemState {
    uri: Option<String>,
    id: Option<ItemId>,
    properties: PotionMap,
}

/// A live resource instance.
pub struct Item {
    resource: Arc<ResourceType>,
    state: RwLock<ItemState>,
}

impl Item {
    /// An identified instance with no properties yet.
    pub(crate) fn placeholder(resource: Arc<ResourceType>, uri: String, id: Option<ItemId>) -> ItemRef {
        Arc::new(Self {
            resource,
            state: RwLock::new(ItemState {
                uri: Some(uri),
                id,
                properties: PotionMap::new(),
            }),
        })
    }

    /// A local instance that has not been saved to the server.
    pub(crate) fn unsaved(resource: Arc<ResourceType>, properties: PotionMap) -> ItemRef {
        Arc::new(Self {
            resource,
            state: RwLock::new(ItemState {
                uri: None,
                id: None,
                properties,
            }),
        })
    }

    pub fn resource(&self) -> &Arc<ResourceType> {
        &self.resource
    }

    /// The local (prefix-stripped) URI, absent until saved.
    pub fn uri(&self) -> Option<String> {
        self.state.read().uri.clone()
    }

    pub fn id(&self) -> Option<ItemId> {
        self.state.read().id.clone()
    }

    pub fn get(&self, key: &str) -> Option<PotionValue> {
        self.state.read().properties.get(key).cloned()
    }

    /// Reads a property into a concrete type.
    ///
    /// Returns `Ok(None)` when the property is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PotionError> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.to_json())?)),
            None => Ok(None),
        }
    }

    /// Sets a property locally. Nothing is sent until `save`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<PotionValue>) {
        self.state.write().properties.insert(key.into(), value.into());
    }

    /// A snapshot of all properties.
    pub fn properties(&self) -> PotionMap {
        self.state.read().properties.clone()
    }

    /// Merges decoded properties into this instance, keeping its identity.
    pub(crate) fn merge(&self, properties: PotionMap) {
        let mut state = self.state.write();
        for (key, value) in properties {
            state.properties.insert(key, value);
        }
    }

    pub(crate) fn has_properties(&self) -> bool {
        !self.state.read().properties.is_empty()
    }

    /// The properties that may be sent to the server: no `_`-prefixed keys
    /// and nothing the resource type marks read-only.
    pub fn to_properties(&self) -> PotionMap {
        self.state
            .read()
            .properties
            .iter()
            .filter(|(key, _)| !key.starts_with('_') && !self.resource.is_readonly(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Wire-format JSON for this item's writable properties.
    pub fn to_json(&self) -> serde_json::Value {
        let prefix = self
            .resource
            .client()
            .map(|c| c.config().prefix.clone())
            .unwrap_or_default();
        to_potion_json(&PotionValue::Object(self.to_properties()), &prefix)
    }

    fn store(&self) -> Result<Store, PotionError> {
        self.resource.store()
    }

    /// PATCHes `data` to this item's URI.
    #[instrument(skip(self, data), fields(resource = %self.resource.name(), uri = ?self.uri()))]
    pub async fn update(&self, data: PotionMap) -> Result<ItemRef, PotionError> {
        self.store()?.update(self, data).await
    }

    /// Persists this item.
    ///
    /// An unsaved item is POSTed to its collection and the canonical decoded
    /// instance is returned. A saved item PATCHes its writable properties.
    #[instrument(skip(self), fields(resource = %self.resource.name(), uri = ?self.uri()))]
    pub async fn save(&self) -> Result<ItemRef, PotionError> {
        let store = self.store()?;
        let data = self.to_properties();
        if self.uri().is_some() {
            store.update(self, data).await
        } else {
            store.save(data).await
        }
    }

    /// DELETEs this item and evicts it from the identity cache.
    #[instrument(skip(self), fields(resource = %self.resource.name(), uri = ?self.uri()))]
    pub async fn destroy(&self) -> Result<(), PotionError> {
        self.store()?.destroy(self).await
    }

    /// Calls a custom endpoint below this item, e.g. `GET <uri>/siblings`.
    #[instrument(skip(self, options), fields(resource = %self.resource.name(), uri = ?self.uri()))]
    pub async fn route(
        &self,
        method: Method,
        path: &str,
        options: FetchOptions,
    ) -> Result<Fetched, PotionError> {
        let uri = self
            .uri()
            .ok_or_else(|| PotionError::Unsaved(self.resource.name().to_string()))?;
        let client = self.resource.client()?;
        client
            .fetch(&join_path(&uri, path), options.method(method), None)
            .await
    }
}

impl fmt::Debug for Item {
    // Properties may point back at this item, so only keys are printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Item")
            .field("resource", &self.resource.name())
            .field("uri", &state.uri)
            .field("properties", &state.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub(crate) fn join_path(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResourceOptions;
    use serde_json::json;

    fn widget_type() -> Arc<ResourceType> {
        ResourceType::detached(
            "Widget",
            "/widget",
            ResourceOptions::new().readonly(["createdAt"]),
        )
    }

    #[test]
    fn test_to_properties_excludes_private_and_readonly() {
        let item = Item::placeholder(widget_type(), "/widget/1".into(), Some(ItemId::Number(1)));
        item.merge(PotionMap::from([
            ("fooBar".to_string(), PotionValue::from(1i64)),
            ("_local".to_string(), PotionValue::from("x")),
            ("createdAt".to_string(), PotionValue::from("yesterday")),
        ]));

        let props = item.to_properties();
        assert_eq!(props.len(), 1);
        assert!(props.contains_key("fooBar"));
        assert_eq!(item.to_json(), json!({"foo_bar": 1}));
    }

    #[test]
    fn test_merge_keeps_order_and_overwrites() {
        let item = Item::unsaved(widget_type(), PotionMap::new());
        item.set("a", 1i64);
        item.set("b", 2i64);
        item.merge(PotionMap::from([
            ("a".to_string(), PotionValue::from(10i64)),
            ("c".to_string(), PotionValue::from(3i64)),
        ]));
        let keys: Vec<_> = item.properties().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(item.get("a").and_then(|v| v.as_i64()), Some(10));
    }

    #[test]
    fn test_get_as() {
        let item = Item::unsaved(widget_type(), PotionMap::new());
        item.set("tags", PotionValue::from(json!(["a", "b"])));
        let tags: Option<Vec<String>> = item.get_as("tags").unwrap();
        assert_eq!(tags, Some(vec!["a".to_string(), "b".to_string()]));

        let missing: Option<u32> = item.get_as("nope").unwrap();
        assert!(missing.is_none());

        assert!(matches!(item.get_as::<u32>("tags"), Err(PotionError::Json(_))));
    }

    #[tokio::test]
    async fn test_mutation_without_client_fails() {
        let item = Item::placeholder(widget_type(), "/widget/1".into(), None);
        assert_eq!(item.destroy().await, Err(PotionError::ClientClosed));
    }

    #[test]
    fn test_debug_is_not_recursive() {
        let item = Item::placeholder(widget_type(), "/widget/1".into(), None);
        item.set("me", item.clone());
        let printed = format!("{:?}", item);
        assert!(printed.contains("/widget/1"));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/widget/1", "siblings"), "/widget/1/siblings");
        assert_eq!(join_path("/widget/", "/rebuild"), "/widget/rebuild");
    }
}
