//! # Store
//!
//! A per-resource façade over [`PotionClient::fetch`]. Each verb maps to a
//! canonical URI and HTTP method; the store keeps no state of its own.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | [`fetch`](Store::fetch) | `GET <uri>/<id>` |
//! | [`query`](Store::query) | `GET <uri>?<search>` |
//! | [`save`](Store::save) | `POST <uri>` |
//! | [`update`](Store::update) | `PATCH <item.uri>` |
//! | [`destroy`](Store::destroy) | `DELETE <item.uri>`, then evict |
//! | [`route`](Store::route) | `<method> <uri>/<path>` |

use crate::client::{FetchOptions, Fetched, PotionClient};
use crate::error::PotionError;
use crate::item::{join_path, Item, ItemRef};
use crate::registry::ResourceType;
use crate::transport::Method;
use crate::value::{PotionMap, PotionValue};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Options for [`Store::query`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    pub paginate: bool,
    pub cache: bool,
}

impl QueryOptions {
    pub fn paginated() -> Self {
        Self {
            paginate: true,
            cache: false,
        }
    }
}

/// Verbs for one registered resource type.
#[derive(Clone)]
pub struct Store {
    client: PotionClient,
    resource: Arc<ResourceType>,
}

impl Store {
    pub(crate) fn new(client: PotionClient, resource: Arc<ResourceType>) -> Self {
        Self { client, resource }
    }

    pub fn resource(&self) -> &Arc<ResourceType> {
        &self.resource
    }

    pub fn client(&self) -> &PotionClient {
        &self.client
    }

    /// A new local item of this type. Nothing is sent until it is saved.
    pub fn create(&self, properties: PotionMap) -> ItemRef {
        Item::unsaved(self.resource.clone(), properties)
    }

    /// Fetches one item by id. With `cache` a cached instance is returned
    /// without a request.
    #[instrument(skip(self), fields(resource = %self.resource.name()))]
    pub async fn fetch(&self, id: impl fmt::Display + fmt::Debug, cache: bool) -> Result<ItemRef, PotionError> {
        debug!("Sending request");
        let uri = join_path(self.resource.uri(), &id.to_string());
        self.client
            .fetch(&uri, FetchOptions::get().cache(cache), None)
            .await?
            .into_item()
            .ok_or_else(|| self.unexpected(uri, "an item"))
    }

    /// Queries the collection. With `options.paginate` the result is a
    /// [`Fetched::Page`].
    #[instrument(skip(self, search), fields(resource = %self.resource.name()))]
    pub async fn query(
        &self,
        search: Option<PotionMap>,
        options: QueryOptions,
    ) -> Result<Fetched, PotionError> {
        debug!(?search, "Sending request");
        let mut fetch = FetchOptions::get()
            .cache(options.cache)
            .paginate(options.paginate);
        fetch.search = search;
        self.client.fetch(self.resource.uri(), fetch, None).await
    }

    /// POSTs `data` to the collection and returns the created item.
    #[instrument(skip(self, data), fields(resource = %self.resource.name()))]
    pub async fn save(&self, data: PotionMap) -> Result<ItemRef, PotionError> {
        debug!(?data, "Sending request");
        let uri = self.resource.uri();
        let item = self
            .client
            .fetch(uri, FetchOptions::new(Method::Post).data(data), None)
            .await?
            .into_item()
            .ok_or_else(|| self.unexpected(uri.to_string(), "the created item"))?;
        info!(uri = ?item.uri(), "Created");
        Ok(item)
    }

    /// PATCHes `data` to `item`'s URI.
    #[instrument(skip(self, item, data), fields(resource = %self.resource.name(), uri = ?item.uri()))]
    pub async fn update(&self, item: &Item, data: PotionMap) -> Result<ItemRef, PotionError> {
        debug!(?data, "Sending request");
        let uri = self.saved_uri(item)?;
        let updated = self
            .client
            .fetch(&uri, FetchOptions::new(Method::Patch).data(data), None)
            .await?
            .into_item()
            .ok_or_else(|| self.unexpected(uri, "the updated item"))?;
        info!("Updated");
        Ok(updated)
    }

    /// DELETEs `item` and evicts it from the identity cache.
    #[instrument(skip(self, item), fields(resource = %self.resource.name(), uri = ?item.uri()))]
    pub async fn destroy(&self, item: &Item) -> Result<(), PotionError> {
        debug!("Sending request");
        let uri = self.saved_uri(item)?;
        self.client
            .fetch(&uri, FetchOptions::new(Method::Delete), None)
            .await?;
        self.client.evict(&uri);
        info!("Deleted");
        Ok(())
    }

    /// Calls a custom endpoint below the collection, e.g. `POST /widget/rebuild`.
    #[instrument(skip(self, options), fields(resource = %self.resource.name()))]
    pub async fn route(
        &self,
        method: Method,
        path: &str,
        options: FetchOptions,
    ) -> Result<Fetched, PotionError> {
        let uri = join_path(self.resource.uri(), path);
        self.client.fetch(&uri, options.method(method), None).await
    }

    fn saved_uri(&self, item: &Item) -> Result<String, PotionError> {
        item.uri()
            .ok_or_else(|| PotionError::Unsaved(self.resource.name().to_string()))
    }

    fn unexpected(&self, uri: String, expected: &'static str) -> PotionError {
        PotionError::UnexpectedResponse {
            uri: self.client.full_uri(&uri),
            expected,
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("resource", &self.resource.name())
            .field("uri", &self.resource.uri())
            .finish()
    }
}

/// Shorthand for a single search parameter map.
pub fn search<K, V, I>(pairs: I) -> PotionMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<PotionValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::TransportError;
    use crate::mock::MockTransport;
    use crate::registry::ResourceOptions;
    use serde_json::json;

    fn widgets(mock: &MockTransport) -> (PotionClient, Store) {
        let client =
            PotionClient::with_config(mock.clone(), ClientConfig::default().with_prefix("/api"));
        client.register("/widget", "Widget", ResourceOptions::new().readonly(["createdAt"]));
        let store = client.store("/widget").unwrap();
        (client, store)
    }

    #[tokio::test]
    async fn test_fetch_by_id() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "/api/widget/1")
            .return_ok(json!({"$uri": "/api/widget/1", "name": "one"}));
        let (_client, store) = widgets(&mock);

        let item = store.fetch(1, false).await.unwrap();
        assert_eq!(item.uri().as_deref(), Some("/widget/1"));
        assert_eq!(item.get("name").unwrap().as_str(), Some("one"));

        // cached fetch issues no request
        let again = store.fetch(1, true).await.unwrap();
        assert!(Arc::ptr_eq(&item, &again));
        assert_eq!(mock.call_count(), 1);
        mock.verify();
    }

    #[tokio::test]
    async fn test_fetch_non_item_is_unexpected() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "/api/widget/1").return_ok(json!({"name": "plain"}));
        let (_client, store) = widgets(&mock);

        let err = store.fetch(1, false).await.unwrap_err();
        assert_eq!(
            err,
            PotionError::UnexpectedResponse {
                uri: "/api/widget/1".into(),
                expected: "an item"
            }
        );
    }

    #[tokio::test]
    async fn test_query_sends_search() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "/api/widget").return_ok(json!([
            {"$uri": "/api/widget/1"},
            {"$uri": "/api/widget/2"}
        ]));
        let (_client, store) = widgets(&mock);

        let result = store
            .query(Some(search([("ownerId", 5i64)])), QueryOptions::default())
            .await
            .unwrap()
            .into_value();
        assert_eq!(result.as_array().map(|a| a.len()), Some(2));
        assert_eq!(mock.calls()[0].options.search, Some(json!({"owner_id": 5})));
    }

    #[tokio::test]
    async fn test_save_update_destroy() {
        let mock = MockTransport::new();
        mock.expect(Method::Post, "/api/widget")
            .return_ok(json!({"$uri": "/api/widget/3", "name": "new"}));
        mock.expect(Method::Patch, "/api/widget/3")
            .return_ok(json!({"$uri": "/api/widget/3", "name": "renamed"}));
        mock.expect(Method::Delete, "/api/widget/3").return_ok(json!(null));
        let (client, store) = widgets(&mock);

        let created = store.save(search([("name", "new")])).await.unwrap();
        assert_eq!(mock.calls()[0].options.data, Some(json!({"name": "new"})));

        let updated = store
            .update(&created, search([("name", "renamed")]))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&created, &updated));
        assert_eq!(created.get("name").unwrap().as_str(), Some("renamed"));

        store.destroy(&created).await.unwrap();
        assert!(client.cached("/widget/3").is_none());
        mock.verify();
    }

    #[tokio::test]
    async fn test_failed_destroy_keeps_cache_entry() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "/api/widget/4")
            .return_ok(json!({"$uri": "/api/widget/4"}));
        mock.expect(Method::Delete, "/api/widget/4")
            .return_err(TransportError::Http { status: 409, message: "locked".into() });
        let (client, store) = widgets(&mock);

        let item = store.fetch(4, false).await.unwrap();
        let err = store.destroy(&item).await.unwrap_err();
        assert!(matches!(err, PotionError::Request { .. }));
        assert!(client.cached("/widget/4").is_some());
    }

    #[tokio::test]
    async fn test_unsaved_item_cannot_be_updated() {
        let mock = MockTransport::new();
        let (_client, store) = widgets(&mock);
        let local = store.create(search([("name", "draft")]));

        assert_eq!(
            store.update(&local, PotionMap::new()).await.unwrap_err(),
            PotionError::Unsaved("Widget".into())
        );
        assert_eq!(
            store.destroy(&local).await.unwrap_err(),
            PotionError::Unsaved("Widget".into())
        );
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_route() {
        let mock = MockTransport::new();
        mock.expect(Method::Post, "/api/widget/rebuild").return_ok(json!({"queued": true}));
        let (_client, store) = widgets(&mock);

        let result = store
            .route(Method::Post, "rebuild", FetchOptions::default())
            .await
            .unwrap()
            .into_value();
        assert_eq!(result.as_object().unwrap()["queued"].as_bool(), Some(true));
        mock.verify();
    }
}
