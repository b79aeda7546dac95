//! # Core Client
//!
//! [`PotionClient`] owns the registry, the identity cache and the table of
//! in-flight GET requests, and drives every request through the transport.
//!
//! ## Fetch pipeline
//!
//! 1. Prefix the URI with the API-wide prefix.
//! 2. When paginating, default `page = 1` and `perPage` under the caller's search.
//! 3. Encode `search` and `data` for the wire.
//! 4. Plain GETs (no search) may short-circuit on the identity cache and share
//!    an in-flight request with identical callers.
//! 5. Call the transport and decode the body.
//! 6. Paginated requests wrap the result in a [`Pagination`], or refresh the
//!    one passed in.
//!
//! The client is a cheap `Arc` handle; clones share all state.

use crate::cache::{ItemCache, MemoryCache};
use crate::config::ClientConfig;
use crate::encode::to_potion_json;
use crate::error::PotionError;
use crate::item::ItemRef;
use crate::pagination::Pagination;
use crate::registry::{strip_prefix, ParsedUri, Registry, Resource, ResourceOptions, ResourceType};
use crate::store::Store;
use crate::transport::{Method, RequestOptions, Transport};
use crate::value::{PotionMap, PotionValue};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};

const TOTAL_COUNT_HEADER: &str = "x-total-count";

type SharedFetch = Shared<BoxFuture<'static, Result<PotionValue, PotionError>>>;

/// Options for [`PotionClient::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: Method,
    /// Query parameters, camelCase.
    pub search: Option<PotionMap>,
    /// Request body.
    pub data: Option<PotionValue>,
    /// Serve plain GETs from the identity cache when possible.
    pub cache: bool,
    /// Return a [`Pagination`] instead of a plain value.
    pub paginate: bool,
}

impl FetchOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::Get)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn search(mut self, search: PotionMap) -> Self {
        self.search = Some(search);
        self
    }

    pub fn data(mut self, data: impl Into<PotionValue>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn paginate(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    fn has_search(&self) -> bool {
        self.search.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// The outcome of [`PotionClient::fetch`].
#[derive(Debug, Clone)]
pub enum Fetched {
    Value(PotionValue),
    Page(Pagination),
}

impl Fetched {
    /// The decoded value. A page yields its current items as an array.
    pub fn into_value(self) -> PotionValue {
        match self {
            Fetched::Value(value) => value,
            Fetched::Page(page) => PotionValue::Array(page.items()),
        }
    }

    pub fn into_item(self) -> Option<ItemRef> {
        match self {
            Fetched::Value(value) => value.into_item(),
            Fetched::Page(_) => None,
        }
    }

    pub fn into_page(self) -> Option<Pagination> {
        match self {
            Fetched::Page(page) => Some(page),
            Fetched::Value(_) => None,
        }
    }
}

/// An item whose properties are still being decoded.
struct Decoding {
    item: ItemRef,
    // overlapping decodes of the same URI
    depth: usize,
    // the placeholder was put into the cache by this decode
    inserted: bool,
}

/// Shared state behind every [`PotionClient`] handle.
pub(crate) struct ClientInner {
    transport: Box<dyn Transport>,
    config: ClientConfig,
    registry: Registry,
    cache: Box<dyn ItemCache>,
    pending: Mutex<HashMap<String, SharedFetch>>,
    // Items under construction, by local URI. Consulted before the cache so a
    // back-reference finds its placeholder even if the cache evicted it.
    decoding: Mutex<HashMap<String, Decoding>>,
}

/// Client for a Potion JSON API.
#[derive(Clone)]
pub struct PotionClient {
    inner: Arc<ClientInner>,
}

impl PotionClient {
    /// A client with default configuration and an unbounded identity cache.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: impl Transport + 'static, config: ClientConfig) -> Self {
        Self::with_cache(transport, config, MemoryCache::new())
    }

    /// A client using a caller-supplied identity cache.
    pub fn with_cache(
        transport: impl Transport + 'static,
        config: ClientConfig,
        cache: impl ItemCache + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport: Box::new(transport),
                config,
                registry: Registry::new(),
                cache: Box::new(cache),
                pending: Mutex::new(HashMap::new()),
                decoding: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    fn downgrade(&self) -> Weak<ClientInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &dyn ItemCache {
        self.inner.cache.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// True when both handles share the same client state.
    pub fn ptr_eq(&self, other: &PotionClient) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Registers `name` as the resource served under `prefix`.
    ///
    /// A second registration for the same prefix replaces the first.
    pub fn register(
        &self,
        prefix: &str,
        name: &str,
        options: ResourceOptions,
    ) -> Arc<ResourceType> {
        let resource = Arc::new(ResourceType::new(name, prefix, options, self.downgrade()));
        if let Some(previous) = self.inner.registry.insert(resource.clone()) {
            warn!(prefix, previous = previous.name(), resource = name, "Prefix re-registered");
        }
        info!(prefix, resource = name, "Registered");
        resource
    }

    /// Registers `R` using its declared URI and options.
    pub fn register_as<R: Resource>(&self) -> Arc<ResourceType> {
        self.register(R::URI, R::name(), R::options())
    }

    pub fn resource(&self, prefix: &str) -> Option<Arc<ResourceType>> {
        self.inner.registry.get(prefix)
    }

    /// A store for the resource registered under `prefix`.
    pub fn store(&self, prefix: &str) -> Result<Store, PotionError> {
        self.resource(prefix)
            .map(|resource| Store::new(self.clone(), resource))
            .ok_or_else(|| PotionError::UnknownResource(prefix.to_string()))
    }

    pub fn store_of<R: Resource>(&self) -> Result<Store, PotionError> {
        self.store(R::URI)
    }

    // -------------------------------------------------------------------------
    // URIs & cache
    // -------------------------------------------------------------------------

    /// Resolves a full or local URI to its resource type.
    pub fn parse_uri(&self, uri: &str) -> Result<ParsedUri, PotionError> {
        self.inner
            .registry
            .resolve(&self.inner.config.prefix, uri)
            .inspect_err(|_| warn!(uri, "Unknown resource URI"))
    }

    /// Prepends the API-wide prefix unless `uri` already carries it.
    pub fn full_uri(&self, uri: &str) -> String {
        let prefix = &self.inner.config.prefix;
        if strip_prefix(prefix, uri).len() != uri.len() {
            uri.to_string()
        } else {
            format!("{}{}", prefix, uri)
        }
    }

    /// The cached instance for a local or prefixed URI. Never does I/O.
    ///
    /// An item that is still being decoded counts as cached.
    pub fn cached(&self, uri: &str) -> Option<ItemRef> {
        let local = strip_prefix(&self.inner.config.prefix, uri);
        if let Some(entry) = self.inner.decoding.lock().get(local) {
            return Some(entry.item.clone());
        }
        self.inner.cache.get(local)
    }

    pub(crate) fn evict(&self, uri: &str) {
        self.inner
            .cache
            .remove(strip_prefix(&self.inner.config.prefix, uri));
    }

    /// Marks `uri` as being decoded and returns its instance: the one already
    /// under construction, else the cached one, else `make()` (cached).
    ///
    /// Every call must be paired with [`finish_decoding`](Self::finish_decoding).
    pub(crate) fn begin_decoding(&self, uri: &str, make: impl FnOnce() -> ItemRef) -> ItemRef {
        let mut decoding = self.inner.decoding.lock();
        if let Some(entry) = decoding.get_mut(uri) {
            entry.depth += 1;
            return entry.item.clone();
        }
        let (item, inserted) = match self.inner.cache.get(uri) {
            Some(existing) => (existing, false),
            None => (self.inner.cache.put(uri, make()), true),
        };
        decoding.insert(
            uri.to_string(),
            Decoding {
                item: item.clone(),
                depth: 1,
                inserted,
            },
        );
        item
    }

    /// Ends one decode of `uri`.
    ///
    /// On success the properties are merged into the canonical instance,
    /// which is put back into the cache if it was evicted meanwhile. On
    /// failure a placeholder this decode created is dropped from the cache
    /// again, as long as nothing has filled it in.
    pub(crate) fn finish_decoding(
        &self,
        uri: &str,
        placeholder: ItemRef,
        properties: Result<PotionMap, PotionError>,
    ) -> Result<ItemRef, PotionError> {
        let mut decoding = self.inner.decoding.lock();
        let (last, inserted) = match decoding.get_mut(uri) {
            Some(entry) => {
                entry.depth -= 1;
                (entry.depth == 0, entry.inserted)
            }
            None => (true, false),
        };
        if last {
            decoding.remove(uri);
        }

        match properties {
            Ok(properties) => {
                let item = match self.inner.cache.get(uri) {
                    Some(existing) => existing,
                    None => self.inner.cache.put(uri, placeholder),
                };
                item.merge(properties);
                Ok(item)
            }
            Err(e) => {
                if last && inserted && !placeholder.has_properties() {
                    let cached = self.inner.cache.get(uri);
                    if cached.is_some_and(|c| Arc::ptr_eq(&c, &placeholder)) {
                        self.inner.cache.remove(uri);
                        debug!(uri, "Dropped placeholder of failed decode");
                    }
                }
                Err(e)
            }
        }
    }

    /// Encodes a domain value for the wire using this client's prefix.
    pub fn encode(&self, value: &PotionValue) -> serde_json::Value {
        to_potion_json(value, &self.inner.config.prefix)
    }

    // -------------------------------------------------------------------------
    // Fetch
    // -------------------------------------------------------------------------

    /// Performs a request and decodes the response.
    ///
    /// With `options.paginate` the result is a [`Fetched::Page`]. When
    /// `pagination` is given it is refreshed in place and returned.
    #[instrument(skip(self, options, pagination), fields(method = %options.method))]
    pub async fn fetch(
        &self,
        uri: &str,
        mut options: FetchOptions,
        pagination: Option<&Pagination>,
    ) -> Result<Fetched, PotionError> {
        let full = self.full_uri(uri);

        if options.paginate {
            let per_page = self.inner.config.default_per_page;
            let search = options.search.get_or_insert_with(PotionMap::new);
            search
                .entry("page".to_string())
                .or_insert_with(|| PotionValue::from(1u64));
            search
                .entry("perPage".to_string())
                .or_insert_with(|| PotionValue::from(u64::from(per_page)));
        }

        let request = RequestOptions {
            method: options.method,
            search: options.search.as_ref().map(|s| self.encode(&PotionValue::Object(s.clone()))),
            data: options.data.as_ref().map(|d| self.encode(d)),
            cache: options.cache,
        };

        if options.method == Method::Get && !options.has_search() {
            if options.cache {
                if let Some(item) = self.cached(&full) {
                    debug!(uri = %full, "Cache hit");
                    return Ok(Fetched::Value(PotionValue::Item(item)));
                }
            }
            let value = self.shared_get(&full, request).await?;
            return Ok(Fetched::Value(value));
        }

        let (value, total) = self.send(full.clone(), request).await?;
        if !options.paginate {
            return Ok(Fetched::Value(value));
        }

        let items = value.into_array().ok_or_else(|| PotionError::UnexpectedResponse {
            uri: full.clone(),
            expected: "an array of results",
        })?;
        let total = total.unwrap_or(items.len());
        debug!(uri = %full, count = items.len(), total, "Page fetched");

        match pagination {
            Some(page) => {
                page.update(items, total);
                Ok(Fetched::Page(page.clone()))
            }
            None => Ok(Fetched::Page(Pagination::new(
                self.clone(),
                full,
                options,
                items,
                total,
            ))),
        }
    }

    /// Joins an in-flight GET for `full`, or starts one.
    ///
    /// The table entry is removed when the request settles, whatever the
    /// outcome, so a later identical GET goes to the transport again.
    fn shared_get(&self, full: &str, request: RequestOptions) -> SharedFetch {
        let mut pending = self.inner.pending.lock();
        if let Some(in_flight) = pending.get(full) {
            debug!(uri = %full, "Joining in-flight request");
            return in_flight.clone();
        }

        let weak = self.downgrade();
        let key = full.to_string();
        let request_future = async move {
            let client = weak
                .upgrade()
                .map(PotionClient::from_inner)
                .ok_or(PotionError::ClientClosed)?;
            let result = client.send(key.clone(), request).await.map(|(value, _)| value);
            client.inner.pending.lock().remove(&key);
            result
        }
        .boxed()
        .shared();

        pending.insert(full.to_string(), request_future.clone());
        request_future
    }

    /// Calls the transport and decodes the body. Also returns the
    /// `x-total-count` header when present.
    fn send(
        &self,
        full: String,
        request: RequestOptions,
    ) -> BoxFuture<'static, Result<(PotionValue, Option<usize>), PotionError>> {
        let client = self.clone();
        async move {
            debug!(uri = %full, method = %request.method, "Sending request");
            let response = client
                .inner
                .transport
                .request(&full, request)
                .await
                .map_err(|e| {
                    warn!(uri = %full, error = %e, "Request failed");
                    PotionError::Request {
                        message: e.normalize(&full),
                        uri: full.clone(),
                    }
                })?;

            let total = response
                .header(TOTAL_COUNT_HEADER)
                .and_then(|v| v.trim().parse::<usize>().ok());
            let value = client.decode(response.data).await?;
            Ok((value, total))
        }
        .boxed()
    }
}
