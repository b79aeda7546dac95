//! # Resource Registry
//!
//! Binds URI prefixes (e.g. `/widget`) to [`ResourceType`] descriptors and
//! resolves incoming URIs back to the type that materializes them.
//!
//! Types are registered once, normally at start-up. Registering the same
//! prefix again replaces the previous association.

use crate::client::core::ClientInner;
use crate::client::PotionClient;
use crate::error::PotionError;
use crate::store::Store;
use crate::value::ItemId;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Weak};

/// Options accepted at registration time.
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    /// camelCase property names that are never sent to the server.
    pub readonly: Vec<String>,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readonly<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.readonly.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Declarative registration, attached to a type instead of passed as data.
///
/// ```rust,ignore
/// struct Widget;
/// impl Resource for Widget {
///     const URI: &'static str = "/widget";
///     const READONLY: &'static [&'static str] = &["createdAt"];
/// }
///
/// client.register_as::<Widget>();
/// let widgets = client.store_of::<Widget>()?;
/// ```
pub trait Resource: 'static {
    /// The URI prefix of the collection, e.g. `/widget`.
    const URI: &'static str;

    /// Properties excluded from outbound serialization.
    const READONLY: &'static [&'static str] = &[];

    /// The resource name used in logs. Defaults to the bare type name.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
            .split("::")
            .last()
            .unwrap_or("Unknown")
    }

    fn options() -> ResourceOptions {
        ResourceOptions::new().readonly(Self::READONLY.iter().copied())
    }
}

/// Metadata for one registered resource type.
#[derive(Debug)]
pub struct ResourceType {
    name: String,
    uri: String,
    readonly: HashSet<String>,
    client: Weak<ClientInner>,
}

impl ResourceType {
    pub(crate) fn new(
        name: impl Into<String>,
        uri: impl Into<String>,
        options: ResourceOptions,
        client: Weak<ClientInner>,
    ) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            readonly: options.readonly.into_iter().collect(),
            client,
        }
    }

    /// A descriptor with no owning client, for codec-level tests.
    #[cfg(test)]
    pub(crate) fn detached(name: &str, uri: &str, options: ResourceOptions) -> Arc<Self> {
        Arc::new(Self::new(name, uri, options, Weak::new()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registered URI prefix.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_readonly(&self, property: &str) -> bool {
        self.readonly.contains(property)
    }

    /// The client this type was registered with.
    pub fn client(&self) -> Result<PotionClient, PotionError> {
        self.client
            .upgrade()
            .map(PotionClient::from_inner)
            .ok_or(PotionError::ClientClosed)
    }

    /// A store for this type, routed through its owning client.
    pub fn store(self: &Arc<Self>) -> Result<Store, PotionError> {
        Ok(Store::new(self.client()?, self.clone()))
    }
}

/// A URI resolved against the registry.
#[derive(Debug, Clone)]
pub struct ParsedUri {
    /// The local URI, with the API-wide prefix stripped.
    pub uri: String,
    pub resource: Arc<ResourceType>,
    /// The path after the resource prefix, split on `/`.
    pub params: Vec<String>,
}

impl ParsedUri {
    /// The identifier derived from the first path parameter.
    pub fn id(&self) -> Option<ItemId> {
        self.params.first().map(|s| ItemId::from_segment(s))
    }
}

/// Prefix to resource type mapping.
#[derive(Debug, Default)]
pub struct Registry {
    resources: RwLock<BTreeMap<String, Arc<ResourceType>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the association, returning the one it replaced.
    pub fn insert(&self, resource: Arc<ResourceType>) -> Option<Arc<ResourceType>> {
        self.resources
            .write()
            .insert(resource.uri().to_string(), resource)
    }

    pub fn get(&self, prefix: &str) -> Option<Arc<ResourceType>> {
        self.resources.read().get(prefix).cloned()
    }

    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }

    /// Resolves `uri` to its resource type.
    ///
    /// `api_prefix` is stripped first when present. A registered prefix
    /// matches when `uri` starts with `"<prefix>/"`. When several prefixes
    /// match, the longest wins, so `/widget/special` shadows `/widget`.
    pub fn resolve(&self, api_prefix: &str, uri: &str) -> Result<ParsedUri, PotionError> {
        let local = strip_prefix(api_prefix, uri);
        let resources = self.resources.read();
        let (_, resource, rest) = resources
            .iter()
            .filter_map(|(prefix, resource)| {
                local
                    .strip_prefix(prefix.as_str())
                    .and_then(|r| r.strip_prefix('/'))
                    .map(|rest| (prefix, resource, rest))
            })
            .max_by_key(|(prefix, ..)| prefix.len())
            .ok_or_else(|| PotionError::UnknownResource(uri.to_string()))?;
        Ok(ParsedUri {
            uri: local.to_string(),
            resource: resource.clone(),
            params: rest.split('/').map(str::to_string).collect(),
        })
    }
}

/// Removes the API-wide prefix from the start of `uri`, if present.
pub(crate) fn strip_prefix<'a>(api_prefix: &str, uri: &'a str) -> &'a str {
    if api_prefix.is_empty() {
        return uri;
    }
    match uri.strip_prefix(api_prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => uri,
    }
}
