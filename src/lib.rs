//! # Potion Client
//!
//! > **Client-side object mapping for Potion-style hypermedia JSON APIs.**
//!
//! Servers following the Potion convention mark resources with `$uri`, link
//! to other resources with `{"$ref": ...}` stubs, send dates as
//! `{"$date": <millis>}` and use snake_case keys. This crate turns those
//! payloads into linked, live [`Item`]s with camelCase properties, and turns
//! local values back into wire JSON.
//!
//! ## Core Concepts
//!
//! ### One instance per resource
//! Every decoded `$uri` goes through the identity cache, so two responses that
//! mention `/widget/1` produce the same [`ItemRef`]. Updates are merged into
//! that instance and every holder sees them. Cyclic graphs decode without
//! recursing forever.
//!
//! ### Requests go through one pipeline
//! [`PotionClient::fetch`] prefixes URIs, encodes search and body, calls the
//! [`Transport`], decodes the response and optionally wraps it in a
//! [`Pagination`]. Identical concurrent GETs share one request.
//!
//! ### The network is pluggable
//! The crate never talks HTTP itself. Implement [`Transport`] for your client
//! of choice; use [`MockTransport`] in tests.
//!
//! ## Module Tour
//!
//! - [`client`]: [`PotionClient`], fetch, de-duplication and the inbound decoder
//! - [`store`]: per-resource verbs (`fetch`, `query`, `save`, `update`, `destroy`)
//! - [`item`]: the live resource instance
//! - [`pagination`]: page-at-a-time query results
//! - [`registry`]: prefix to resource type mapping and URI resolution
//! - [`cache`]: identity cache implementations
//! - [`encode`] and [`naming`]: the outbound transform and key casing
//! - [`config`], [`error`], [`tracing`]: ambient configuration, errors and logging
//! - [`mock`]: an expectation-driven transport for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use potion_client::{ClientConfig, PotionClient, QueryOptions, ResourceOptions};
//!
//! let client = PotionClient::with_config(my_transport, ClientConfig::from_env());
//! client.register("/widget", "Widget", ResourceOptions::new().readonly(["createdAt"]));
//!
//! let widgets = client.store("/widget")?;
//! let widget = widgets.fetch(1, true).await?;
//! widget.set("name", "renamed");
//! widget.save().await?;
//!
//! let page = widgets.query(None, QueryOptions::paginated()).await?.into_page();
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod encode;
pub mod error;
pub mod item;
pub mod mock;
pub mod naming;
pub mod pagination;
pub mod registry;
pub mod store;
pub mod tracing;
pub mod transport;
pub mod value;

pub use cache::{BoundedCache, ItemCache, MemoryCache};
pub use client::{FetchOptions, Fetched, PotionClient};
pub use config::ClientConfig;
pub use error::{PotionError, TransportError};
pub use item::{Item, ItemRef};
pub use mock::MockTransport;
pub use pagination::Pagination;
pub use registry::{ParsedUri, Registry, Resource, ResourceOptions, ResourceType};
pub use store::{QueryOptions, Store};
pub use transport::{Method, RequestOptions, Response, Transport};
pub use value::{ItemId, PotionMap, PotionValue};
