//! The Potion core client.
//!
//! - [`PotionClient`]: registration, URI resolution and [`fetch`](PotionClient::fetch),
//!   the single entry point for network-backed operations.
//! - [`decode`]: the inbound transform from wire JSON to linked [`Item`](crate::item::Item)s.
//!
//! Outbound encoding lives in [`crate::encode`].

pub mod core;
pub mod decode;

pub use self::core::*;
