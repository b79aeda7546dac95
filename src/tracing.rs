//! # Observability & Tracing
//!
//! The client logs through the `tracing` crate. Client, store, item and
//! pagination operations open `#[instrument]` spans carrying the resource
//! name and URI, so nested requests (a `$ref` resolved while decoding a
//! query, say) show up under the operation that caused them.
//!
//! ## Levels
//!
//! - `info`: registrations and successful mutations (`Created`, `Updated`, `Deleted`)
//! - `debug`: outgoing requests, cache hits, joined in-flight requests, decoded resources
//! - `warn`: transport failures, unknown resource URIs, re-registered prefixes
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo test
//! RUST_LOG=potion_client=debug cargo test -- --nocapture
//! ```
//!
//! With `RUST_LOG=debug` a cached query looks like:
//!
//! ```text
//! DEBUG query{resource=Widget}: Sending request search=Some({"ownerId": Number(5)})
//! DEBUG query{resource=Widget}:fetch{uri="/widget" method=GET}: Sending request uri=/api/widget method=GET
//! DEBUG query{resource=Widget}:fetch{uri="/widget" method=GET}: Decoded resource uri=/widget/1 resource=Widget
//! ```

/// Installs a compact subscriber filtered by `RUST_LOG`.
///
/// Call once at start-up. Panics if a global subscriber is already set.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // resource and uri fields identify the source
        .compact()
        .init();
}
