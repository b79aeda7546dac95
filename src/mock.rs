//! # Mock Transport
//!
//! An in-memory [`Transport`] for testing clients, stores and items without a
//! server.
//!
//! Expectations are queued with a fluent builder and consumed in order. Each
//! request takes the first queued expectation with the same method and URI.
//!
//! ```rust,ignore
//! let mock = MockTransport::new();
//! mock.expect(Method::Get, "/api/widget/1")
//!     .return_ok(json!({"$uri": "/api/widget/1", "name": "one"}));
//! mock.expect(Method::Get, "/api/widget")
//!     .with_total_count(101)
//!     .return_ok(json!([]));
//!
//! let client = PotionClient::with_config(mock.clone(), config);
//! // exercise the client...
//! mock.verify(); // every expectation was consumed
//! ```
//!
//! The mock yields to the scheduler once before answering, so requests
//! started together with `tokio::join!` are all in flight before any settles.

use crate::error::TransportError;
use crate::transport::{Method, RequestOptions, Response, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// A queued request and the outcome to hand back for it.
struct Expectation {
    method: Method,
    uri: String,
    response: Result<Response, TransportError>,
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub uri: String,
    pub options: RequestOptions,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    calls: Vec<RecordedCall>,
}

/// A transport that answers from queued expectations.
///
/// Clones share the same queue and call log.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a request with `method` to `uri` (the full, prefixed URI).
    pub fn expect(&self, method: Method, uri: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            state: self.state.clone(),
        }
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.expectations.is_empty() {
            let remaining: Vec<_> = state
                .expectations
                .iter()
                .map(|e| format!("{} {}", e.method, e.uri))
                .collect();
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                remaining.len(),
                remaining
            );
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, uri: &str, options: RequestOptions) -> Result<Response, TransportError> {
        let method = options.method;
        self.state.lock().calls.push(RecordedCall {
            uri: uri.to_string(),
            options,
        });

        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        let position = state
            .expectations
            .iter()
            .position(|e| e.method == method && e.uri == uri);
        match position.and_then(|i| state.expectations.remove(i)) {
            Some(expectation) => expectation.response,
            None => Err(TransportError::Message(format!(
                "unexpected request {} {}",
                method, uri
            ))),
        }
    }
}

/// Builder for one expectation.
pub struct ExpectationBuilder {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    state: Arc<Mutex<MockState>>,
}

impl ExpectationBuilder {
    /// Adds an `x-total-count` header to the response.
    pub fn with_total_count(self, total: usize) -> Self {
        self.with_header("x-total-count", total.to_string())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, data: Value) {
        let response = self
            .headers
            .iter()
            .fold(Response::new(data), |r, (k, v)| r.with_header(k.clone(), v.clone()));
        self.push(Ok(response));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: TransportError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Response, TransportError>) {
        self.state.lock().expectations.push_back(Expectation {
            method: self.method,
            uri: self.uri,
            response,
        });
    }
}
