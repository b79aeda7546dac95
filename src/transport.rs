//! # Transport
//!
//! The network is supplied by the embedding application through the
//! [`Transport`] trait. The client hands it a full URI plus already
//! wire-encoded options and expects the raw response body and headers back.
//! HTTP, an in-memory stub or anything else satisfying the contract works;
//! see [`MockTransport`](crate::mock::MockTransport) for the test double.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// HTTP verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options passed to the transport. `search` and `data` are wire JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub search: Option<Value>,
    pub data: Option<Value>,
    pub cache: bool,
}

/// A raw transport response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub data: Value,
    pub headers: HashMap<String, String>,
}

impl Response {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The async request function supplied by the application.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, uri: &str, options: RequestOptions) -> Result<Response, TransportError>;
}
