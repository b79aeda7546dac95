//! # Client Errors
//!
//! Every failure surfaces as a [`PotionError`]. The type is `Clone` because a
//! single de-duplicated GET hands its outcome to every caller waiting on it.

use thiserror::Error;

/// Errors returned by client, store, item and pagination operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PotionError {
    /// The URI does not belong to any registered resource.
    #[error("Unknown resource URI: {0}")]
    UnknownResource(String),

    /// The transport failed. The message is already normalized.
    #[error("Request to {uri} failed: {message}")]
    Request { uri: String, message: String },

    /// The response decoded to something other than what the caller needs.
    #[error("Unexpected response from {uri}: expected {expected}")]
    UnexpectedResponse { uri: String, expected: &'static str },

    /// The client that owns this resource type has been dropped.
    #[error("Client closed")]
    ClientClosed,

    /// The item has no URI yet, so it cannot be addressed on the server.
    #[error("{0} has not been saved")]
    Unsaved(String),

    /// A property could not be converted to the requested type.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for PotionError {
    fn from(e: serde_json::Error) -> Self {
        PotionError::Json(e.to_string())
    }
}

/// Errors a [`Transport`](crate::transport::Transport) may report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// A failure carrying an explicit message.
    #[error("{0}")]
    Message(String),

    /// A raw string payload from the server or network layer.
    #[error("{0}")]
    Raw(String),

    /// A non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A failure with no usable detail.
    #[error("transport failure")]
    Other,
}

impl TransportError {
    /// Reduces the error to a human-readable message for `uri`.
    ///
    /// Prefers the explicit message, then the raw payload, then a generic
    /// per-URI fallback.
    pub fn normalize(&self, uri: &str) -> String {
        let detail = match self {
            TransportError::Message(m) => m.as_str(),
            TransportError::Raw(s) => s.as_str(),
            TransportError::Http { message, .. } => message.as_str(),
            TransportError::Other => "",
        };
        if detail.is_empty() {
            format!("could not retrieve resource from {}", uri)
        } else {
            detail.to_string()
        }
    }
}
