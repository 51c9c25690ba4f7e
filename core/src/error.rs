//! Error types for the API client and the object collection.
//!
//! # Design
//! `ApiError` covers everything that can go wrong between building a request
//! and holding a decoded page: transport failures, unexpected statuses,
//! undecodable bodies and envelope-level error codes. `CollectionError` wraps
//! it verbatim and adds the lookup errors the collection raises on its own.

use thiserror::Error;

use crate::http::HttpMethod;

/// Errors produced by transports, `ApiClient` and repositories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a status other than the expected one.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response envelope carried a non-`ok` status code.
    #[error("API returned status `{0}`")]
    Status(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The request could not be sent or the response could not be read.
    #[error("transport failed: {0}")]
    Transport(String),

    /// A read-only transport refused a state-changing request.
    #[error("method {0} is not allowed by this transport")]
    MethodNotAllowed(HttpMethod),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors returned by `ObjectCollection` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// A page fetch failed; cached state was left untouched.
    #[error(transparent)]
    Repository(#[from] ApiError),

    /// No cached object has this identifier.
    #[error("object `{id}` is not loaded")]
    NotFound { id: String },

    /// The index is past the end of the current page.
    #[error("index {index} out of range for page of {len} objects")]
    IndexOutOfRange { index: usize, len: usize },

    /// Page numbers start at 1.
    #[error("invalid page number {0}, pages start at 1")]
    InvalidPage(u32),
}
