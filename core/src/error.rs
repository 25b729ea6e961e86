//! Error types for the list store client.
//!
//! # Design
//! Two layers. `ApiError` describes what went wrong on the wire and is what
//! `ListClient::parse_*` returns. `StoreError` is the gateway's taxonomy:
//! it records whether a read or a write failed and lifts `412 Precondition
//! Failed` into a dedicated concurrency conflict. `NotFound` keeps its own
//! wire variant because callers distinguish "no such item" from "the server
//! misbehaved".

use thiserror::Error;

/// Errors returned by `ListClient` parse methods and transports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404: the list or item does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned 412: the `If-Match` tag no longer matches.
    #[error("precondition failed: the item has changed or no longer exists")]
    PreconditionFailed,

    /// The server returned any other non-success status.
    #[error("HTTP {status}: {message}")]
    HttpError { status: u16, message: String },

    /// A read with metadata came back without a version tag.
    #[error("response carried no version tag")]
    MissingVersionTag,

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The round-trip itself failed (connection, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias for gateway operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by `ListItemGateway` and the composite flows.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A read against the store failed.
    #[error("{0}")]
    Query(#[source] ApiError),

    /// A create, update or delete failed for a reason other than a stale tag.
    #[error("{0}")]
    Write(#[source] ApiError),

    /// The store rejected a write because the version tag was stale.
    #[error("item {id} was changed by someone else; reload and try again")]
    ConcurrencyConflict { id: u64 },

    /// A composite flow found nothing to act on.
    #[error("No items found in the list")]
    EmptyList,
}

impl StoreError {
    /// Classify a failed write, lifting a stale tag into `ConcurrencyConflict`.
    pub(crate) fn from_write(id: u64, err: ApiError) -> Self {
        match err {
            ApiError::PreconditionFailed => StoreError::ConcurrencyConflict { id },
            other => StoreError::Write(other),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Errors raised while loading `StoreConfig` from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}
