//! Core error types.

use thiserror::Error;

use crate::value::ItemId;

/// Failure reported by a [`SchemaGateway`](crate::gateway::SchemaGateway).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// The requested collection, item, or junction row does not exist.
    #[error("not found")]
    NotFound,

    /// The backing store could not be reached or answered with a failure.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The store answered with a payload that could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Core preview errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Field metadata (or relations) for a collection could not be loaded.
    #[error("unable to retrieve field information for collection {collection}: {source}")]
    SchemaFetch {
        collection: String,
        #[source]
        source: GatewayError,
    },

    /// A persisted related item could not be loaded.
    #[error("unable to retrieve item {id} in collection {collection}: {source}")]
    ItemFetch {
        collection: String,
        id: ItemId,
        #[source]
        source: GatewayError,
    },

    /// A junction row id could not be resolved to a related item id.
    #[error("unable to resolve junction row {id} in collection {junction}: {reason}")]
    JunctionResolution {
        junction: String,
        id: ItemId,
        reason: String,
    },

    /// A draft delta entry could not be applied.
    #[error("invalid delta for field {field}: {reason}")]
    InvalidDelta { field: String, reason: String },

    /// The pass was cancelled through its [`CancelToken`](crate::cancel::CancelToken).
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for preview operations.
pub type Result<T> = std::result::Result<T, Error>;
