//! Error types for context inference.

use crate::geo::GeoError;
use sensemusic_events::PublishError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors from handling a single event or building the service.
///
/// None of these are fatal to a running service.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Location payload could not be turned into a `GeoPoint`.
    #[error("malformed location payload '{payload}': {source}")]
    MalformedLocation {
        payload: String,
        #[source]
        source: GeoError,
    },

    /// The context event could not be handed to the bus.
    #[error("failed to publish context event: {0}")]
    Publish(#[from] PublishError),

    #[error("invalid context configuration: {0}")]
    InvalidConfig(String),
}
