//! Error types for keyseal.
//!
//! Every variant is a distinct way a filtered call can abort. None of them
//! carry salt values or other envelope material in their messages.

use std::num::ParseIntError;

use thiserror::Error;

/// The single error type for all keyseal operations.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A numeric envelope parameter was present in the query but was not an
    /// integer. Absence is defaulted; malformed presence is not.
    #[error("malformed query parameter {name}: {value:?}")]
    MalformedParameter {
        name: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// The system's random number generator failed to produce salt bytes.
    #[error("randomness source failed")]
    RandomnessFailure,

    /// The terminal handler failed. Passed through the chain unchanged.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A URI was built from a path that is not a bare absolute path.
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    /// A raw query string could not be decoded.
    #[error("invalid query string: {0}")]
    InvalidQueryString(String),

    /// The result payload did not have the shape the resource kind implies.
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),

    /// Configuration failed to parse or validate.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FilterError {
    /// Wrap any transport-layer error so it can travel back up the chain.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Transport(err.into())
    }
}
