//! Error types for the pet store client.
//!
//! # Design
//! Errors split along the moment they happen. `MissingParameter`,
//! `InvalidAuthentication`, `UnknownCollectionFormat` and `Serialization` are
//! raised synchronously while a request is being assembled, before any I/O.
//! Everything the network produces is wrapped, unmodified, in
//! `TransportError`. Malformed response bodies are not errors: coercion is
//! best-effort.

use thiserror::Error;

/// Errors returned by the client and its service operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required argument of a service operation was absent.
    #[error("missing the required parameter '{param}' when calling {operation}")]
    MissingParameter {
        param: &'static str,
        operation: &'static str,
    },

    /// Authentication data could not be mapped to a known scheme.
    #[error("invalid authentication: {0}")]
    InvalidAuthentication(String),

    /// An array-serialization strategy name was not recognized.
    #[error("unknown collection format: {0}")]
    UnknownCollectionFormat(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The transport failed or the server answered with a non-2xx status.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures surfaced by a [`Transport`](crate::http::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection, protocol or I/O failure.
    #[error("network error: {0}")]
    Network(String),

    /// The configured timeout elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    /// Returns the HTTP status code if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(_) | Self::Timeout => None,
        }
    }

    /// True when the server answered 404 (no such pet).
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl ApiError {
    /// Returns the transport failure behind this error, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}
