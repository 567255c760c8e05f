//! Error types for the index API transport layer.
//!
//! # Design
//! Status-derived errors (`NotFound`, `AlreadyExists`, `Http`) are separate
//! variants so callers can branch on what the service said without parsing
//! messages. Transport failures are carried as boxed errors so whichever
//! `Transport` produced them surfaces its own error unmodified.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the request builder, transports and response interpreter.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body could not be encoded as JSON. Nothing was sent.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Connection, DNS, TLS, proxy or timeout failure, or a failed body read.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server returned 404.
    #[error("index does not exist")]
    NotFound,

    /// The server returned 204 where content was expected.
    #[error("index already exists (status {status})")]
    AlreadyExists { status: u16 },

    /// Any other status >= 400.
    #[error("HTTP response {status}")]
    Http { status: u16, body: String },

    /// The response body is not valid JSON.
    #[error("failed to decode response body: {0}")]
    Decode(String),

    /// The response body is valid JSON but not an object.
    #[error("expected a JSON object in response body, found {found}")]
    UnexpectedShape { found: &'static str },

    #[error("unsupported HTTP method: {0}")]
    InvalidMethod(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ApiError::Transport(Box::new(err))
    }

    /// The HTTP status code behind this error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::AlreadyExists { status } | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
