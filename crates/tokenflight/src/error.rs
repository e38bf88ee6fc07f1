//! Error types for the tokenflight library.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, protocol, storage and input validation errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for tokenflight operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (rejected login, failed renewal, repeated 401).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (unexpected status or body on a session endpoint).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Durable credential storage errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation errors (URL, header, request body).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns the terminal renewal error, if this error is one.
    pub fn renewal(&self) -> Option<&RenewalError> {
        match self {
            Error::Auth(AuthError::Renewal(err)) => Some(err),
            _ => None,
        }
    }

    /// Returns true if this error ended the session.
    pub fn is_session_terminal(&self) -> bool {
        self.renewal().is_some()
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Response body could not be read or decoded.
    #[error("body error: {message}")]
    Body { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            TransportError::Body {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login or registration was rejected by the server.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The access credential could not be renewed; the session is over.
    #[error("session terminated: {0}")]
    Renewal(#[from] RenewalError),

    /// A replayed request was rejected again after renewal.
    #[error("request rejected after renewal (HTTP {status})")]
    AlreadyRetried { status: u16 },
}

/// Terminal renewal outcome shared by every request waiting on one renewal.
///
/// Cloned once per waiter, so it only carries owned, cheap data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenewalError {
    /// No renewal credential was stored; no network call was made.
    #[error("no renewal credential available")]
    MissingRenewalCredential,

    /// The renewal endpoint refused the renewal credential.
    #[error("renewal rejected: HTTP {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// The renewal call did not finish within the configured bound.
    #[error("renewal timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The renewal call failed at the transport level.
    #[error("renewal transport failure: {message}")]
    Transport { message: String },

    /// The renewal endpoint answered 2xx with an unusable body.
    #[error("malformed renewal response: {message}")]
    MalformedResponse { message: String },

    /// The renewal task went away before reporting an outcome.
    #[error("renewal abandoned")]
    Abandoned,

    /// The session was ended or replaced while the renewal was in flight.
    #[error("session changed during renewal")]
    Superseded,
}

/// Protocol-level errors from session endpoint responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code from the body (if present).
    pub error: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }
}

/// Durable storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The stored document could not be parsed or serialized.
    #[error("invalid stored credentials in {path}: {message}")]
    Format { path: String, message: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Invalid header name or value.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Request body could not be serialized.
    #[error("invalid request body: {reason}")]
    Body { reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
