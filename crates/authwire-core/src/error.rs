//! Error types for authwire.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, protocol, storage and input validation errors.
//! [`Error::kind`] collapses them into the flat taxonomy callers branch on.

use std::fmt;
use thiserror::Error;

/// The unified error type for authwire operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("network error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (rejected credentials, failed renewal).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Non-success HTTP responses from the API.
    #[error("API error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (bad URL, malformed body).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Durable token storage errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The caller cancelled the request before it completed.
    #[error("request cancelled")]
    Cancelled,
}

/// Flat classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transient transport failure; never retried by this layer.
    Network,
    /// The server rejected the access token as stale or invalid.
    AuthExpired,
    /// Renewal failed; the session is over.
    RefreshFailed,
    /// Sign-in or sign-up was rejected.
    InvalidCredentials,
    /// 4xx response that is not an authentication failure.
    Validation,
    /// 5xx response.
    Server,
    /// Local input could not be used.
    InvalidInput,
    /// Token persistence failed.
    Storage,
    /// The request was cancelled.
    Cancelled,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Network,
            Error::Auth(AuthError::InvalidCredentials(_)) => ErrorKind::InvalidCredentials,
            Error::Auth(AuthError::RefreshFailed { .. }) => ErrorKind::RefreshFailed,
            Error::Protocol(err) if err.is_auth_error() => ErrorKind::AuthExpired,
            Error::Protocol(err) if err.is_server_error() => ErrorKind::Server,
            Error::Protocol(_) => ErrorKind::Validation,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Storage(_) => ErrorKind::Storage,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns true if this error means the access token was rejected.
    pub fn is_auth_expired(&self) -> bool {
        self.kind() == ErrorKind::AuthExpired
    }

    /// Returns the HTTP status for protocol errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Protocol(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Response body could not be read or decoded.
    #[error("malformed response: {message}")]
    Body { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Sign-in or sign-up was rejected, with a human-readable reason.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The refresh token could not be exchanged for a new pair.
    #[error("session expired: {reason}")]
    RefreshFailed { reason: String },
}

impl AuthError {
    /// Shorthand for a [`AuthError::RefreshFailed`] with the given reason.
    pub fn refresh_failed(reason: impl Into<String>) -> Self {
        AuthError::RefreshFailed {
            reason: reason.into(),
        }
    }
}

/// A non-success response from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable error code (if present).
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

    /// Check if this is an authentication error (stale or invalid token).
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
            || matches!(
                self.error.as_deref(),
                Some("ExpiredToken" | "InvalidToken" | "TokenExpired")
            )
    }

    /// Check if this is a 5xx response.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Best human-readable description: the server message, then the error
    /// code, then the bare status.
    pub fn reason(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Invalid request path.
    #[error("invalid request path '{value}': {reason}")]
    Path { value: String, reason: String },

    /// Invalid header name or value.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Durable storage errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Reading or writing the backing store failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The stored data could not be decoded.
    #[error("corrupt token file {path}: {message}")]
    Corrupt { path: String, message: String },
}
