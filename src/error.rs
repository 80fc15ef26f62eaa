//! Error types for the gateway.
//!
//! The core surfaces exactly two kinds of failure: [`CredentialError`] when no
//! usable authentication is available, and [`QueryError`] for anything that
//! goes wrong while validating or running a query. [`GatewayError`] wraps both
//! for the binary, alongside configuration and internal failures.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed error carried as the cause of a [`QueryError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// No usable credentials could be found or built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Credential error: {message}")]
pub struct CredentialError {
    message: String,
}

impl CredentialError {
    /// Creates a credential error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }

    /// Neither the environment nor the caller supplied credentials.
    pub fn exhausted() -> Self {
        Self::new("no usable credentials in environment and no fallback provided")
    }

    /// Returns the human-readable cause.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Distinguishes caller mistakes from failures reported by the query service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The request was rejected before submission (empty SQL, bad bindings).
    InvalidInput,
    /// Submission, execution or result retrieval failed remotely.
    Remote,
}

/// A failure while validating or executing a query.
///
/// The original diagnostic is kept as `cause` so nothing is lost on the way
/// to the caller.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct QueryError {
    kind: QueryErrorKind,
    message: String,
    #[source]
    cause: Option<BoxError>,
}

impl QueryError {
    /// Creates an input validation error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self {
            kind: QueryErrorKind::InvalidInput,
            message: msg.into(),
            cause: None,
        }
    }

    /// Creates a remote error wrapping the underlying failure.
    pub fn remote(msg: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            kind: QueryErrorKind::Remote,
            message: msg.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn kind(&self) -> QueryErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the underlying error, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Renders the message followed by every error in the cause chain.
    pub fn detail(&self) -> String {
        let mut out = self.message.clone();
        let mut next: Option<&(dyn StdError + 'static)> =
            self.cause.as_deref().map(|c| c as &(dyn StdError + 'static));
        while let Some(err) = next {
            out.push_str(": ");
            out.push_str(&err.to_string());
            next = err.source();
        }
        out
    }
}

/// Main error type for the gateway binary.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No usable AWS credentials.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Query validation or execution failed.
    #[error("Query error: {}", .0.detail())]
    Query(#[from] QueryError),

    /// Configuration errors (invalid config file, bad CLI values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (bind failures, unexpected states, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Credential(_) => "Credential Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid input"),
            Self::Remote => write!(f, "remote failure"),
        }
    }
}

/// Result type alias using GatewayError.
pub type Result<T> = std::result::Result<T, GatewayError>;
