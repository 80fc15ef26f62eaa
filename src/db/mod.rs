//! Query service abstraction layer.
//!
//! Provides a trait-based interface to the remote query service, so the
//! executor can run against Athena in production and against in-memory
//! doubles in tests.

mod athena;
mod mock;
mod types;

pub use athena::AthenaClient;
pub use mock::{FailingQueryService, MockQueryService, SubmittedQuery};
pub use types::{
    ColumnInfo, QueryResult, RawResultSet, Record, TableInfo, Value, TIMESTAMP_FORMAT,
};

use async_trait::async_trait;
use thiserror::Error;

/// A query as it is handed to the service.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    /// SQL text, submitted verbatim.
    pub sql: &'a str,
    /// Bound values already rendered as SQL literals, one per `?` placeholder.
    pub parameters: &'a [String],
    /// Catalog database the query is scoped to.
    pub catalog: &'a str,
}

/// Failures reported by a query service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service call itself failed (network, auth, validation, throttling).
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    /// The query was accepted but did not succeed.
    #[error("query {query_execution_id} {state}: {reason}")]
    Execution {
        query_execution_id: String,
        state: String,
        reason: String,
    },

    /// The service answered with something we could not interpret.
    #[error("malformed {operation} response: {message}")]
    Malformed {
        operation: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn request(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            operation,
            message: message.into(),
        }
    }

    pub fn malformed(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            operation,
            message: message.into(),
        }
    }
}

/// Trait defining the interface to the remote query service.
///
/// Implementations hold no per-request state and may be called concurrently.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Runs a query to completion and returns its full result set.
    async fn run_query(&self, request: QueryRequest<'_>) -> Result<RawResultSet, ServiceError>;

    /// Lists databases in the data catalog.
    async fn list_databases(&self) -> Result<Vec<String>, ServiceError>;

    /// Lists tables in a catalog database.
    async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>, ServiceError>;
}
