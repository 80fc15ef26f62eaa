//! Query execution with uniform error translation.
//!
//! Provides isolated query execution that can be tested independently of the
//! HTTP layer. Every failure leaves here as a [`QueryError`] carrying the
//! original diagnostic.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::normalize::normalize;
use super::Statement;
use crate::auth::Session;
use crate::config::AthenaConfig;
use crate::db::{AthenaClient, QueryRequest, QueryResult, QueryService, TableInfo};
use crate::error::QueryError;

/// Runs queries against a query service bound to one session.
///
/// Holds no mutable state; clones share the same service and may run
/// queries concurrently.
#[derive(Clone)]
pub struct QueryExecutor {
    service: Arc<dyn QueryService>,
}

impl QueryExecutor {
    /// Creates an executor over an arbitrary query service.
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self { service }
    }

    /// Creates an executor that runs on Athena with `session`'s credentials.
    pub fn for_session(session: &Session, config: &AthenaConfig) -> Self {
        Self::new(Arc::new(AthenaClient::new(session, config)))
    }

    /// Executes `sql` exactly as given against `catalog`.
    ///
    /// No escaping or rewriting happens here; callers interpolating untrusted
    /// input should use [`QueryExecutor::execute_statement`] instead.
    pub async fn execute_query(
        &self,
        sql: &str,
        catalog: &str,
    ) -> Result<QueryResult, QueryError> {
        validate_inputs(sql, catalog)?;
        self.submit(sql, &[], catalog).await
    }

    /// Executes a parameterized statement against `catalog`.
    ///
    /// The statement is validated before anything is sent: placeholders and
    /// bound values must match one to one.
    pub async fn execute_statement(
        &self,
        statement: &Statement,
        catalog: &str,
    ) -> Result<QueryResult, QueryError> {
        validate_inputs(statement.sql(), catalog)?;
        statement.validate()?;
        let parameters = statement.rendered_parameters();
        self.submit(statement.sql(), &parameters, catalog).await
    }

    /// Lists databases in the data catalog.
    pub async fn list_databases(&self) -> Result<Vec<String>, QueryError> {
        self.service.list_databases().await.map_err(|e| {
            warn!(error = %e, "Listing databases failed");
            QueryError::remote("failed to list databases", e)
        })
    }

    /// Lists tables in a catalog database.
    pub async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>, QueryError> {
        if database.trim().is_empty() {
            return Err(QueryError::invalid("empty catalog"));
        }
        self.service.list_tables(database).await.map_err(|e| {
            warn!(database, error = %e, "Listing tables failed");
            QueryError::remote(format!("failed to list tables in '{database}'"), e)
        })
    }

    async fn submit(
        &self,
        sql: &str,
        parameters: &[String],
        catalog: &str,
    ) -> Result<QueryResult, QueryError> {
        debug!(catalog, parameters = parameters.len(), "Submitting query");
        let start = Instant::now();

        let request = QueryRequest {
            sql,
            parameters,
            catalog,
        };
        let raw = self.service.run_query(request).await.map_err(|e| {
            warn!(catalog, error = %e, "Query failed");
            QueryError::remote(format!("query against '{catalog}' failed"), e)
        })?;

        let result = normalize(raw).with_execution_time(start.elapsed());
        debug!(
            catalog,
            rows = result.len(),
            elapsed_ms = result.execution_time.as_millis() as u64,
            "Query completed"
        );
        Ok(result)
    }
}

fn validate_inputs(sql: &str, catalog: &str) -> Result<(), QueryError> {
    if sql.trim().is_empty() {
        return Err(QueryError::invalid("empty query"));
    }
    if catalog.trim().is_empty() {
        return Err(QueryError::invalid("empty catalog"));
    }
    Ok(())
}
