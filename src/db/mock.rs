//! In-memory query services for testing.
//!
//! [`MockQueryService`] answers from fixtures and records every submission;
//! [`FailingQueryService`] fails every call with a fixed message.

use super::{QueryRequest, QueryService, RawResultSet, ServiceError, TableInfo};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A query as the mock service received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedQuery {
    pub sql: String,
    pub parameters: Vec<String>,
    pub catalog: String,
}

/// A query service that returns predefined results.
#[derive(Default)]
pub struct MockQueryService {
    fixtures: Vec<(String, RawResultSet)>,
    databases: Vec<String>,
    tables: HashMap<String, Vec<TableInfo>>,
    latency: Option<Duration>,
    submitted: Mutex<Vec<SubmittedQuery>>,
}

impl MockQueryService {
    /// Creates a mock with no fixtures; every query returns zero rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `result` for any query whose SQL contains `sql_fragment`.
    ///
    /// Fixtures are tried in registration order.
    pub fn with_result(mut self, sql_fragment: impl Into<String>, result: RawResultSet) -> Self {
        self.fixtures.push((sql_fragment.into(), result));
        self
    }

    pub fn with_databases<I, S>(mut self, databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.databases = databases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tables(mut self, database: impl Into<String>, tables: Vec<TableInfo>) -> Self {
        self.tables.insert(database.into(), tables);
        self
    }

    /// Delays every query, to simulate remote execution time.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns every query received so far, in arrival order.
    pub fn submitted(&self) -> Vec<SubmittedQuery> {
        self.submitted
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn run_query(&self, request: QueryRequest<'_>) -> Result<RawResultSet, ServiceError> {
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(SubmittedQuery {
                sql: request.sql.to_string(),
                parameters: request.parameters.to_vec(),
                catalog: request.catalog.to_string(),
            });
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        Ok(self
            .fixtures
            .iter()
            .find(|(fragment, _)| request.sql.contains(fragment.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_default())
    }

    async fn list_databases(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.databases.clone())
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>, ServiceError> {
        self.tables.get(database).cloned().ok_or_else(|| {
            ServiceError::request(
                "ListTableMetadata",
                format!("MetadataException: Database {database} not found."),
            )
        })
    }
}

/// A query service whose every call fails with the same message.
pub struct FailingQueryService {
    message: String,
}

impl FailingQueryService {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl QueryService for FailingQueryService {
    async fn run_query(&self, _request: QueryRequest<'_>) -> Result<RawResultSet, ServiceError> {
        Err(ServiceError::request("StartQueryExecution", self.message.clone()))
    }

    async fn list_databases(&self) -> Result<Vec<String>, ServiceError> {
        Err(ServiceError::request("ListDatabases", self.message.clone()))
    }

    async fn list_tables(&self, _database: &str) -> Result<Vec<TableInfo>, ServiceError> {
        Err(ServiceError::request("ListTableMetadata", self.message.clone()))
    }
}
