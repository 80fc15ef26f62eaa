//! Amazon Athena query service implementation.
//!
//! Provides the `AthenaClient` struct that implements the `QueryService` trait
//! using the AWS SDK. A query is started, polled until it reaches a terminal
//! state, then its results are paged in.

use super::{ColumnInfo, QueryRequest, QueryService, RawResultSet, ServiceError, TableInfo};
use crate::auth::Session;
use crate::config::AthenaConfig;
use async_trait::async_trait;
use aws_sdk_athena::config::retry::RetryConfig;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{
    QueryExecutionContext, QueryExecutionState, ResultConfiguration, ResultSet, StatementType,
};
use aws_sdk_athena::Client;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Athena query service client.
#[derive(Debug, Clone)]
pub struct AthenaClient {
    client: Client,
    workgroup: String,
    data_catalog: String,
    output_location: Option<String>,
    poll_interval: Duration,
    page_size: i32,
}

impl AthenaClient {
    /// Creates a client that signs requests with `session`'s credentials.
    ///
    /// SDK-level retries are disabled: a failed call is surfaced immediately.
    pub fn new(session: &Session, config: &AthenaConfig) -> Self {
        let sdk_config = session.sdk_config();
        let mut builder = aws_sdk_athena::config::Builder::from(&sdk_config)
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_client(Client::from_conf(builder.build()), config)
    }

    /// Wraps an existing SDK client.
    pub fn from_client(client: Client, config: &AthenaConfig) -> Self {
        Self {
            client,
            workgroup: config.workgroup.clone(),
            data_catalog: config.data_catalog.clone(),
            output_location: config.output_location.clone(),
            poll_interval: config.poll_interval(),
            page_size: config.page_size,
        }
    }

    async fn start(&self, request: QueryRequest<'_>) -> Result<String, ServiceError> {
        let context = QueryExecutionContext::builder()
            .database(request.catalog)
            .catalog(&self.data_catalog)
            .build();

        let mut start = self
            .client
            .start_query_execution()
            .query_string(request.sql)
            .query_execution_context(context)
            .work_group(&self.workgroup);

        if !request.parameters.is_empty() {
            start = start.set_execution_parameters(Some(request.parameters.to_vec()));
        }
        if let Some(location) = &self.output_location {
            start = start.result_configuration(
                ResultConfiguration::builder()
                    .output_location(location)
                    .build(),
            );
        }

        let output = start
            .send()
            .await
            .map_err(|e| ServiceError::request("StartQueryExecution", sdk_message(&e)))?;

        output
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::malformed("StartQueryExecution", "missing query execution id")
            })
    }

    /// Polls until the execution succeeds, fails or is cancelled.
    ///
    /// Returns whether the results open with a header row, which Athena only
    /// emits for DML statements.
    async fn wait_for_completion(&self, query_execution_id: &str) -> Result<bool, ServiceError> {
        loop {
            let output = self
                .client
                .get_query_execution()
                .query_execution_id(query_execution_id)
                .send()
                .await
                .map_err(|e| ServiceError::request("GetQueryExecution", sdk_message(&e)))?;

            let execution = output.query_execution();
            let status = execution.and_then(|qe| qe.status());
            match status.and_then(|s| s.state()) {
                Some(QueryExecutionState::Succeeded) => {
                    let statement_type = execution.and_then(|qe| qe.statement_type());
                    return Ok(matches!(statement_type, Some(StatementType::Dml)));
                }
                Some(state @ (QueryExecutionState::Failed | QueryExecutionState::Cancelled)) => {
                    let reason = status
                        .and_then(|s| s.state_change_reason())
                        .or_else(|| {
                            status
                                .and_then(|s| s.athena_error())
                                .and_then(|e| e.error_message())
                        })
                        .unwrap_or("no reason given");
                    return Err(ServiceError::Execution {
                        query_execution_id: query_execution_id.to_string(),
                        state: state.as_str().to_string(),
                        reason: reason.to_string(),
                    });
                }
                Some(state @ (QueryExecutionState::Queued | QueryExecutionState::Running)) => {
                    trace!(query_execution_id, state = state.as_str(), "Query still running");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Some(other) => {
                    return Err(ServiceError::malformed(
                        "GetQueryExecution",
                        format!("unrecognised execution state '{}'", other.as_str()),
                    ));
                }
                None => {
                    return Err(ServiceError::malformed(
                        "GetQueryExecution",
                        "missing execution status",
                    ));
                }
            }
        }
    }

    async fn fetch_results(
        &self,
        query_execution_id: &str,
        has_header: bool,
    ) -> Result<RawResultSet, ServiceError> {
        let mut columns = Vec::new();
        let mut rows = Vec::new();
        let mut next_token: Option<String> = None;
        let mut first_page = true;

        loop {
            let output = self
                .client
                .get_query_results()
                .query_execution_id(query_execution_id)
                .max_results(self.page_size)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| ServiceError::request("GetQueryResults", sdk_message(&e)))?;

            if let Some(result_set) = output.result_set() {
                if first_page {
                    columns = column_info(result_set);
                }
                let page = page_rows(result_set);
                let skip =
                    usize::from(first_page && has_header && is_header_row(page.first(), &columns));
                rows.extend(page.into_iter().skip(skip));
            }
            first_page = false;

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(RawResultSet {
            columns,
            rows,
            query_execution_id: Some(query_execution_id.to_string()),
        })
    }
}

#[async_trait]
impl QueryService for AthenaClient {
    async fn run_query(&self, request: QueryRequest<'_>) -> Result<RawResultSet, ServiceError> {
        let query_execution_id = self.start(request).await?;
        info!(
            %query_execution_id,
            catalog = request.catalog,
            workgroup = %self.workgroup,
            "Query submitted"
        );

        let has_header = self.wait_for_completion(&query_execution_id).await?;
        let result = self.fetch_results(&query_execution_id, has_header).await?;

        debug!(
            %query_execution_id,
            rows = result.rows.len(),
            "Query results fetched"
        );
        Ok(result)
    }

    async fn list_databases(&self) -> Result<Vec<String>, ServiceError> {
        let mut databases = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_databases()
                .catalog_name(&self.data_catalog)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| ServiceError::request("ListDatabases", sdk_message(&e)))?;

            databases.extend(output.database_list().iter().map(|d| d.name().to_string()));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(databases)
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>, ServiceError> {
        let mut tables = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_table_metadata()
                .catalog_name(&self.data_catalog)
                .database_name(database)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| ServiceError::request("ListTableMetadata", sdk_message(&e)))?;

            tables.extend(output.table_metadata_list().iter().map(|t| TableInfo {
                name: t.name().to_string(),
                table_type: t.table_type().map(str::to_string),
                columns: t
                    .columns()
                    .iter()
                    .map(|c| ColumnInfo::new(c.name(), c.r#type().unwrap_or_default()))
                    .collect(),
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(tables)
    }
}

/// Renders an SDK error with its full source chain.
fn sdk_message<E>(error: &E) -> String
where
    E: std::error::Error,
{
    DisplayErrorContext(error).to_string()
}

fn column_info(result_set: &ResultSet) -> Vec<ColumnInfo> {
    result_set
        .result_set_metadata()
        .map(|metadata| {
            metadata
                .column_info()
                .iter()
                .map(|c| ColumnInfo::new(c.name(), c.r#type()))
                .collect()
        })
        .unwrap_or_default()
}

fn page_rows(result_set: &ResultSet) -> Vec<Vec<Option<String>>> {
    result_set
        .rows()
        .iter()
        .map(|row| {
            row.data()
                .iter()
                .map(|datum| datum.var_char_value().map(str::to_string))
                .collect()
        })
        .collect()
}

/// Athena repeats the column labels as the first row of a DML statement's
/// first page.
fn is_header_row(row: Option<&Vec<Option<String>>>, columns: &[ColumnInfo]) -> bool {
    match row {
        Some(row) if !columns.is_empty() && row.len() == columns.len() => row
            .iter()
            .zip(columns)
            .all(|(cell, column)| cell.as_deref() == Some(column.name.as_str())),
        _ => false,
    }
}
