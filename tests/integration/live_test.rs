//! Live tests against Amazon Athena.
//!
//! These use the ambient AWS credentials and need ATHENA_TEST_DATABASE set to
//! an existing catalog database.

use athena_gateway::auth::resolve_session;
use athena_gateway::config::Config;
use athena_gateway::db::Value;
use athena_gateway::query::{QueryExecutor, Statement};

/// Helper to build an executor from the environment.
fn get_test_executor() -> Option<(QueryExecutor, String)> {
    let database = std::env::var("ATHENA_TEST_DATABASE").ok()?;
    let mut config = Config::default();
    config.apply_env_overrides();
    let session = resolve_session(None, &config.aws.region).ok()?;
    Some((QueryExecutor::for_session(&session, &config.athena), database))
}

#[tokio::test]
async fn test_live_select_literal() {
    let Some((executor, database)) = get_test_executor() else {
        eprintln!("Skipping test: ATHENA_TEST_DATABASE not set");
        return;
    };

    let result = executor
        .execute_query("SELECT 1 AS one, 'hello' AS greeting", &database)
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.records[0]["one"], Value::Int(1));
    assert_eq!(result.records[0]["greeting"], Value::from("hello"));
}

#[tokio::test]
async fn test_live_bound_parameter() {
    let Some((executor, database)) = get_test_executor() else {
        eprintln!("Skipping test: ATHENA_TEST_DATABASE not set");
        return;
    };

    let statement = Statement::new("SELECT CAST(? AS bigint) + 1 AS next").bind(41i64);
    let result = executor
        .execute_statement(&statement, &database)
        .await
        .unwrap();

    assert_eq!(result.records[0]["next"], Value::Int(42));
}
