//! Query execution through the public API.

use athena_gateway::db::{MockQueryService, RawResultSet, Value};
use athena_gateway::error::QueryErrorKind;
use athena_gateway::query::{QueryExecutor, Statement};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn coa_fixture() -> RawResultSet {
    RawResultSet::from_cells(
        &[
            ("bin_num", "bigint"),
            ("coa_number", "varchar"),
            ("coa_file_link", "varchar"),
        ],
        &[
            &[Some("1000123"), Some("COA-1"), Some("https://docs/1.pdf")],
            &[Some("1000123"), Some("COA-2"), None],
        ],
    )
}

#[tokio::test]
async fn test_concurrent_queries_share_one_executor() {
    let service = Arc::new(
        MockQueryService::new()
            .with_result("coa_docs", coa_fixture())
            .with_latency(Duration::from_millis(200)),
    );
    let executor = QueryExecutor::new(service.clone());

    let start = Instant::now();
    let results = join_all((0..8).map(|_| {
        let executor = executor.clone();
        async move {
            executor
                .execute_query("SELECT * FROM coa_docs WHERE bin_num = 1000123", "dob_bis")
                .await
        }
    }))
    .await;

    // Eight sequential runs would take 1.6s
    assert!(start.elapsed() < Duration::from_millis(1200));
    assert_eq!(service.submitted().len(), 8);
    for result in results {
        let result = result.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.records[1]["coa_file_link"], Value::Null);
    }
}

#[tokio::test]
async fn test_parameterized_lookup() {
    let service = Arc::new(MockQueryService::new().with_result("coa_docs", coa_fixture()));
    let executor = QueryExecutor::new(service.clone());

    let statement =
        Statement::new("SELECT bin_num, coa_number, coa_file_link FROM coa_docs WHERE bin_num = ?")
            .bind(1000123i64);
    let result = executor
        .execute_statement(&statement, "dob_bis")
        .await
        .unwrap();

    assert_eq!(result.records[0]["bin_num"], Value::Int(1000123));
    assert_eq!(result.records[0]["coa_number"], Value::from("COA-1"));
    assert_eq!(service.submitted()[0].parameters, vec!["1000123"]);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_the_service() {
    let service = Arc::new(MockQueryService::new());
    let executor = QueryExecutor::new(service.clone());

    let err = executor.execute_query("", "dob_bis").await.unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::InvalidInput);

    let err = executor
        .execute_statement(&Statement::new("SELECT ?"), "dob_bis")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::InvalidInput);

    assert!(service.submitted().is_empty());
}
