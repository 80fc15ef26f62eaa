//! HTTP API through the public router.

use athena_gateway::db::{MockQueryService, RawResultSet};
use athena_gateway::query::QueryExecutor;
use athena_gateway::server::{router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower::ServiceExt;

async fn post(app: axum::Router, uri: &str, body: JsonValue) -> (StatusCode, JsonValue) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_violation_lookup_end_to_end() {
    let raw = RawResultSet::from_cells(
        &[
            ("bin_num", "bigint"),
            ("violation_date", "date"),
            ("violation_link", "varchar"),
        ],
        &[&[Some("1000123"), Some("2021-06-01"), Some("https://v/1")]],
    );
    let service = Arc::new(MockQueryService::new().with_result("violations_oath", raw));
    let app = router(AppState::new(QueryExecutor::new(service.clone())));

    let (status, body) = post(app, "/violation_by_bin", json!({"bin_number": "1000123"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "bin_num": "1000123",
            "violation_records": [
                {"violation_date": 1622505600, "violation_link": "https://v/1"}
            ]
        })
    );

    let submitted = service.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].catalog, "dob_bis");
    assert!(submitted[0].sql.contains("violations_oath"));
    assert_eq!(submitted[0].parameters, vec!["1000123"]);
}

#[tokio::test]
async fn test_injection_attempt_is_rejected() {
    let service = Arc::new(MockQueryService::new());
    let app = router(AppState::new(QueryExecutor::new(service.clone())));

    let (status, body) = post(
        app,
        "/coa_by_bin",
        json!({"bin_number": "0; DROP TABLE coa_docs"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("must be numeric"));
    assert!(service.submitted().is_empty());
}
