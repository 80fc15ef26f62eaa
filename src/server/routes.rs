//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::debug;

use super::{ApiError, AppState};
use crate::db::{Record, TableInfo, Value, TIMESTAMP_FORMAT};
use crate::query::Statement;

const BUILDINGS_CATALOG: &str = "gryps_neptune";
const BUILDINGS_SQL: &str = "SELECT has_address, has_city, has_number FROM gryps_neptune.building";

const DOB_CATALOG: &str = "dob_bis";
const COA_SQL: &str = "SELECT bin_num, coa_number, coa_file_link FROM coa_docs WHERE bin_num = ?";
const VIOLATION_SQL: &str =
    "SELECT bin_num, violation_date, violation_link FROM violations_oath WHERE bin_num = ?";

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/get_buildings", get(get_buildings))
        .route("/coa_by_bin", post(coa_by_bin))
        .route("/violation_by_bin", post(violation_by_bin))
        .route("/databases", get(list_databases))
        .route("/databases/{database}/tables", get(list_tables))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Building identification number, accepted as a JSON string or integer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BinNumber {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct BinRequest {
    bin_number: BinNumber,
}

impl BinRequest {
    /// Returns the number as received and its numeric value.
    fn parse(self) -> Result<(String, i64), ApiError> {
        match self.bin_number {
            BinNumber::Number(n) => Ok((n.to_string(), n)),
            BinNumber::Text(text) => match text.trim().parse::<i64>() {
                Ok(n) => Ok((text, n)),
                Err(_) => Err(ApiError::bad_request(format!(
                    "bin_number must be numeric, got '{text}'"
                ))),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct CoaRecord {
    coa_number: Value,
    coa_file_link: Value,
}

#[derive(Debug, Serialize)]
struct CoaResponse {
    bin_num: String,
    coa_records: Vec<CoaRecord>,
}

#[derive(Debug, Serialize)]
struct ViolationRecord {
    violation_date: Option<i64>,
    violation_link: Value,
}

#[derive(Debug, Serialize)]
struct ViolationResponse {
    bin_num: String,
    violation_records: Vec<ViolationRecord>,
}

async fn get_buildings(State(state): State<AppState>) -> Result<Json<Vec<Record>>, ApiError> {
    let result = state
        .executor
        .execute_query(BUILDINGS_SQL, BUILDINGS_CATALOG)
        .await?;
    Ok(Json(result.into_records()))
}

async fn coa_by_bin(
    State(state): State<AppState>,
    body: Result<Json<BinRequest>, JsonRejection>,
) -> Result<Json<CoaResponse>, ApiError> {
    let (bin_num, bin) = read_bin(body)?;
    debug!(bin, "Looking up certificates of occupancy");

    let statement = Statement::new(COA_SQL).bind(bin);
    let result = state
        .executor
        .execute_statement(&statement, DOB_CATALOG)
        .await?;

    let coa_records = result
        .records
        .iter()
        .map(|record| CoaRecord {
            coa_number: field(record, "coa_number"),
            coa_file_link: field(record, "coa_file_link"),
        })
        .collect();

    Ok(Json(CoaResponse {
        bin_num,
        coa_records,
    }))
}

async fn violation_by_bin(
    State(state): State<AppState>,
    body: Result<Json<BinRequest>, JsonRejection>,
) -> Result<Json<ViolationResponse>, ApiError> {
    let (bin_num, bin) = read_bin(body)?;
    debug!(bin, "Looking up violations");

    let statement = Statement::new(VIOLATION_SQL).bind(bin);
    let result = state
        .executor
        .execute_statement(&statement, DOB_CATALOG)
        .await?;

    let violation_records = result
        .records
        .iter()
        .map(|record| {
            Ok(ViolationRecord {
                violation_date: epoch_seconds(&field(record, "violation_date"))?,
                violation_link: field(record, "violation_link"),
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(ViolationResponse {
        bin_num,
        violation_records,
    }))
}

async fn list_databases(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.executor.list_databases().await?))
}

async fn list_tables(
    State(state): State<AppState>,
    Path(database): Path<String>,
) -> Result<Json<Vec<TableInfo>>, ApiError> {
    Ok(Json(state.executor.list_tables(&database).await?))
}

fn read_bin(body: Result<Json<BinRequest>, JsonRejection>) -> Result<(String, i64), ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    request.parse()
}

fn field(record: &Record, name: &str) -> Value {
    record.get(name).cloned().unwrap_or_default()
}

/// Seconds since the Unix epoch, reading naive timestamps as UTC.
fn epoch_seconds(value: &Value) -> Result<Option<i64>, ApiError> {
    match value {
        Value::Null => Ok(None),
        Value::Int(seconds) => Ok(Some(*seconds)),
        Value::Timestamp(ts) => Ok(Some(ts.and_utc().timestamp())),
        Value::String(text) => parse_datetime(text)
            .map(|ts| Some(ts.and_utc().timestamp()))
            .ok_or_else(|| ApiError::internal(format!("unrecognised date '{text}'"))),
        other => Err(ApiError::internal(format!("unrecognised date '{other}'"))),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FailingQueryService, MockQueryService, RawResultSet};
    use crate::query::QueryExecutor;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(service: MockQueryService) -> (Router, Arc<MockQueryService>) {
        let service = Arc::new(service);
        let state = AppState::new(QueryExecutor::new(service.clone()));
        (router(state), service)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_epoch_seconds() {
        let ts = NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(epoch_seconds(&Value::Timestamp(ts)).unwrap(), Some(1622505600));
        assert_eq!(epoch_seconds(&Value::from("2021-06-01")).unwrap(), Some(1622505600));
        assert_eq!(
            epoch_seconds(&Value::from("2021-06-01 00:00:10.000")).unwrap(),
            Some(1622505610)
        );
        assert_eq!(epoch_seconds(&Value::Null).unwrap(), None);
        assert!(epoch_seconds(&Value::from("soon")).is_err());
    }

    #[tokio::test]
    async fn test_get_buildings() {
        let raw = RawResultSet::from_cells(
            &[
                ("has_address", "varchar"),
                ("has_city", "varchar"),
                ("has_number", "integer"),
            ],
            &[&[Some("Broadway"), Some("New York"), Some("1")]],
        );
        let (app, service) = app(MockQueryService::new().with_result("building", raw));

        let (status, body) = send(app, get_request("/get_buildings")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"has_address": "Broadway", "has_city": "New York", "has_number": 1}])
        );
        assert_eq!(service.submitted()[0].catalog, "gryps_neptune");
    }

    #[tokio::test]
    async fn test_coa_by_bin() {
        let raw = RawResultSet::from_cells(
            &[
                ("bin_num", "bigint"),
                ("coa_number", "varchar"),
                ("coa_file_link", "varchar"),
            ],
            &[&[Some("1000123"), Some("COA-99"), Some("https://docs/coa-99.pdf")]],
        );
        let (app, service) = app(MockQueryService::new().with_result("coa_docs", raw));

        let (status, body) =
            send(app, post_json("/coa_by_bin", json!({"bin_number": "1000123"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "bin_num": "1000123",
                "coa_records": [
                    {"coa_number": "COA-99", "coa_file_link": "https://docs/coa-99.pdf"}
                ]
            })
        );

        let submitted = service.submitted();
        assert_eq!(submitted[0].catalog, "dob_bis");
        assert_eq!(submitted[0].parameters, vec!["1000123"]);
        assert!(!submitted[0].sql.contains("1000123"));
    }

    #[tokio::test]
    async fn test_coa_by_bin_accepts_integer_body() {
        let (app, service) = app(MockQueryService::new());

        let (status, body) =
            send(app, post_json("/coa_by_bin", json!({"bin_number": 42}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"bin_num": "42", "coa_records": []}));
        assert_eq!(service.submitted()[0].parameters, vec!["42"]);
    }

    #[tokio::test]
    async fn test_non_numeric_bin_is_rejected() {
        let (app, service) = app(MockQueryService::new());

        let (status, body) = send(
            app,
            post_json("/coa_by_bin", json!({"bin_number": "1 OR 1=1"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "bin_number must be numeric, got '1 OR 1=1'");
        assert!(service.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let (app, _) = app(MockQueryService::new());

        let (status, body) =
            send(app, post_json("/violation_by_bin", json!({"bin": "1"}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_violation_by_bin_converts_dates() {
        let raw = RawResultSet::from_cells(
            &[
                ("bin_num", "bigint"),
                ("violation_date", "timestamp"),
                ("violation_link", "varchar"),
            ],
            &[
                &[Some("7"), Some("2021-06-01 00:00:00.000"), Some("https://v/1")],
                &[Some("7"), None, Some("https://v/2")],
            ],
        );
        let (app, _) = app(MockQueryService::new().with_result("violations_oath", raw));

        let (status, body) =
            send(app, post_json("/violation_by_bin", json!({"bin_number": "7"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "bin_num": "7",
                "violation_records": [
                    {"violation_date": 1622505600, "violation_link": "https://v/1"},
                    {"violation_date": null, "violation_link": "https://v/2"}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_remote_failure_is_500_with_detail() {
        let state = AppState::new(QueryExecutor::new(Arc::new(FailingQueryService::new(
            "AccessDeniedException: not authorized",
        ))));

        let (status, body) = send(router(state), get_request("/get_buildings")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("query against 'gryps_neptune' failed"));
        assert!(detail.contains("AccessDeniedException: not authorized"));
    }

    #[tokio::test]
    async fn test_catalog_listing() {
        let (app, _) = app(
            MockQueryService::new()
                .with_databases(["dob_bis"])
                .with_tables("dob_bis", vec![TableInfo::new("coa_docs")]),
        );

        let (status, body) = send(app.clone(), get_request("/databases")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["dob_bis"]));

        let (status, body) = send(app.clone(), get_request("/databases/dob_bis/tables")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "coa_docs");

        let (status, body) = send(app, get_request("/databases/nope/tables")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .contains("Database nope not found"));
    }
}
