//! Integration tests for Athena Gateway.

pub mod live_test;
pub mod query_test;
pub mod routes_test;
pub mod session_test;
