//! Athena Gateway - a read-only HTTP gateway over Amazon Athena.
//!
//! Resolves an AWS session from the environment or a fallback bundle, runs
//! SQL through Athena and serves the results as JSON records.

pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod server;
