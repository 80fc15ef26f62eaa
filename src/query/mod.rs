//! Query validation, execution and result normalisation.
//!
//! This module isolates query submission and result shaping from the HTTP
//! route layer.

pub mod executor;
pub mod normalize;
pub mod statement;

pub use executor::QueryExecutor;
pub use statement::Statement;
