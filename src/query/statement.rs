//! Parameterized statements.
//!
//! A [`Statement`] pairs SQL containing `?` placeholders with the values bound
//! to them. Values are rendered as SQL literals and passed to the service as
//! execution parameters, so they never get spliced into the SQL text.

use crate::db::{Value, TIMESTAMP_FORMAT};
use crate::error::QueryError;
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// SQL text plus bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    values: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }

    /// Binds the next placeholder.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Counts `?` placeholders outside string literals, identifiers and comments.
    pub fn placeholder_count(&self) -> Result<usize, QueryError> {
        let tokens = Tokenizer::new(&GenericDialect {}, &self.sql)
            .tokenize()
            .map_err(|e| QueryError::invalid(format!("could not tokenize statement: {e}")))?;

        Ok(tokens
            .iter()
            .filter(|t| matches!(t, Token::Placeholder(p) if p.starts_with('?')))
            .count())
    }

    /// Checks that every placeholder has exactly one bound value.
    pub fn validate(&self) -> Result<(), QueryError> {
        let placeholders = self.placeholder_count()?;
        if placeholders != self.values.len() {
            return Err(QueryError::invalid(format!(
                "statement has {placeholders} placeholder(s) but {} bound value(s)",
                self.values.len()
            )));
        }
        Ok(())
    }

    /// Renders bound values as SQL literals, in placeholder order.
    pub fn rendered_parameters(&self) -> Vec<String> {
        self.values.iter().map(render_literal).collect()
    }
}

/// Renders a value as a SQL literal.
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_nan() => "nan()".to_string(),
        Value::Float(f) if f.is_infinite() && *f > 0.0 => "infinity()".to_string(),
        Value::Float(f) if f.is_infinite() => "-infinity()".to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::String(s) => quote(s),
        Value::Timestamp(ts) => {
            let text = ts.format(TIMESTAMP_FORMAT).to_string();
            format!("TIMESTAMP {}", quote(&text))
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
