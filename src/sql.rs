pub mod error;
pub mod executor;
pub mod guard;
pub mod schema;

use std::path::PathBuf;

pub use error::Error;
pub use executor::Executor;
pub use guard::Guard;
use rusqlite::types::Value;
use serde::Serialize;

/// Where the generated statements run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Database {
    /// An existing SQLite file. Never created by the executor.
    File(PathBuf),

    /// A fresh in-memory database per statement.
    Memory {
        /// SQL run before the statement (schema and seed data).
        initial_sql: String,
    },
}

/// A single value in a result row.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Integer(i) => Cell::Integer(i),
            Value::Real(f) => Cell::Real(f),
            Value::Text(s) => Cell::Text(s),
            Value::Blob(b) => Cell::Blob(b),
        }
    }
}

/// The complete result set of one statement.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryResponse {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}
