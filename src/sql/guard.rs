use sql_insight::sqlparser::{
    ast::Statement,
    dialect::SQLiteDialect,
    parser::{Parser, ParserError},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("empty statement")]
    Empty,

    #[error("parse SQL: {0}")]
    Parse(#[from] ParserError),

    #[error("expected a single statement, got {0}")]
    MultipleStatements(usize),

    #[error("only read-only queries are allowed, got {0}")]
    NotReadOnly(String),
}

/// Decides whether a generated statement may reach the database.
#[derive(Clone, Copy, Debug)]
pub struct Guard {
    read_only: bool,
}

impl Guard {
    pub fn new(read_only: bool) -> Self {
        Self { read_only }
    }

    /// Accept exactly one query statement in read-only mode.
    ///
    /// When writes are allowed, the statement is passed through without
    /// being parsed at all.
    pub fn check(&self, statement: &str) -> Result<(), Error> {
        if !self.read_only {
            return Ok(());
        }

        let dialect = SQLiteDialect {};
        let statements = Parser::parse_sql(&dialect, statement)?;

        match statements.as_slice() {
            [] => Err(Error::Empty),
            [Statement::Query(_)] => Ok(()),
            [other] => Err(Error::NotReadOnly(leading_keyword(other))),
            many => Err(Error::MultipleStatements(many.len())),
        }
    }
}

fn leading_keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}
