//! The question → SQL → rows pipeline.

use std::time::Instant;

use serde::Serialize;

use crate::{
    config::Config,
    sql::{self, Executor, Guard, QueryResponse, guard},
    synth::{self, Synthesizer, normalize_completion},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("synthesize SQL: {0}")]
    Synthesis(#[from] synth::Error),

    #[error("validate SQL: {0}")]
    Validation(#[from] guard::Error),

    #[error("execute SQL: {0}")]
    Execution(#[from] sql::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Synthesis,
    Validation,
    Execution,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Synthesis(_) => ErrorKind::Synthesis,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Execution(_) => ErrorKind::Execution,
        }
    }
}

/// Everything one question produced.
#[derive(Debug)]
pub struct Answer {
    pub question: String,
    /// The generated statement, absent when synthesis failed.
    pub sql: Option<String>,
    pub outcome: Result<QueryResponse, Error>,
}

pub struct Pipeline<S> {
    synthesizer: S,
    guard: Guard,
    executor: Executor,
    strip_fences: bool,
}

impl<S: Synthesizer> Pipeline<S> {
    pub fn new(synthesizer: S, guard: Guard, executor: Executor, strip_fences: bool) -> Self {
        Self {
            synthesizer,
            guard,
            executor,
            strip_fences,
        }
    }

    pub fn from_config(synthesizer: S, config: &Config) -> Self {
        Self::new(
            synthesizer,
            Guard::new(config.read_only),
            Executor::new(
                config.database.clone(),
                config.read_only,
                config.query_timeout,
            ),
            config.strip_fences,
        )
    }

    /// Ask the model for a statement. Questions are never filtered, an empty
    /// one is sent like any other.
    pub async fn synthesize(&self, question: &str) -> Result<String, Error> {
        let completion = self.synthesizer.synthesize(question).await?;
        Ok(normalize_completion(&completion, self.strip_fences))
    }

    /// Validate and execute a statement.
    pub async fn run(&self, statement: &str) -> Result<QueryResponse, Error> {
        self.guard.check(statement)?;
        Ok(self.executor.execute(statement).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Answer {
        let started = Instant::now();

        let sql = match self.synthesize(question).await {
            Ok(sql) => sql,
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), "{e}");
                return Answer {
                    question: question.to_owned(),
                    sql: None,
                    outcome: Err(e),
                };
            }
        };
        tracing::info!(sql = %sql, "generated statement");

        let outcome = self.run(&sql).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(response) => tracing::info!(rows = response.rows.len(), elapsed_ms, "answered"),
            Err(e) => tracing::warn!(kind = ?e.kind(), "{e}"),
        }

        Answer {
            question: question.to_owned(),
            sql: Some(sql),
            outcome,
        }
    }
}
