//! Process-wide configuration, built once at startup and read-only afterwards.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Args;

use crate::{sql::Database, synth::prompt};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Database path that selects a fresh in-memory database per statement.
pub const MEMORY_DATABASE: &str = ":memory:";

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used to synthesize SQL
    #[arg(long, env = "NL2SQL_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the generative language API
    #[arg(long, env = "NL2SQL_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// SQLite database file, or `:memory:`
    #[arg(short, long, env = "NL2SQL_DATABASE", default_value = "attendance.db")]
    pub database: PathBuf,

    /// SQL file run against a `:memory:` database before each statement
    #[arg(long, env = "NL2SQL_INIT_SQL")]
    pub init_sql: Option<PathBuf>,

    /// Replace the built-in instructional template
    #[arg(long, env = "NL2SQL_PROMPT_FILE")]
    pub prompt_file: Option<PathBuf>,

    /// Execute generated statements even when they are not read-only queries
    #[arg(long, default_value = "false")]
    pub allow_writes: bool,

    /// Only trim the completion; do not strip markdown code fences
    #[arg(long, default_value = "false")]
    pub keep_fences: bool,

    /// Seconds a statement may run before it is interrupted
    #[arg(long, default_value = "5")]
    pub query_timeout: u64,

    /// Seconds to wait for the model API
    #[arg(long, default_value = "30")]
    pub request_timeout: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("GOOGLE_API_KEY is not set")]
    MissingApiKey,

    #[error("read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// How to reach the hosted model.
#[derive(Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub model: ModelConfig,
    pub database: Database,
    pub read_only: bool,
    pub strip_fences: bool,
    pub query_timeout: Duration,
    pub template: String,
}

impl Config {
    pub fn from_args(args: ConfigArgs) -> Result<Self, Error> {
        let api_key = args
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingApiKey)?;

        let database = if args.database.as_os_str() == MEMORY_DATABASE {
            let initial_sql = match &args.init_sql {
                Some(path) => read_file(path)?,
                None => String::new(),
            };
            Database::Memory { initial_sql }
        } else {
            if let Some(path) = &args.init_sql {
                tracing::warn!(
                    init_sql = %path.display(),
                    "init SQL only applies to {MEMORY_DATABASE} databases; ignoring"
                );
            }
            Database::File(args.database)
        };

        let template = match &args.prompt_file {
            Some(path) => read_file(path)?,
            None => prompt::INSTRUCTIONS.to_string(),
        };

        Ok(Self {
            model: ModelConfig {
                api_key,
                model: args.model,
                endpoint: args.endpoint,
                request_timeout: Duration::from_secs(args.request_timeout),
            },
            database,
            read_only: !args.allow_writes,
            strip_fences: !args.keep_fences,
            query_timeout: Duration::from_secs(args.query_timeout),
            template,
        })
    }
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_owned(),
        source,
    })
}
