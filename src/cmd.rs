use std::{io::Write, path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::{
    config::{Config, ConfigArgs},
    logging::init_tracing,
    pipeline::Pipeline,
    present::{self, Format},
    sql::schema,
    synth::{GeminiSynthesizer, Synthesizer},
};

#[derive(Parser)]
#[command(name = "nl2sql")]
#[command(about = "ask questions about attendance data in plain English", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate one question to SQL, run it and print the rows
    Ask {
        /// The question, in English
        question: String,

        /// Print the generated SQL without executing it
        #[arg(long, default_value = "false")]
        dry_run: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Read questions from stdin, one per line, until EOF
    Repl {
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Create the AttendanceData table in a SQLite file
    Init {
        /// SQLite database file, created when missing
        #[arg(short, long, env = "NL2SQL_DATABASE", default_value = "attendance.db")]
        database: PathBuf,

        /// Insert a few sample rows into an empty table
        #[arg(long, default_value = "false")]
        sample: bool,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<ExitCode> {
        init_tracing(self.verbose)?;

        match self.command {
            Commands::Ask {
                question,
                dry_run,
                format,
                config,
            } => ask(question, dry_run, format, config).await,
            Commands::Repl { format, config } => repl(format, config).await,
            Commands::Init { database, sample } => init(database, sample).await,
        }
    }
}

fn build_pipeline(args: ConfigArgs) -> Result<Pipeline<GeminiSynthesizer>> {
    let config = Config::from_args(args)?;
    tracing::info!(
        model = %config.model.model,
        read_only = config.read_only,
        strip_fences = config.strip_fences,
        "configuration loaded"
    );

    let synthesizer = GeminiSynthesizer::new(&config.model, config.template.clone())?;
    Ok(Pipeline::from_config(synthesizer, &config))
}

async fn ask(
    question: String,
    dry_run: bool,
    format: Format,
    config: ConfigArgs,
) -> Result<ExitCode> {
    let pipeline = build_pipeline(config)?;

    if dry_run {
        let synthesized = pipeline.synthesize(&question).await;
        let mut stdout = std::io::stdout().lock();
        return match synthesized {
            Ok(sql) => {
                writeln!(stdout, "Generated SQL Query: {sql}")?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                writeln!(stdout, "An error occurred: {e}")?;
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let answer = pipeline.ask(&question).await;
    present::render(&mut std::io::stdout().lock(), &answer, format)?;

    if answer.outcome.is_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn repl(format: Format, config: ConfigArgs) -> Result<ExitCode> {
    let pipeline = build_pipeline(config)?;
    run_repl(
        &pipeline,
        BufReader::new(tokio::io::stdin()),
        &mut std::io::stdout(),
        format,
    )
    .await?;

    Ok(ExitCode::SUCCESS)
}

/// Answer one question per input line until EOF. Blank lines are questions
/// too. Prompts are written only for text output.
async fn run_repl<S, R, W>(
    pipeline: &Pipeline<S>,
    reader: R,
    out: &mut W,
    format: Format,
) -> Result<()>
where
    S: Synthesizer,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let interactive = format == Format::Text;
    if interactive {
        writeln!(out, "LLM App To Retrieve SQL Data")?;
    }

    let mut lines = reader.lines();
    loop {
        if interactive {
            write!(out, "Input: ")?;
            out.flush()?;
        }

        let Some(question) = lines.next_line().await? else {
            break;
        };

        let answer = pipeline.ask(&question).await;
        present::render(out, &answer, format)?;
    }

    if interactive {
        writeln!(out)?;
    }
    Ok(())
}

async fn init(database: PathBuf, sample: bool) -> Result<ExitCode> {
    schema::initialize(&database, sample).await?;
    println!("initialized {}", database.display());

    Ok(ExitCode::SUCCESS)
}
