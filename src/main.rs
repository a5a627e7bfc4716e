use std::process::ExitCode;

use clap::Parser;
use mimalloc_rust::GlobalMiMalloc;

pub mod cmd;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod present;
pub mod sql;
pub mod synth;

#[global_allocator]
static GLOBAL_MIMALLOC: GlobalMiMalloc = GlobalMiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = cmd::Cli::parse();
    cli.execute().await
}
