//! Binary crate for the `weather` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup and interactive configuration
//! - Human-friendly output formatting

use clap::Parser;

mod cli;
mod format;
mod logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    logging::init(cmd.debug, cmd.log_file.as_deref())?;
    cmd.run().await
}
