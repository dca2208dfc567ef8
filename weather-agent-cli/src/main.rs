//! Binary crate for the `weather-agent` command-line host.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Running the weather tools and printing their results

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cli::init_tracing(cmd.verbose);
    cmd.run().await
}
