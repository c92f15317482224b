//! docenrich CLI: enrich a page document with publish, schedule and url data.
//!
//! Prints the enriched document as JSON on stdout; logs go to stderr.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
