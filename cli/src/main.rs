use std::io;

use clap::Parser;
use commands::filter::{run_filter, FilterArgs};
use tracing::Level;

mod commands;

#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    #[command(flatten)]
    filter: FilterArgs,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    run_filter(cli.filter)
}
