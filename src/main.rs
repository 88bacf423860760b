use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod database;
mod matching;
mod parsing;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("kmer_finder=debug,info")
    } else {
        EnvFilter::new("kmer_finder=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Build(args) => {
            cli::build::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Search(args) => {
            cli::search::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Organism(args) => {
            cli::organism::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Dump(args) => {
            cli::dump::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
