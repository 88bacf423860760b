use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::OutputFormat;
use crate::database::organism::remap_to_organisms;
use crate::database::store::{load_database, save_database};
use crate::parsing::tsv::parse_organism_file;

#[derive(Args)]
pub struct OrganismArgs {
    /// Tab-separated list: accession<TAB>organism
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Database prefix built with one template per accession
    #[arg(short, long, required = true)]
    pub database: PathBuf,

    /// Output prefix for the organism database
    #[arg(short, long, required = true)]
    pub output: PathBuf,
}

/// Execute organism subcommand
///
/// # Errors
///
/// Returns an error if the list or database cannot be read, an accession of
/// the database is missing from the list, or the output cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: OrganismArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let organisms = parse_organism_file(&args.input)
        .with_context(|| format!("Failed to read organism list {}", args.input.display()))?;
    let index = load_database(&args.database)
        .with_context(|| format!("Failed to load database {}", args.database.display()))?;

    if verbose {
        eprintln!(
            "Remapping {} templates with {} list entries",
            index.len(),
            organisms.len()
        );
    }

    let remapped = remap_to_organisms(&index, &organisms)?;
    save_database(&remapped, &args.output)
        .with_context(|| format!("Failed to write database {}", args.output.display()))?;

    match format {
        OutputFormat::Text => {
            println!(
                "Remapped {} accessions onto {} organisms: {}",
                index.len(),
                remapped.len(),
                args.output.display()
            );
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "database": args.output.display().to_string(),
                "accessions": index.len(),
                "organisms": remapped.len(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Tsv => {
            println!("organism\ttotal_kmers\tunique_kmers\taccessions");
            for t in remapped.templates() {
                println!(
                    "{}\t{}\t{}\t{}",
                    t.id, t.stats.total_kmers, t.stats.unique_kmers, t.description
                );
            }
        }
    }

    Ok(())
}
