//! Command-line interface for kmer-finder.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **build**: Build a k-mer database from template FASTA files
//! - **search**: Find the templates that best match a FASTA/FASTQ query
//! - **organism**: Collapse a per-accession database onto organisms
//! - **dump**: Print the tables of a database
//!
//! ## Usage
//!
//! ```text
//! # Build a database of 16-mers starting with ATG
//! kmer-finder build -i genomes.fa -o db/bacteria --prefix ATG
//!
//! # Search reads, reporting one template per organism present
//! kmer-finder search -i reads.fq.gz -d db/bacteria --wta
//!
//! # Pipe a query on stdin, JSON output for scripting
//! zcat reads.fq.gz | kmer-finder --format json search -i - -d db/bacteria
//!
//! # Inspect a database
//! kmer-finder dump db/bacteria --descriptions
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};

pub mod build;
pub mod dump;
pub mod organism;
pub mod search;

#[derive(Parser)]
#[command(name = "kmer-finder")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Identify the reference genomes present in sequencing data by k-mer matching")]
#[command(
    long_about = "kmer-finder indexes the k-mers of a set of reference genomes (templates) and scores query sequences against them.\n\nFor each template it reports:\n- The number of distinct query k-mers found in the template\n- A z-score and conservative p-value against the hits expected by chance\n- Query and template coverage fractions\n\nIn winner-takes-all mode the best template is reported and its k-mers removed from the query before the next template is chosen."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a k-mer database from template sequences
    Build(build::BuildArgs),

    /// Match query sequences against a database
    Search(search::SearchArgs),

    /// Remap a database from accessions to organisms
    Organism(organism::OrganismArgs),

    /// Print database tables
    Dump(dump::DumpArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Buffered writer to `path`, or to stdout when no path is given
///
/// # Errors
///
/// Returns an error if the output file cannot be created.
pub fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}
