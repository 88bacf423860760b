use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::cli::{open_output, OutputFormat};
use crate::database::store::load_database;
use crate::matching::engine::{MatchingConfig, MatchingEngine, WtaHit, DEFAULT_MAX_ITERATIONS};
use crate::matching::report::{write_json, ReportWriter};
use crate::matching::scoring::{DEFAULT_EVALUE, DEFAULT_MIN_SCORE};
use crate::parsing::fasta::SequenceReader;
use crate::utils::validation::{check_database_kmer_size, validate_evalue, validate_max_iterations};

#[derive(Args)]
pub struct SearchArgs {
    /// Query FASTA/FASTQ file(s), plain or gzipped; '-' reads stdin.
    /// All records of all inputs are pooled into one query
    #[arg(short, long = "input", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Database prefix
    #[arg(short, long, required = true)]
    pub database: PathBuf,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Expected k-mer size; must match the database
    #[arg(short = 'k', long)]
    pub kmer_size: Option<usize>,

    /// Expected k-mer prefix; must match the database
    #[arg(long)]
    pub prefix: Option<String>,

    /// Maximum multiple-testing corrected p-value for a reported template
    #[arg(short, long, default_value_t = DEFAULT_EVALUE)]
    pub evalue: f64,

    /// Templates need more than this many k-mer hits
    #[arg(long, default_value_t = DEFAULT_MIN_SCORE)]
    pub min_score: u64,

    /// Winner takes all: report the best template, remove its k-mers from
    /// the query and repeat
    #[arg(short, long)]
    pub wta: bool,

    /// Maximum number of templates reported in winner-takes-all mode
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    /// Print the expected score as an integer and z with one decimal
    #[arg(long)]
    pub round: bool,

    /// Also scan the reverse complement of query sequences
    #[arg(long)]
    pub both_strands: bool,
}

/// Execute search subcommand
///
/// # Errors
///
/// Returns an error if the database or a query cannot be read, parameters do
/// not match the database, or the report cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: SearchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    validate_evalue(args.evalue)?;
    validate_max_iterations(args.max_iterations)?;

    let index = load_database(&args.database)
        .with_context(|| format!("Failed to load database {}", args.database.display()))?;
    if let Some(k) = args.kmer_size {
        check_database_kmer_size(index.k(), k)?;
    }
    if let Some(prefix) = &args.prefix {
        let database_prefix = index.params().prefix_str();
        if !prefix.eq_ignore_ascii_case(&database_prefix) {
            anyhow::bail!(
                "Database uses prefix '{database_prefix}', but '{prefix}' was requested"
            );
        }
    }
    if verbose {
        eprintln!(
            "Loaded database {} with {} templates and {} k-mers (k={})",
            args.database.display(),
            index.len(),
            index.kmer_count(),
            index.k()
        );
    }
    if index.is_empty() {
        eprintln!("Warning: Database is empty, no templates to match against.");
    }

    let config = MatchingConfig {
        evalue: args.evalue,
        min_score: args.min_score,
        max_iterations: args.max_iterations,
        both_strands: args.both_strands,
    };
    let engine = MatchingEngine::with_config(&index, config);

    let started = Instant::now();
    let mut profiler = engine.profiler();
    let mut records = 0usize;
    for path in &args.inputs {
        let reader = SequenceReader::open(path)
            .with_context(|| format!("Failed to open query {}", path.display()))?;
        for record in reader {
            let record =
                record.with_context(|| format!("Failed to read query {}", path.display()))?;
            profiler.add_sequence(&record.sequence);
            records += 1;
        }
    }
    let profile = profiler.finish();

    let elapsed = started.elapsed().as_secs_f64();
    #[allow(clippy::cast_precision_loss)]
    let rate = if elapsed > 0.0 {
        profile.total_kmers() as f64 / elapsed
    } else {
        0.0
    };
    info!(
        "{} query k-mers from {records} records ({:.0} k-mers/s)",
        profile.total_kmers(),
        rate
    );
    if profile.total_kmers() == 0 {
        warn!("query contains no k-mers of length {}", index.k());
    }
    if verbose {
        eprintln!(
            "Query: {records} sequences, {} k-mers ({} distinct, {} in database)",
            profile.total_kmers(),
            profile.unique_kmers(),
            profile.len()
        );
    }

    let mut out = open_output(args.output.as_deref())?;
    let report = ReportWriter::new(args.round);
    if args.wta {
        let hits: Vec<WtaHit> = engine.winner_takes_all(profile).collect();
        if verbose {
            eprintln!("Reported {} templates", hits.len());
        }
        match format {
            OutputFormat::Json => write_json(&mut out, &hits)?,
            OutputFormat::Text | OutputFormat::Tsv => report.write_wta(&mut out, &hits)?,
        }
    } else {
        let matches = engine.find_matches(&profile);
        if verbose {
            eprintln!("Reported {} templates", matches.len());
        }
        match format {
            OutputFormat::Json => write_json(&mut out, &matches)?,
            OutputFormat::Text | OutputFormat::Tsv => report.write_matches(&mut out, &matches)?,
        }
    }
    out.flush()?;

    Ok(())
}
