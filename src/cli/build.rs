use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::OutputFormat;
use crate::core::template::TemplateGrouper;
use crate::core::types::{KmerParams, DEFAULT_KMER_SIZE, DEFAULT_STEP};
use crate::database::builder::{BuildOutcome, BuildSession, IndexBuilder, KmerFilter};
use crate::database::organism::OrganismMap;
use crate::database::store::{load_database, save_database};
use crate::parsing::fasta::{ParseError, SequenceReader};
use crate::parsing::tsv::{parse_organism_file, parse_path_list};
use crate::utils::validation::{validate_homology_threshold, validate_kmer_params};

#[derive(Args)]
pub struct BuildArgs {
    /// Template FASTA file(s), plain or gzipped - can be specified multiple times
    #[arg(short, long = "input", num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// File listing template FASTA files, one per line
    #[arg(long)]
    pub input_list: Option<PathBuf>,

    /// Output database prefix (writes <prefix>.kmers.bin, .len.bin, .ulen.bin, .desc.bin)
    #[arg(short, long, required = true)]
    pub output: PathBuf,

    /// K-mer size
    #[arg(short = 'k', long, default_value_t = DEFAULT_KMER_SIZE)]
    pub kmer_size: usize,

    /// Distance between indexed windows
    #[arg(long, default_value_t = DEFAULT_STEP)]
    pub step: usize,

    /// Only index k-mers starting with this sequence (e.g. ATG)
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// FASTA file of sequences whose k-mers are excluded from the database
    #[arg(long)]
    pub filter: Option<PathBuf>,

    /// Skip templates sharing at least this fraction of their k-mers with a
    /// template already in the database (0-1]
    #[arg(long)]
    pub homology_threshold: Option<f64>,

    /// Existing database prefix to extend instead of starting empty
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Tab-separated accession/organism list; records are renamed to their
    /// organism so all records of one organism form a single template
    #[arg(long)]
    pub organism_list: Option<PathBuf>,
}

/// Build outcome, as printed for the user
#[derive(Debug, Serialize)]
struct BuildSummary {
    database: String,
    k: usize,
    step: usize,
    prefix: String,
    templates: usize,
    added: usize,
    kmers: usize,
    kmers_scanned: u64,
    kmers_stored: u64,
    skipped: Vec<SkippedSummary>,
}

#[derive(Debug, Serialize)]
struct SkippedSummary {
    template: String,
    similar_to: String,
    frac_query: f64,
    score: u64,
}

/// Execute build subcommand
///
/// # Errors
///
/// Returns an error if parameters are invalid, an input cannot be read, or the
/// database cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: BuildArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let params = KmerParams::new(args.kmer_size)
        .with_step(args.step)
        .with_prefix(&args.prefix);
    validate_kmer_params(&params)?;

    let mut inputs = args.inputs.clone();
    if let Some(list) = &args.input_list {
        inputs.extend(
            parse_path_list(list)
                .with_context(|| format!("Failed to read input list {}", list.display()))?,
        );
    }
    if inputs.is_empty() {
        anyhow::bail!("No template files given: use --input or --input-list");
    }

    let mut builder = IndexBuilder::new(params.clone());
    if let Some(path) = &args.filter {
        let filter = load_filter(path, &params)?;
        if verbose {
            eprintln!("Loaded {} filter k-mers from {}", filter.len(), path.display());
        }
        builder = builder.with_filter(filter);
    }
    if let Some(threshold) = args.homology_threshold {
        validate_homology_threshold(threshold)?;
        builder = builder.with_homology_threshold(threshold);
    }

    let organisms = args
        .organism_list
        .as_deref()
        .map(parse_organism_file)
        .transpose()
        .context("Failed to read organism list")?;

    let mut session = match &args.database {
        Some(prefix) => {
            let index = load_database(prefix)
                .with_context(|| format!("Failed to load database {}", prefix.display()))?;
            if verbose {
                eprintln!(
                    "Extending database {} ({} templates)",
                    prefix.display(),
                    index.len()
                );
            }
            builder.seed(index)?
        }
        None => builder.session(),
    };

    for path in &inputs {
        add_file(&builder, &mut session, path, organisms.as_ref())
            .with_context(|| format!("Failed to index {}", path.display()))?;
    }

    save_database(session.index(), &args.output)
        .with_context(|| format!("Failed to write database {}", args.output.display()))?;
    info!(
        "scanned {} k-mers ({:.0} k-mers/s)",
        session.kmers_scanned(),
        session.kmers_per_second()
    );

    print_summary(&summarize(&session, &args.output), format)
}

/// Index every template of one FASTA file
fn add_file(
    builder: &IndexBuilder,
    session: &mut BuildSession,
    path: &Path,
    organisms: Option<&OrganismMap>,
) -> anyhow::Result<()> {
    let reader = SequenceReader::open(path)?;
    let rename = |name: &str| -> Result<String, ParseError> {
        Ok(match organisms {
            Some(map) => match map.organism(name) {
                Some(organism) => organism.to_string(),
                None => {
                    warn!("{name} is not in the organism list; keeping its name");
                    name.to_string()
                }
            },
            None => name.to_string(),
        })
    };

    let mut templates = 0usize;
    for template in TemplateGrouper::new(reader, rename) {
        let template = template?;
        match builder.add_template(session, &template)? {
            BuildOutcome::Included {
                template,
                stored_kmers,
            } => debug!("{template}: {stored_kmers} k-mers"),
            BuildOutcome::Skipped(_) => {}
        }
        templates += 1;
    }
    if templates == 0 {
        warn!("{} contains no sequences", path.display());
    }
    Ok(())
}

fn load_filter(path: &Path, params: &KmerParams) -> anyhow::Result<KmerFilter> {
    let mut filter = KmerFilter::new();
    for record in SequenceReader::open(path)
        .with_context(|| format!("Failed to open filter file {}", path.display()))?
    {
        filter.add_sequence(&record?.sequence, params);
    }
    Ok(filter)
}

fn summarize(session: &BuildSession, output: &Path) -> BuildSummary {
    let index = session.index();
    let params = index.params();
    BuildSummary {
        database: output.display().to_string(),
        k: params.k,
        step: params.step,
        prefix: params.prefix_str(),
        templates: index.len(),
        added: session.included().len(),
        kmers: index.kmer_count(),
        kmers_scanned: session.kmers_scanned(),
        kmers_stored: session.kmers_stored(),
        skipped: session
            .skipped()
            .iter()
            .map(|s| SkippedSummary {
                template: s.template.to_string(),
                similar_to: s.similar_to.to_string(),
                frac_query: s.frac_query,
                score: s.score,
            })
            .collect(),
    }
}

fn print_summary(summary: &BuildSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Database: {}", summary.database);
            println!(
                "Parameters: k={}, step={}, prefix='{}'",
                summary.k, summary.step, summary.prefix
            );
            println!(
                "Templates: {} ({} added in this build)",
                summary.templates, summary.added
            );
            println!("Distinct k-mers: {}", summary.kmers);
            println!(
                "K-mers stored: {} of {} scanned",
                summary.kmers_stored, summary.kmers_scanned
            );
            if !summary.skipped.is_empty() {
                println!("Skipped {} homologous templates:", summary.skipped.len());
                for s in &summary.skipped {
                    println!(
                        "  {} -> {} ({:.4}, {} k-mers)",
                        s.template, s.similar_to, s.frac_query, s.score
                    );
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Tsv => {
            println!("template\tsimilar_to\tfrac_q\tscore");
            for s in &summary.skipped {
                println!(
                    "{}\t{}\t{}\t{}",
                    s.template, s.similar_to, s.frac_query, s.score
                );
            }
        }
    }
    Ok(())
}
