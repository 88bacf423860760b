use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use crate::cli::{open_output, OutputFormat};
use crate::core::types::TemplateId;
use crate::database::store::{
    load_descriptions, load_kmer_table, load_lengths, load_unique_lengths,
};

#[derive(Args)]
#[command(group = clap::ArgGroup::new("tables").required(true).multiple(true))]
pub struct DumpArgs {
    /// Database prefix
    #[arg(required = true)]
    pub database: PathBuf,

    /// Print total k-mers per template
    #[arg(long, group = "tables")]
    pub lengths: bool,

    /// Print unique k-mers per template
    #[arg(long, group = "tables")]
    pub ulengths: bool,

    /// Print every k-mer with the templates containing it
    #[arg(long, group = "tables")]
    pub kmers: bool,

    /// Print template descriptions
    #[arg(long, group = "tables")]
    pub descriptions: bool,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// One table as key/value rows
#[derive(Debug, Serialize)]
struct TableDump {
    table: &'static str,
    rows: Vec<(String, String)>,
}

/// Execute dump subcommand
///
/// # Errors
///
/// Returns an error if a requested table cannot be loaded or the output
/// cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DumpArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let prefix = &args.database;
    let context = || format!("Failed to load database {}", prefix.display());
    let mut tables = Vec::new();

    if args.lengths {
        tables.push(TableDump {
            table: "lengths",
            rows: counts_rows(load_lengths(prefix).with_context(context)?),
        });
    }
    if args.ulengths {
        tables.push(TableDump {
            table: "ulengths",
            rows: counts_rows(load_unique_lengths(prefix).with_context(context)?),
        });
    }
    if args.kmers {
        let table = load_kmer_table(prefix).with_context(context)?;
        let mut rows: Vec<(String, String)> = table
            .kmers
            .iter()
            .map(|(kmer, entry)| {
                let templates: Vec<&str> = entry
                    .iter()
                    .map(|&t| {
                        table
                            .templates
                            .get(t as usize)
                            .map_or("?", TemplateId::as_str)
                    })
                    .collect();
                (String::from_utf8_lossy(kmer).into_owned(), templates.join(","))
            })
            .collect();
        rows.sort_unstable();
        if verbose {
            eprintln!(
                "k={}, prefix='{}', created {}",
                table.header.k,
                String::from_utf8_lossy(&table.header.prefix),
                table.header.created_at
            );
        }
        tables.push(TableDump {
            table: "kmers",
            rows,
        });
    }
    if args.descriptions {
        tables.push(TableDump {
            table: "descriptions",
            rows: load_descriptions(prefix)
                .with_context(context)?
                .into_iter()
                .map(|(id, description)| (id.0, description))
                .collect(),
        });
    }

    let mut out = open_output(args.output.as_deref())?;
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &tables)?;
            writeln!(out)?;
        }
        OutputFormat::Text | OutputFormat::Tsv => {
            let separator = if matches!(format, OutputFormat::Tsv) {
                '\t'
            } else {
                ' '
            };
            let many = tables.len() > 1;
            for dump in &tables {
                if many {
                    writeln!(out, "# {}", dump.table)?;
                }
                for (key, value) in &dump.rows {
                    writeln!(out, "{key}{separator}{value}")?;
                }
            }
        }
    }
    out.flush()?;

    Ok(())
}

fn counts_rows(counts: Vec<(TemplateId, u64)>) -> Vec<(String, String)> {
    counts
        .into_iter()
        .map(|(id, count)| (id.0, count.to_string()))
        .collect()
}
