//! Input parsers.
//!
//! - **FASTA/FASTQ**: template and query sequences, plain or gzip-compressed,
//!   from a file or standard input
//! - **Organism lists**: tab-separated `accession<TAB>organism` files
//! - **Path lists**: one input file per line
//!
//! ## Example
//!
//! ```rust,no_run
//! use kmer_finder::parsing::fasta::SequenceReader;
//! use std::path::Path;
//!
//! for record in SequenceReader::open(Path::new("reads.fq.gz")).unwrap() {
//!     let record = record.unwrap();
//!     println!("{}\t{}", record.name, record.sequence.len());
//! }
//! ```

pub mod fasta;
pub mod tsv;

pub use fasta::ParseError;
