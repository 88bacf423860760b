//! # kmer-finder
//!
//! A library for identifying the reference genomes present in sequencing data
//! by k-mer matching.
//!
//! A database is built from a set of reference genomes (templates): every
//! k-mer of every template is recorded together with the templates that
//! contain it. Query reads or contigs are cut into k-mers the same way, and
//! each template is scored by how many distinct query k-mers it shares
//! compared with how many it would share by chance.
//!
//! ## Features
//!
//! - **Prefix-restricted k-mers**: index only k-mers starting with a fixed
//!   sequence (e.g. `ATG`) to shrink large databases
//! - **Homology reduction**: skip templates that are near duplicates of a
//!   template already in the database
//! - **Filtering**: exclude k-mers of contaminant or host sequences
//! - **Organism databases**: collapse per-accession templates onto organisms
//! - **Winner takes all**: report one template per organism present in a
//!   mixed sample
//!
//! ## Example
//!
//! ```rust,no_run
//! use kmer_finder::{IndexBuilder, KmerParams, MatchingEngine};
//! use kmer_finder::core::template::TemplateRecord;
//!
//! let builder = IndexBuilder::new(KmerParams::new(16));
//! let mut session = builder.session();
//! let template = TemplateRecord::single("chr1", "ACGTTGCAACGGTCAGTTCAGGACCAT");
//! builder.add_template(&mut session, &template).unwrap();
//! let index = session.into_index();
//!
//! let engine = MatchingEngine::new(&index);
//! let profile = engine.profile(["GTTGCAACGGTCAGTTCAGGA"]);
//! for m in engine.winner_takes_all(profile) {
//!     println!("{}: {} k-mers", m.residual.template, m.residual.score);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Sequence and template types
//! - [`database`]: K-mer index construction and storage
//! - [`matching`]: Scoring, ranking and winner-takes-all selection
//! - [`parsing`]: FASTA/FASTQ and list file parsers
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod database;
pub mod matching;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::types::*;
pub use database::builder::IndexBuilder;
pub use database::index::KmerIndex;
pub use database::store::{load_database, save_database};
pub use matching::engine::{MatchingConfig, MatchingEngine, WtaHit};
pub use matching::scoring::TemplateMatch;
