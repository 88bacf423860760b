//! K-mer database construction, storage and remapping.
//!
//! A database maps every k-mer of a set of reference genomes (templates) to
//! the templates containing it, together with per-template k-mer counts and
//! descriptions.
//!
//! ## Building
//!
//! ```rust,no_run
//! use kmer_finder::core::template::TemplateRecord;
//! use kmer_finder::core::types::KmerParams;
//! use kmer_finder::database::builder::IndexBuilder;
//! use kmer_finder::database::store::save_database;
//! use std::path::Path;
//!
//! let builder = IndexBuilder::new(KmerParams::new(16).with_prefix("ATG"));
//! let mut session = builder.session();
//! builder
//!     .add_template(&mut session, &TemplateRecord::single("NC_000913", "ATGACGTTGCA"))
//!     .unwrap();
//! save_database(session.index(), Path::new("bacteria")).unwrap();
//! ```
//!
//! ## Organism databases
//!
//! A database built per accession can be collapsed onto organisms with
//! [`organism::remap_to_organisms`], so that chromosomes and plasmids of one
//! organism score as a single template.

pub mod builder;
pub mod index;
pub mod organism;
pub mod store;

pub use builder::{BuildError, BuildOutcome, BuildSession, IndexBuilder, KmerFilter};
pub use index::{KmerIndex, TemplateIndex, TemplateInfo, TemplateStats};
pub use store::{load_database, save_database, DatabaseError};
