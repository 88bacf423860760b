//! Query matching and scoring.
//!
//! - [`QueryProfiler`]: counts the indexed k-mers of a query
//! - [`MatchScorer`]: per-template significance and coverage statistics
//! - [`MatchingEngine`]: ranked search and winner-takes-all selection
//! - [`ReportWriter`]: tab-separated match tables
//!
//! ## Scoring
//!
//! Each distinct query k-mer credits every template containing it once. The
//! hit count of a template is compared with the hits expected if all hits were
//! spread over templates in proportion to their unique k-mer counts, giving a
//! z-score and a conservative p-value. The p-value is multiplied by the number
//! of templates before it is compared with the E-value threshold.
//!
//! ## Winner takes all
//!
//! Related genomes share most of their k-mers, so a ranked list of matches
//! tends to repeat one organism under many names. In winner-takes-all mode the
//! best template is reported, every k-mer it contains is removed from the
//! query, and the remainder is scored again.
//!
//! ## Example
//!
//! ```rust,no_run
//! use kmer_finder::database::store::load_database;
//! use kmer_finder::matching::{MatchingConfig, MatchingEngine};
//!
//! let index = load_database("bacteria".as_ref()).unwrap();
//! let engine = MatchingEngine::with_config(&index, MatchingConfig::default());
//! let profile = engine.profile([b"ACGTTGCAACGGTCAGTTCAGGA".as_slice()]);
//!
//! for m in engine.find_matches(&profile) {
//!     println!("{}\t{}\t{:e}", m.template, m.score, m.corrected_p);
//! }
//! ```
//!
//! [`QueryProfiler`]: profile::QueryProfiler
//! [`MatchScorer`]: scoring::MatchScorer
//! [`ReportWriter`]: report::ReportWriter

pub mod engine;
pub mod profile;
pub mod report;
pub mod scoring;

pub use engine::{MatchingConfig, MatchingEngine, WinnerTakesAll, WtaHit};
pub use scoring::TemplateMatch;
