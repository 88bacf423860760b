//! Index building from template sequences.
//!
//! An [`IndexBuilder`] holds the build parameters; the state of a build lives in
//! a [`BuildSession`] owned by the caller, so one builder can extend either a
//! fresh index or one loaded from disk.

use std::collections::HashSet;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::core::sequence::{kmer_windows, reverse_complement};
use crate::core::template::TemplateRecord;
use crate::core::types::{KmerParams, TemplateId};
use crate::database::index::KmerIndex;
use crate::matching::profile::QueryProfiler;
use crate::matching::scoring::{count_to_f64, HitTally, ETTA};

/// Log progress every this many scanned k-mers
const PROGRESS_INTERVAL: u64 = 10_000_000;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Template has an empty name")]
    EmptyName,

    #[error("K-mer size mismatch: database uses k={database}, build requested k={requested}")]
    KmerSizeMismatch { database: usize, requested: usize },

    #[error("Prefix mismatch: database uses '{database}', build requested '{requested}'")]
    PrefixMismatch { database: String, requested: String },
}

/// K-mers excluded from the index, e.g. from contaminant or vector sequences
#[derive(Debug, Clone, Default)]
pub struct KmerFilter {
    kmers: HashSet<Vec<u8>>,
}

impl KmerFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the windows of `seq` and of its reverse complement
    pub fn add_sequence(&mut self, seq: &[u8], params: &KmerParams) {
        let rc = reverse_complement(seq);
        for strand in [seq, rc.as_slice()] {
            for kmer in kmer_windows(strand, params) {
                if !self.kmers.contains(kmer) {
                    self.kmers.insert(kmer.to_vec());
                }
            }
        }
    }

    #[must_use]
    pub fn contains(&self, kmer: &[u8]) -> bool {
        self.kmers.contains(kmer)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }
}

/// A template left out of the index because it is too similar to one already
/// in it
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTemplate {
    pub template: TemplateId,
    pub similar_to: TemplateId,
    /// Fraction of the template's distinct k-mers found in `similar_to`
    pub frac_query: f64,
    /// Distinct k-mers shared with `similar_to`
    pub score: u64,
}

/// Result of offering one template to the builder
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Included {
        template: TemplateId,
        /// K-mers stored for this record, both strands
        stored_kmers: u64,
    },
    Skipped(SkippedTemplate),
}

/// State of one build: the index under construction and its counters
#[derive(Debug)]
pub struct BuildSession {
    index: KmerIndex,
    kmers_scanned: u64,
    kmers_stored: u64,
    included: Vec<TemplateId>,
    skipped: Vec<SkippedTemplate>,
    started: Instant,
}

impl BuildSession {
    /// Start a build from an empty index
    #[must_use]
    pub fn new(params: KmerParams) -> Self {
        Self::seeded(KmerIndex::new(params))
    }

    /// Continue a build from an existing index
    #[must_use]
    pub fn seeded(index: KmerIndex) -> Self {
        Self {
            index,
            kmers_scanned: 0,
            kmers_stored: 0,
            included: Vec::new(),
            skipped: Vec::new(),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn index(&self) -> &KmerIndex {
        &self.index
    }

    #[must_use]
    pub fn into_index(self) -> KmerIndex {
        self.index
    }

    /// Windows that passed the prefix filter, filtered or not
    #[must_use]
    pub fn kmers_scanned(&self) -> u64 {
        self.kmers_scanned
    }

    #[must_use]
    pub fn kmers_stored(&self) -> u64 {
        self.kmers_stored
    }

    /// Templates added in this session, in order
    #[must_use]
    pub fn included(&self) -> &[TemplateId] {
        &self.included
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedTemplate] {
        &self.skipped
    }

    /// Scanning rate since the session started
    #[must_use]
    pub fn kmers_per_second(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            count_to_f64(self.kmers_scanned) / elapsed
        } else {
            0.0
        }
    }
}

/// Adds templates to a [`BuildSession`]
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    params: KmerParams,
    filter: Option<KmerFilter>,
    homology_threshold: Option<f64>,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(params: KmerParams) -> Self {
        Self {
            params,
            filter: None,
            homology_threshold: None,
        }
    }

    /// Exclude the k-mers of `filter` from the index
    #[must_use]
    pub fn with_filter(mut self, filter: KmerFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Skip templates whose best existing match covers at least this fraction
    /// of their distinct k-mers
    #[must_use]
    pub fn with_homology_threshold(mut self, threshold: f64) -> Self {
        self.homology_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn params(&self) -> &KmerParams {
        &self.params
    }

    /// Start a session on an empty index
    #[must_use]
    pub fn session(&self) -> BuildSession {
        BuildSession::new(self.params.clone())
    }

    /// Start a session that extends `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` was built with a different k-mer size or
    /// prefix.
    pub fn seed(&self, index: KmerIndex) -> Result<BuildSession, BuildError> {
        let existing = index.params();
        if existing.k != self.params.k {
            return Err(BuildError::KmerSizeMismatch {
                database: existing.k,
                requested: self.params.k,
            });
        }
        if existing.prefix != self.params.prefix {
            return Err(BuildError::PrefixMismatch {
                database: existing.prefix_str(),
                requested: self.params.prefix_str(),
            });
        }
        Ok(BuildSession::seeded(index))
    }

    /// Index one template on both strands, unless the homology gate rejects it.
    ///
    /// Segments shorter than k contribute nothing. A template whose name is
    /// already in the index is merged into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the template name is empty.
    pub fn add_template(
        &self,
        session: &mut BuildSession,
        record: &TemplateRecord,
    ) -> Result<BuildOutcome, BuildError> {
        if record.name.is_empty() {
            return Err(BuildError::EmptyName);
        }
        let id = TemplateId::new(record.name.as_str());

        if let Some(skipped) = self.check_homology(session, &id, record) {
            info!(
                "skipping {}: {:.4} of its k-mers match {} (score {})",
                skipped.template, skipped.frac_query, skipped.similar_to, skipped.score
            );
            session.skipped.push(skipped.clone());
            return Ok(BuildOutcome::Skipped(skipped));
        }

        let template = session.index.add_template(id.clone(), &record.description);
        let mut stored = 0u64;
        for segment in &record.segments {
            let rc = reverse_complement(segment);
            for strand in [segment.as_slice(), rc.as_slice()] {
                for kmer in kmer_windows(strand, &self.params) {
                    session.kmers_scanned += 1;
                    if session.kmers_scanned % PROGRESS_INTERVAL == 0 {
                        info!(
                            "{} k-mers scanned ({:.0} k-mers/s)",
                            session.kmers_scanned,
                            session.kmers_per_second()
                        );
                    }
                    if self.filter.as_ref().is_some_and(|f| f.contains(kmer)) {
                        continue;
                    }
                    session.index.insert(kmer, template);
                    stored += 1;
                }
            }
        }

        if stored == 0 {
            debug!("{id}: no k-mers stored ({} bases)", record.total_length());
        }
        session.kmers_stored += stored;
        if !session.included.contains(&id) {
            session.included.push(id.clone());
        }

        Ok(BuildOutcome::Included {
            template: id,
            stored_kmers: stored,
        })
    }

    /// Profile the template against the index so far; `Some` if the best match
    /// reaches the homology threshold
    fn check_homology(
        &self,
        session: &BuildSession,
        id: &TemplateId,
        record: &TemplateRecord,
    ) -> Option<SkippedTemplate> {
        let threshold = self.homology_threshold?;
        if session.index.is_empty() {
            return None;
        }

        let mut profiler = QueryProfiler::new(&session.index).both_strands(true);
        for segment in &record.segments {
            profiler.add_sequence(segment);
        }
        let profile = profiler.finish();
        let tally = HitTally::collect(&profile, &session.index);
        // Earlier parts of the same template are not homologs of it
        let own = session.index.template_index(id);
        let (best, hits) = tally
            .ranked(0)
            .into_iter()
            .find(|(template, _)| Some(*template) != own)?;

        let frac_query =
            count_to_f64(hits.hit_count) / (count_to_f64(profile.unique_kmers()) + ETTA);
        debug!(
            "{id}: closest template {} ({} shared k-mers, {:.4})",
            session.index.template(best).id,
            hits.hit_count,
            frac_query
        );
        (frac_query >= threshold).then(|| SkippedTemplate {
            template: id.clone(),
            similar_to: session.index.template(best).id.clone(),
            frac_query,
            score: hits.hit_count,
        })
    }
}
