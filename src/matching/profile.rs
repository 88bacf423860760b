//! Query k-mer profiling.
//!
//! A [`QueryProfile`] counts how often each k-mer occurs in the query, keeping
//! only k-mers that exist in the index. K-mers missing from the index still
//! count toward the total and unique window counts used as score denominators.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use crate::core::sequence::{kmer_windows, reverse_complement};
use crate::core::types::KmerParams;
use crate::database::index::KmerIndex;

/// Occurrence counts of indexed k-mers in a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryProfile {
    counts: HashMap<Vec<u8>, u64>,

    /// All windows that passed the prefix filter
    total_kmers: u64,

    /// Distinct windows that passed the prefix filter, indexed or not
    unique_kmers: u64,
}

impl QueryProfile {
    /// Occurrence count of `kmer` (0 if absent or spent)
    #[must_use]
    pub fn count(&self, kmer: &[u8]) -> u64 {
        self.counts.get(kmer).copied().unwrap_or(0)
    }

    /// All profiled k-mers with their counts, including zeroed ones
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u64)> {
        self.counts.iter().map(|(k, &c)| (k.as_slice(), c))
    }

    /// Number of profiled k-mers (indexed k-mers seen in the query)
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of profiled k-mers whose count has not been zeroed
    #[must_use]
    pub fn nonzero_len(&self) -> usize {
        self.counts.values().filter(|&&c| c > 0).count()
    }

    #[must_use]
    pub fn total_kmers(&self) -> u64 {
        self.total_kmers
    }

    #[must_use]
    pub fn unique_kmers(&self) -> u64 {
        self.unique_kmers
    }

    /// Zero the counts of every k-mer matching `predicate`.
    ///
    /// Keys are kept so that later passes enumerate the same k-mer set.
    /// Returns the number of k-mers whose count changed.
    pub fn zero_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&[u8]) -> bool,
    {
        let mut zeroed = 0;
        for (kmer, count) in &mut self.counts {
            if *count > 0 && predicate(kmer.as_slice()) {
                *count = 0;
                zeroed += 1;
            }
        }
        zeroed
    }
}

/// Builds a [`QueryProfile`] against an index.
///
/// All sequences added to one profiler are pooled into a single profile, so
/// every read of a sequencing run contributes to the same counts.
pub struct QueryProfiler<'a> {
    index: &'a KmerIndex,
    params: KmerParams,
    both_strands: bool,
    counts: HashMap<Vec<u8>, u64>,
    /// Fingerprints of windows not present in the index
    unmatched: HashSet<u64>,
    total_kmers: u64,
}

impl<'a> QueryProfiler<'a> {
    /// Profiler scanning the forward strand with stride 1 and the index's
    /// k-mer size and prefix
    #[must_use]
    pub fn new(index: &'a KmerIndex) -> Self {
        Self {
            index,
            params: index.params().query_scan(),
            both_strands: false,
            counts: HashMap::new(),
            unmatched: HashSet::new(),
            total_kmers: 0,
        }
    }

    /// Also scan the reverse complement of every sequence
    #[must_use]
    pub fn both_strands(mut self, both_strands: bool) -> Self {
        self.both_strands = both_strands;
        self
    }

    /// Add the windows of one (uppercase) sequence to the profile
    pub fn add_sequence(&mut self, seq: &[u8]) {
        self.scan(seq);
        if self.both_strands {
            let rc = reverse_complement(seq);
            self.scan(&rc);
        }
    }

    fn scan(&mut self, seq: &[u8]) {
        for kmer in kmer_windows(seq, &self.params) {
            self.total_kmers += 1;
            if self.index.contains_kmer(kmer) {
                match self.counts.get_mut(kmer) {
                    Some(count) => *count += 1,
                    None => {
                        self.counts.insert(kmer.to_vec(), 1);
                    }
                }
            } else {
                self.unmatched.insert(fingerprint(kmer));
            }
        }
    }

    #[must_use]
    pub fn finish(self) -> QueryProfile {
        let unique = self.counts.len() + self.unmatched.len();
        QueryProfile {
            counts: self.counts,
            total_kmers: self.total_kmers,
            unique_kmers: u64::try_from(unique).unwrap_or(u64::MAX),
        }
    }
}

/// 64-bit fingerprint of a k-mer for distinct counting of unindexed windows
fn fingerprint(kmer: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    kmer.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TemplateId;

    fn index_with(kmers: &[&str], k: usize) -> KmerIndex {
        let mut index = KmerIndex::new(KmerParams::new(k));
        let t = index.add_template(TemplateId::new("t"), "");
        for kmer in kmers {
            index.insert(kmer.as_bytes(), t);
        }
        index
    }

    #[test]
    fn test_profile_keeps_only_indexed_kmers() {
        let index = index_with(&["AAAA", "AATT"], 4);
        let mut profiler = QueryProfiler::new(&index);
        profiler.add_sequence(b"AAAATTTTAAAA");
        let profile = profiler.finish();

        assert_eq!(profile.len(), 2);
        assert_eq!(profile.count(b"AAAA"), 2);
        assert_eq!(profile.count(b"AATT"), 1);
        assert_eq!(profile.count(b"TTTT"), 0);
        // 9 windows in total, distinct: AAAA AAAT AATT ATTT TTTT TTTA TTAA TAAA
        assert_eq!(profile.total_kmers(), 9);
        assert_eq!(profile.unique_kmers(), 8);
    }

    #[test]
    fn test_profile_pools_sequences() {
        let index = index_with(&["ACGT"], 4);
        let mut profiler = QueryProfiler::new(&index);
        profiler.add_sequence(b"ACGT");
        profiler.add_sequence(b"ACGT");
        let profile = profiler.finish();

        assert_eq!(profile.count(b"ACGT"), 2);
        assert_eq!(profile.total_kmers(), 2);
        assert_eq!(profile.unique_kmers(), 1);
    }

    #[test]
    fn test_profile_forward_strand_only_by_default() {
        let index = index_with(&["TTTG"], 4);
        let mut profiler = QueryProfiler::new(&index);
        profiler.add_sequence(b"CAAA");
        assert!(profiler.finish().is_empty());

        let mut profiler = QueryProfiler::new(&index).both_strands(true);
        profiler.add_sequence(b"CAAA");
        let profile = profiler.finish();
        assert_eq!(profile.count(b"TTTG"), 1);
        assert_eq!(profile.total_kmers(), 2);
    }

    #[test]
    fn test_profile_short_query() {
        let index = index_with(&["ACGT"], 4);
        let mut profiler = QueryProfiler::new(&index);
        profiler.add_sequence(b"ACG");
        profiler.add_sequence(b"");
        let profile = profiler.finish();
        assert!(profile.is_empty());
        assert_eq!(profile.total_kmers(), 0);
        assert_eq!(profile.unique_kmers(), 0);
    }

    #[test]
    fn test_profile_ignores_index_step() {
        let mut index = KmerIndex::new(KmerParams::new(2).with_step(3));
        let t = index.add_template(TemplateId::new("t"), "");
        index.insert(b"CG", t);

        let mut profiler = QueryProfiler::new(&index);
        profiler.add_sequence(b"ACGT");
        assert_eq!(profiler.finish().count(b"CG"), 1);
    }

    #[test]
    fn test_zero_where() {
        let index = index_with(&["AAAA", "CCCC"], 4);
        let mut profiler = QueryProfiler::new(&index);
        profiler.add_sequence(b"AAAACCCC");
        let mut profile = profiler.finish();

        assert_eq!(profile.nonzero_len(), 2);
        assert_eq!(profile.zero_where(|k| k == b"AAAA"), 1);
        assert_eq!(profile.count(b"AAAA"), 0);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile.nonzero_len(), 1);
        // Already zero: nothing changes
        assert_eq!(profile.zero_where(|k| k == b"AAAA"), 0);
    }
}
