use serde::Serialize;
use tracing::{debug, info};

use crate::database::index::{KmerIndex, TemplateIndex};
use crate::matching::profile::{QueryProfile, QueryProfiler};
use crate::matching::scoring::{
    count_to_f64, coverage, HitTally, MatchScorer, TemplateMatch, DEFAULT_EVALUE,
    DEFAULT_MIN_SCORE, ETTA,
};

/// Default cap on the number of winner-takes-all reports
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Configuration for the matching engine
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Maximum corrected p-value for a reported match
    pub evalue: f64,
    /// Templates must have more hits than this
    pub min_score: u64,
    /// Maximum number of winner-takes-all reports
    pub max_iterations: usize,
    /// Scan the reverse complement of queries as well
    pub both_strands: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            evalue: DEFAULT_EVALUE,
            min_score: DEFAULT_MIN_SCORE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            both_strands: false,
        }
    }
}

impl MatchingConfig {
    fn scorer(&self) -> MatchScorer {
        MatchScorer::new(self.evalue, self.min_score)
    }
}

/// A winner-takes-all report: residual statistics from the pruned profile the
/// template won in, next to its statistics against the full query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WtaHit {
    #[serde(flatten)]
    pub residual: TemplateMatch,

    pub total_frac_query: f64,

    pub total_frac_template: f64,

    pub total_coverage: f64,
}

/// The main matching engine
pub struct MatchingEngine<'a> {
    index: &'a KmerIndex,
    config: MatchingConfig,
}

impl<'a> MatchingEngine<'a> {
    /// Create a new matching engine with default configuration
    #[must_use]
    pub fn new(index: &'a KmerIndex) -> Self {
        Self::with_config(index, MatchingConfig::default())
    }

    /// Create a new matching engine with custom configuration
    #[must_use]
    pub fn with_config(index: &'a KmerIndex, config: MatchingConfig) -> Self {
        Self { index, config }
    }

    #[must_use]
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// A profiler for queries against this engine's index
    #[must_use]
    pub fn profiler(&self) -> QueryProfiler<'a> {
        QueryProfiler::new(self.index).both_strands(self.config.both_strands)
    }

    /// Profile a set of query sequences as one pooled query
    pub fn profile<I, S>(&self, sequences: I) -> QueryProfile
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut profiler = self.profiler();
        for seq in sequences {
            profiler.add_sequence(seq.as_ref());
        }
        profiler.finish()
    }

    /// All reportable templates for a query, ranked by descending score
    #[must_use]
    pub fn find_matches(&self, profile: &QueryProfile) -> Vec<TemplateMatch> {
        let scorer = self.config.scorer();
        let tally = HitTally::collect(profile, self.index);
        self.log_statistics(&tally);

        scorer
            .rank(&tally, profile, self.index)
            .into_iter()
            .filter(|m| scorer.is_reportable(m))
            .collect()
    }

    /// Iterate winner-takes-all reports for a query.
    ///
    /// The top template is reported, every k-mer it contains is removed from the
    /// query, and the remainder is scored again, until no template is
    /// significant or the iteration cap is reached.
    #[must_use]
    pub fn winner_takes_all(&self, profile: QueryProfile) -> WinnerTakesAll<'a> {
        let original = HitTally::collect(&profile, self.index);
        self.log_statistics(&original);
        WinnerTakesAll {
            index: self.index,
            scorer: self.config.scorer(),
            max_iterations: self.config.max_iterations,
            original,
            query_unique_kmers: profile.unique_kmers(),
            working: profile,
            reported: 0,
            state: WtaState::Scoring,
        }
    }

    fn log_statistics(&self, tally: &HitTally) {
        info!(
            "total hits: {}, total template k-mers: {}, minimum score: {}, evalue: {}",
            tally.total_hits(),
            self.index.total_unique_kmers(),
            self.config.min_score,
            self.config.evalue
        );
    }
}

#[derive(Debug)]
enum WtaState {
    Scoring,
    Reporting(Option<TemplateMatch>),
    Pruning(TemplateIndex),
    Stopped,
}

/// Winner-takes-all selection over a query profile.
///
/// Runs `Scoring -> Reporting -> Pruning -> Scoring ...` and yields one
/// [`WtaHit`] per reported template. Each round re-scores the pruned profile
/// from scratch.
pub struct WinnerTakesAll<'a> {
    index: &'a KmerIndex,
    scorer: MatchScorer,
    max_iterations: usize,
    /// Hits against the unpruned query, for the total metrics
    original: HitTally,
    query_unique_kmers: u64,
    working: QueryProfile,
    reported: usize,
    state: WtaState,
}

impl WinnerTakesAll<'_> {
    /// The pruned profile as it stands
    #[must_use]
    pub fn working_profile(&self) -> &QueryProfile {
        &self.working
    }

    fn top(&self) -> Option<TemplateMatch> {
        let tally = HitTally::collect(&self.working, self.index);
        let (template, hits) = tally.ranked(self.scorer.min_score()).into_iter().next()?;
        Some(
            self.scorer
                .evaluate(template, hits, &tally, &self.working, self.index),
        )
    }

    fn with_totals(&self, residual: TemplateMatch) -> WtaHit {
        let hits = self.original.get(residual.index);
        let stats = self.index.template(residual.index).stats;
        let hit_count = count_to_f64(hits.hit_count);

        WtaHit {
            total_frac_query: hit_count / (count_to_f64(self.query_unique_kmers) + ETTA),
            total_frac_template: hit_count / (count_to_f64(stats.unique_kmers) + ETTA),
            total_coverage: coverage(hits.total_count, stats.total_kmers),
            residual,
        }
    }
}

impl Iterator for WinnerTakesAll<'_> {
    type Item = WtaHit;

    fn next(&mut self) -> Option<WtaHit> {
        loop {
            match std::mem::replace(&mut self.state, WtaState::Stopped) {
                WtaState::Scoring => {
                    if self.reported >= self.max_iterations {
                        debug!(
                            "winner-takes-all stopped after {} reports",
                            self.max_iterations
                        );
                        return None;
                    }
                    self.state = WtaState::Reporting(self.top());
                }
                WtaState::Reporting(top) => {
                    let winner = top.filter(|m| self.scorer.is_reportable(m))?;
                    debug!(
                        "winner {}: score {}, corrected p {:e}",
                        winner.template, winner.score, winner.corrected_p
                    );
                    self.reported += 1;
                    self.state = WtaState::Pruning(winner.index);
                    return Some(self.with_totals(winner));
                }
                WtaState::Pruning(template) => {
                    let index = self.index;
                    let pruned = self.working.zero_where(|kmer| {
                        index.lookup(kmer).is_some_and(|e| e.contains(&template))
                    });
                    debug!("pruned {pruned} k-mers");
                    self.state = WtaState::Scoring;
                }
                WtaState::Stopped => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sequence::{kmer_windows, reverse_complement};
    use crate::core::types::{KmerParams, TemplateId};

    /// Index templates on both strands, like the builder does
    fn index_of(k: usize, templates: &[(&str, &str)]) -> KmerIndex {
        let params = KmerParams::new(k);
        let mut index = KmerIndex::new(params.clone());
        for (name, seq) in templates {
            let t = index.add_template(TemplateId::new(*name), "");
            let fwd = seq.as_bytes().to_vec();
            let rc = reverse_complement(&fwd);
            for strand in [&fwd, &rc] {
                for kmer in kmer_windows(strand, &params) {
                    index.insert(kmer, t);
                }
            }
        }
        index
    }

    fn liberal() -> MatchingConfig {
        MatchingConfig {
            evalue: 1.0e6,
            ..MatchingConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = MatchingConfig::default();
        assert!((config.evalue - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.min_score, 0);
        assert_eq!(config.max_iterations, 100);
        assert!(!config.both_strands);
    }

    #[test]
    fn test_single_template_example() {
        let index = index_of(4, &[("tpl1", "AAAATTTT")]);
        let engine = MatchingEngine::with_config(
            &index,
            MatchingConfig {
                evalue: 1.0,
                ..MatchingConfig::default()
            },
        );
        let profile = engine.profile(["AAAATTTT"]);
        let matches = engine.find_matches(&profile);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].template.as_str(), "tpl1");
        // AAAA AAAT AATT ATTT TTTT
        assert_eq!(matches[0].score, 5);
        assert!((matches[0].frac_query - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_insignificant_match_not_reported() {
        let index = index_of(4, &[("tpl1", "AAAATTTT")]);
        let engine = MatchingEngine::new(&index);
        let profile = engine.profile(["AAAATTTT"]);
        // A lone template has z = 0 and p = 1
        assert!(engine.find_matches(&profile).is_empty());
        assert_eq!(engine.winner_takes_all(profile).count(), 0);
    }

    #[test]
    fn test_significant_match_among_decoys() {
        let mut templates = vec![("target", "ACGGTCAGTTCAGGA")];
        let decoys = [
            "CCCCCCCCCCCCCCC",
            "GGGGGGGGGGGGGGG",
            "CACACACACACACAC",
            "GAGAGAGAGAGAGAG",
            "CCGCCGCCGCCGCCG",
            "GGCGGCGGCGGCGGC",
            "CAGCAGCAGCAGCAG",
            "CCACCACCACCACCA",
        ];
        let names: Vec<String> = (0..decoys.len()).map(|i| format!("decoy{i}")).collect();
        for (name, seq) in names.iter().zip(decoys) {
            templates.push((name.as_str(), seq));
        }
        let index = index_of(5, &templates);
        let engine = MatchingEngine::with_config(
            &index,
            MatchingConfig {
                both_strands: true,
                ..MatchingConfig::default()
            },
        );
        let profile = engine.profile(["ACGGTCAGTTCAGGA"]);

        let matches = engine.find_matches(&profile);
        assert!(!matches.is_empty());
        assert_eq!(matches[0].template.as_str(), "target");
        assert!(matches[0].corrected_p <= 0.05);
    }

    #[test]
    fn test_wta_ties_report_first_inserted_once() {
        let index = index_of(
            4,
            &[("a", "ACGTTGCA"), ("b", "ACGTTGCA"), ("c", "GGGGCCC")],
        );
        let engine = MatchingEngine::with_config(&index, liberal());
        let profile = engine.profile(["ACGTTGCA", "GGGGCCC"]);

        let hits: Vec<WtaHit> = engine.winner_takes_all(profile).collect();
        let names: Vec<&str> = hits.iter().map(|h| h.residual.template.as_str()).collect();

        assert_eq!(names[0], "a");
        assert_eq!(names.iter().filter(|n| **n == "a").count(), 1);
        // b shares every k-mer with a and is pruned with it
        assert!(!names.contains(&"b"));
        assert!(names.contains(&"c"));
    }

    #[test]
    fn test_wta_pruning_is_monotone() {
        let index = index_of(
            4,
            &[
                ("x", "AACCGGTTAC"),
                ("y", "CCGGTTACGA"),
                ("z", "TTACGATCCA"),
            ],
        );
        let engine = MatchingEngine::with_config(&index, liberal());
        let profile = engine.profile(["AACCGGTTACGATCCA"]);

        let mut wta = engine.winner_takes_all(profile);
        let mut last = wta.working_profile().nonzero_len();
        let mut seen = Vec::new();
        while let Some(hit) = wta.next() {
            assert!(!seen.contains(&hit.residual.index));
            seen.push(hit.residual.index);
            // Pruning happens when the iterator is advanced again; the count
            // observed here reflects the previous round
            let now = wta.working_profile().nonzero_len();
            assert!(now <= last);
            last = now;
        }
        assert!(wta.working_profile().nonzero_len() <= last);
        assert!(!seen.is_empty());
    }

    #[test]
    fn test_wta_total_metrics_use_unpruned_query() {
        let index = index_of(4, &[("a", "AAAACCCC"), ("b", "AAAACCCCGG")]);
        let engine = MatchingEngine::with_config(&index, liberal());
        let profile = engine.profile(["AAAACCCCGG"]);

        let hits: Vec<WtaHit> = engine.winner_takes_all(profile).collect();
        assert_eq!(hits[0].residual.template.as_str(), "b");
        let first = &hits[0];
        assert!((first.total_frac_query - first.residual.frac_query).abs() < 1e-9);
        assert!((first.total_coverage - first.residual.coverage).abs() < 1e-9);
    }

    #[test]
    fn test_wta_max_iterations() {
        let index = index_of(4, &[("a", "AAAACCC"), ("b", "GGGGTTT"), ("c", "ACACGTG")]);
        let engine = MatchingEngine::with_config(
            &index,
            MatchingConfig {
                max_iterations: 1,
                ..liberal()
            },
        );
        let profile = engine.profile(["AAAACCCGGGGTTTACACGTG"]);
        assert_eq!(engine.winner_takes_all(profile).count(), 1);
    }

    #[test]
    fn test_empty_query() {
        let index = index_of(4, &[("a", "AAAACCC")]);
        let engine = MatchingEngine::with_config(&index, liberal());
        let profile = engine.profile(Vec::<Vec<u8>>::new());
        assert!(engine.find_matches(&profile).is_empty());
        assert_eq!(engine.winner_takes_all(profile).count(), 0);
    }
}
