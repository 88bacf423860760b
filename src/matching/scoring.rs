use serde::Serialize;

use crate::core::types::TemplateId;
use crate::database::index::{KmerIndex, TemplateIndex};
use crate::matching::profile::QueryProfile;

/// Small number added to denominators to avoid division by zero
pub const ETTA: f64 = 1.0e-8;

/// Default maximum multiple-testing corrected p-value for a reportable match
pub const DEFAULT_EVALUE: f64 = 0.05;

/// Default minimum number of k-mer hits; templates must score above it
pub const DEFAULT_MIN_SCORE: u64 = 0;

/// Conservative two-sided p-values by z-score: `p` applies when `z > threshold`
const P_VALUE_TABLE: [(f64, f64); 27] = [
    (10.7016, 1e-26),
    (10.4862, 1e-25),
    (10.2663, 1e-24),
    (10.0416, 1e-23),
    (9.81197, 1e-22),
    (9.5769, 1e-21),
    (9.33604, 1e-20),
    (9.08895, 1e-19),
    (8.83511, 1e-18),
    (8.57394, 1e-17),
    (8.30479, 1e-16),
    (8.02686, 1e-15),
    (7.73926, 1e-14),
    (7.4409, 1e-13),
    (7.13051, 1e-12),
    (6.8065, 1e-11),
    (6.46695, 1e-10),
    (6.10941, 1e-9),
    (5.73073, 1e-8),
    (5.32672, 1e-7),
    (4.89164, 1e-6),
    (4.41717, 1e-5),
    (3.89059, 1e-4),
    (3.29053, 1e-3),
    (2.57583, 0.01),
    (1.95996, 0.05),
    (1.64485, 0.1),
];

#[inline]
pub(crate) fn count_to_f64(count: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Conservative two-sided p-value for a z-score, from a fixed step table.
///
/// Returns 1.0 for `z <= 1.64485` (and for NaN).
#[must_use]
pub fn fast_p_value(z: f64) -> f64 {
    P_VALUE_TABLE
        .iter()
        .find(|(threshold, _)| z > *threshold)
        .map_or(1.0, |&(_, p)| p)
}

/// z-score comparing two proportions `r1 / n1` and `r2 / n2` (Armitage et al.,
/// Statistical Methods in Medical Research).
///
/// `ETTA` is added to every denominator. The pooled variance is clamped at
/// zero so inconsistent counts give a finite score instead of NaN.
#[must_use]
pub fn z_from_two_samples(r1: f64, n1: f64, r2: f64, n2: f64) -> f64 {
    let p1 = r1 / (n1 + ETTA);
    let p2 = r2 / (n2 + ETTA);
    let p = (r1 + r2) / (n1 + n2 + ETTA);
    let q = 1.0 - p;
    let variance = (p * q * (1.0 / (n1 + ETTA) + 1.0 / (n2 + ETTA))).max(0.0);
    (p1 - p2) / (variance + ETTA).sqrt()
}

/// Hit counts of one template in one scoring pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateHits {
    /// Distinct query k-mers shared with the template
    pub hit_count: u64,

    /// Query occurrences of those k-mers
    pub total_count: u64,
}

/// Per-template hit counts for a query profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitTally {
    hits: Vec<TemplateHits>,
    total_hits: u64,
}

impl HitTally {
    /// Count hits of every profiled k-mer with a nonzero count.
    ///
    /// A template is credited at most once per k-mer, however many times the
    /// k-mer occurs in that template. K-mers without index entries are skipped.
    #[must_use]
    pub fn collect(profile: &QueryProfile, index: &KmerIndex) -> Self {
        let mut hits = vec![TemplateHits::default(); index.len()];
        // Last k-mer ordinal (1-based) each template was credited for
        let mut credited = vec![0usize; index.len()];
        let mut total_hits = 0;

        for (ordinal, (kmer, count)) in profile.iter().filter(|(_, c)| *c > 0).enumerate() {
            let Some(templates) = index.lookup(kmer) else {
                continue;
            };
            let stamp = ordinal + 1;
            for &template in templates {
                let slot = template as usize;
                if slot >= hits.len() || credited[slot] == stamp {
                    continue;
                }
                credited[slot] = stamp;
                hits[slot].hit_count += 1;
                hits[slot].total_count += count;
                total_hits += 1;
            }
        }

        Self { hits, total_hits }
    }

    /// Hits of one template
    #[must_use]
    pub fn get(&self, template: TemplateIndex) -> TemplateHits {
        self.hits
            .get(template as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Sum of hit counts over all templates
    #[must_use]
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// Templates with more than `min_score` hits, by descending hit count.
    ///
    /// Ties keep template insertion order.
    #[must_use]
    pub fn ranked(&self, min_score: u64) -> Vec<(TemplateIndex, TemplateHits)> {
        let mut ranked: Vec<(TemplateIndex, TemplateHits)> = self
            .hits
            .iter()
            .enumerate()
            .filter(|(_, h)| h.hit_count > min_score)
            .map(|(i, h)| (TemplateIndex::try_from(i).unwrap_or(TemplateIndex::MAX), *h))
            .collect();
        // Stable: equal hit counts stay in insertion order
        ranked.sort_by(|a, b| b.1.hit_count.cmp(&a.1.hit_count));
        ranked
    }
}

/// Statistics of one template against a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMatch {
    pub template: TemplateId,

    #[serde(skip)]
    pub index: TemplateIndex,

    /// Number of distinct query k-mers found in the template
    pub score: u64,

    /// Query occurrences of the matching k-mers
    pub total_count: u64,

    /// Hits expected if hits were spread over templates by size
    pub expected: f64,

    pub z: f64,

    pub p_value: f64,

    /// `p_value` multiplied by the number of templates
    pub corrected_p: f64,

    /// Fraction of the query's distinct k-mers found in the template
    pub frac_query: f64,

    /// Fraction of the template's distinct k-mers found in the query
    pub frac_template: f64,

    /// Query depth over the template; twice `total_count` because templates are
    /// indexed on both strands
    pub coverage: f64,

    pub unique_kmers: u64,

    pub description: String,
}

/// Computes significance and coverage statistics for templates hit by a query
#[derive(Debug, Clone, Copy)]
pub struct MatchScorer {
    evalue: f64,
    min_score: u64,
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new(DEFAULT_EVALUE, DEFAULT_MIN_SCORE)
    }
}

impl MatchScorer {
    #[must_use]
    pub fn new(evalue: f64, min_score: u64) -> Self {
        Self { evalue, min_score }
    }

    #[must_use]
    pub fn evalue(&self) -> f64 {
        self.evalue
    }

    #[must_use]
    pub fn min_score(&self) -> u64 {
        self.min_score
    }

    /// Whether a match passes the corrected p-value threshold
    #[must_use]
    pub fn is_reportable(&self, m: &TemplateMatch) -> bool {
        m.corrected_p <= self.evalue
    }

    /// Score every template with more than `min_score` hits, ranked by
    /// descending score with ties in template insertion order.
    #[must_use]
    pub fn rank(
        &self,
        tally: &HitTally,
        profile: &QueryProfile,
        index: &KmerIndex,
    ) -> Vec<TemplateMatch> {
        let total_ulen = count_to_f64(index.total_unique_kmers());
        tally
            .ranked(self.min_score)
            .into_iter()
            .map(|(template, hits)| {
                self.score_template(template, hits, tally, profile, index, total_ulen)
            })
            .collect()
    }

    /// Statistics for one template given its hits in a pass
    #[must_use]
    pub fn evaluate(
        &self,
        template: TemplateIndex,
        hits: TemplateHits,
        tally: &HitTally,
        profile: &QueryProfile,
        index: &KmerIndex,
    ) -> TemplateMatch {
        let total_ulen = count_to_f64(index.total_unique_kmers());
        self.score_template(template, hits, tally, profile, index, total_ulen)
    }

    /// `evaluate` with the index-wide unique k-mer count computed once per pass
    fn score_template(
        &self,
        template: TemplateIndex,
        hits: TemplateHits,
        tally: &HitTally,
        profile: &QueryProfile,
        index: &KmerIndex,
        total_ulen: f64,
    ) -> TemplateMatch {
        let info = index.template(template);
        let score = count_to_f64(hits.hit_count);
        let total_hits = count_to_f64(tally.total_hits());
        let ulen = count_to_f64(info.stats.unique_kmers);

        let expected = if total_ulen > 0.0 {
            total_hits * ulen / total_ulen
        } else {
            0.0
        };
        let z = z_from_two_samples(score, ulen, total_hits, total_ulen);
        let p_value = fast_p_value(z);
        let corrected_p = p_value * count_to_f64(index.len() as u64);

        TemplateMatch {
            template: info.id.clone(),
            index: template,
            score: hits.hit_count,
            total_count: hits.total_count,
            expected,
            z,
            p_value,
            corrected_p,
            frac_query: score / (count_to_f64(profile.unique_kmers()) + ETTA),
            frac_template: score / (ulen + ETTA),
            coverage: coverage(hits.total_count, info.stats.total_kmers),
            unique_kmers: info.stats.unique_kmers,
            description: info.description.clone(),
        }
    }
}

/// Depth of the query over a template: `2 * total_count / total_kmers`
#[must_use]
pub fn coverage(total_count: u64, template_total_kmers: u64) -> f64 {
    if template_total_kmers == 0 {
        0.0
    } else {
        2.0 * count_to_f64(total_count) / count_to_f64(template_total_kmers)
    }
}
