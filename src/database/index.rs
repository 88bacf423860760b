use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{KmerParams, TemplateId};

/// Index of a template within a [`KmerIndex`]; also its tie-break rank
pub type TemplateIndex = u32;

/// Per-template k-mer counts recorded during the build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStats {
    /// K-mers stored for the template, both strands, one per occurrence
    pub total_kmers: u64,

    /// Distinct k-mers the template contributed
    pub unique_kmers: u64,
}

/// A template known to the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub id: TemplateId,
    pub stats: TemplateStats,
    pub description: String,
}

/// Mapping from k-mer to the templates containing it.
///
/// Each k-mer maps to an ordered multiset of template indices: a template index
/// is appended once per stored occurrence of the k-mer. Templates keep their
/// insertion order, which is the order ties are broken in when ranking.
#[derive(Debug, Clone)]
pub struct KmerIndex {
    params: KmerParams,

    /// All templates in insertion order
    templates: Vec<TemplateInfo>,

    /// Index: template ID -> position in `templates`
    id_to_index: HashMap<TemplateId, TemplateIndex>,

    /// Index: k-mer -> template indices, one per stored occurrence
    kmers: HashMap<Vec<u8>, Vec<TemplateIndex>>,
}

impl KmerIndex {
    /// Create an empty index for the given window parameters
    #[must_use]
    pub fn new(params: KmerParams) -> Self {
        Self {
            params,
            templates: Vec::new(),
            id_to_index: HashMap::new(),
            kmers: HashMap::new(),
        }
    }

    /// Assemble an index from already-consistent parts (used by the store)
    pub(crate) fn from_parts(
        params: KmerParams,
        templates: Vec<TemplateInfo>,
        kmers: HashMap<Vec<u8>, Vec<TemplateIndex>>,
    ) -> Self {
        let id_to_index = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), index_from_usize(i)))
            .collect();
        Self {
            params,
            templates,
            id_to_index,
            kmers,
        }
    }

    #[must_use]
    pub fn params(&self) -> &KmerParams {
        &self.params
    }

    /// K-mer length of every key
    #[must_use]
    pub fn k(&self) -> usize {
        self.params.k
    }

    /// Number of templates
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Number of distinct k-mers in the index
    #[must_use]
    pub fn kmer_count(&self) -> usize {
        self.kmers.len()
    }

    /// Templates containing `kmer`, one entry per stored occurrence
    #[must_use]
    pub fn lookup(&self, kmer: &[u8]) -> Option<&[TemplateIndex]> {
        self.kmers.get(kmer).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains_kmer(&self, kmer: &[u8]) -> bool {
        self.kmers.contains_key(kmer)
    }

    /// Iterate over all k-mer entries (unordered)
    pub fn kmers(&self) -> impl Iterator<Item = (&[u8], &[TemplateIndex])> {
        self.kmers.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub(crate) fn kmer_map(&self) -> &HashMap<Vec<u8>, Vec<TemplateIndex>> {
        &self.kmers
    }

    /// Template by index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range. Indices obtained from this index are
    /// always in range.
    #[must_use]
    pub fn template(&self, index: TemplateIndex) -> &TemplateInfo {
        &self.templates[index as usize]
    }

    /// All templates in insertion order
    #[must_use]
    pub fn templates(&self) -> &[TemplateInfo] {
        &self.templates
    }

    /// Look up a template's index by ID
    #[must_use]
    pub fn template_index(&self, id: &TemplateId) -> Option<TemplateIndex> {
        self.id_to_index.get(id).copied()
    }

    /// Get a template by ID
    #[must_use]
    pub fn get(&self, id: &TemplateId) -> Option<&TemplateInfo> {
        self.template_index(id).map(|idx| self.template(idx))
    }

    /// Sum of unique k-mer counts over all templates
    #[must_use]
    pub fn total_unique_kmers(&self) -> u64 {
        self.templates.iter().map(|t| t.stats.unique_kmers).sum()
    }

    /// Register a template, or return the existing one with the same ID.
    ///
    /// Re-adding an existing ID appends: its description is extended and later
    /// k-mers add to its counts.
    pub fn add_template(&mut self, id: TemplateId, description: &str) -> TemplateIndex {
        if let Some(&idx) = self.id_to_index.get(&id) {
            let info = &mut self.templates[idx as usize];
            if !description.is_empty() {
                if info.description.is_empty() {
                    info.description = description.to_string();
                } else {
                    info.description.push_str(", ");
                    info.description.push_str(description);
                }
            }
            return idx;
        }

        let idx = index_from_usize(self.templates.len());
        self.id_to_index.insert(id.clone(), idx);
        self.templates.push(TemplateInfo {
            id,
            stats: TemplateStats::default(),
            description: description.to_string(),
        });
        idx
    }

    /// Record one occurrence of `kmer` in template `template`.
    ///
    /// Returns `true` if this is the first occurrence of the k-mer for that
    /// template (the unique count was incremented).
    pub fn insert(&mut self, kmer: &[u8], template: TemplateIndex) -> bool {
        debug_assert_eq!(kmer.len(), self.params.k);

        let first = match self.kmers.get_mut(kmer) {
            Some(entry) => {
                // Occurrences of the template being built are always at the tail
                let seen = entry.last() == Some(&template) || entry.contains(&template);
                entry.push(template);
                !seen
            }
            None => {
                self.kmers.insert(kmer.to_vec(), vec![template]);
                true
            }
        };

        let stats = &mut self.templates[template as usize].stats;
        stats.total_kmers += 1;
        if first {
            stats.unique_kmers += 1;
        }
        first
    }
}

/// Template indices are `u32`; more than four billion templates is not supported
fn index_from_usize(i: usize) -> TemplateIndex {
    TemplateIndex::try_from(i).unwrap_or(TemplateIndex::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_template_appends_existing() {
        let mut index = KmerIndex::new(KmerParams::new(4));
        let a = index.add_template(TemplateId::new("a"), "first");
        let b = index.add_template(TemplateId::new("b"), "");
        let again = index.add_template(TemplateId::new("a"), "second");

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(again, a);
        assert_eq!(index.len(), 2);
        assert_eq!(index.template(a).description, "first, second");
    }

    #[test]
    fn test_insert_counts_unique_once() {
        let mut index = KmerIndex::new(KmerParams::new(4));
        let a = index.add_template(TemplateId::new("a"), "");

        assert!(index.insert(b"ACGT", a));
        assert!(!index.insert(b"ACGT", a));
        assert!(index.insert(b"TTTT", a));

        let stats = index.template(a).stats;
        assert_eq!(stats.total_kmers, 3);
        assert_eq!(stats.unique_kmers, 2);
        assert_eq!(index.lookup(b"ACGT"), Some(&[a, a][..]));
    }

    #[test]
    fn test_insert_shared_kmer() {
        let mut index = KmerIndex::new(KmerParams::new(4));
        let a = index.add_template(TemplateId::new("a"), "");
        let b = index.add_template(TemplateId::new("b"), "");

        assert!(index.insert(b"ACGT", a));
        assert!(index.insert(b"ACGT", b));
        // An earlier template id further up the entry is still detected
        let a_again = index.add_template(TemplateId::new("a"), "");
        assert!(!index.insert(b"ACGT", a_again));

        assert_eq!(index.lookup(b"ACGT"), Some(&[a, b, a][..]));
        assert_eq!(index.template(a).stats.total_kmers, 2);
        assert_eq!(index.total_unique_kmers(), 2);
    }

    #[test]
    fn test_lookup_missing() {
        let index = KmerIndex::new(KmerParams::new(4));
        assert!(index.lookup(b"AAAA").is_none());
        assert!(!index.contains_kmer(b"AAAA"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_get_by_id() {
        let mut index = KmerIndex::new(KmerParams::new(4));
        index.add_template(TemplateId::new("tpl1"), "Test template");
        let info = index.get(&TemplateId::new("tpl1")).unwrap();
        assert_eq!(info.description, "Test template");
        assert!(index.get(&TemplateId::new("nope")).is_none());
    }
}
