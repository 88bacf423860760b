//! Collapse per-accession templates into per-organism templates.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::TemplateId;
use crate::database::index::{KmerIndex, TemplateIndex, TemplateInfo, TemplateStats};

#[derive(Error, Debug)]
pub enum RemapError {
    #[error("Accession '{0}' is in the database but not in the organism list")]
    UnmappedAccession(String),

    #[error("Too many organisms")]
    TooManyOrganisms,
}

/// Accession to organism assignments, in list order
#[derive(Debug, Clone, Default)]
pub struct OrganismMap {
    entries: Vec<(String, String)>,
    by_accession: HashMap<String, usize>,
}

impl OrganismMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `accession` to `organism`.
    ///
    /// A repeated accession takes the later organism but keeps its original
    /// position in the list.
    pub fn insert(&mut self, accession: impl Into<String>, organism: impl Into<String>) {
        let accession = accession.into();
        let organism = organism.into();
        if let Some(&i) = self.by_accession.get(&accession) {
            let entry = &mut self.entries[i];
            if entry.1 != organism {
                warn!(
                    "{accession} is listed under both '{}' and '{organism}'; using '{organism}'",
                    entry.1
                );
                entry.1 = organism;
            }
            return;
        }
        self.by_accession
            .insert(accession.clone(), self.entries.len());
        self.entries.push((accession, organism));
    }

    /// Organism of an accession
    #[must_use]
    pub fn organism(&self, accession: &str) -> Option<&str> {
        self.by_accession
            .get(accession)
            .map(|&i| self.entries[i].1.as_str())
    }

    /// `(accession, organism)` pairs in list order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, o)| (a.as_str(), o.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A: Into<String>, O: Into<String>> FromIterator<(A, O)> for OrganismMap {
    fn from_iter<T: IntoIterator<Item = (A, O)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (accession, organism) in iter {
            map.insert(accession, organism);
        }
        map
    }
}

/// Build a new index whose templates are organisms.
///
/// Every template index in every k-mer entry is replaced by its organism.
/// Organism totals count remapped entry occurrences; unique counts are
/// incremented once per k-mer for each distinct organism in its entry.
/// Descriptions list the organism's accessions in list order. Organisms are
/// ordered by first appearance in the list.
///
/// # Errors
///
/// Returns an error if a template of `index` has no organism in `organisms`.
pub fn remap_to_organisms(
    index: &KmerIndex,
    organisms: &OrganismMap,
) -> Result<KmerIndex, RemapError> {
    for info in index.templates() {
        if organisms.organism(info.id.as_str()).is_none() {
            return Err(RemapError::UnmappedAccession(info.id.to_string()));
        }
    }

    let mut templates: Vec<TemplateInfo> = Vec::new();
    let mut organism_index: HashMap<&str, TemplateIndex> = HashMap::new();
    for (accession, organism) in organisms.iter() {
        if index.template_index(&TemplateId::new(accession)).is_none() {
            continue;
        }
        let slot = match organism_index.get(organism) {
            Some(&slot) => slot,
            None => {
                let slot = TemplateIndex::try_from(templates.len())
                    .map_err(|_| RemapError::TooManyOrganisms)?;
                organism_index.insert(organism, slot);
                templates.push(TemplateInfo {
                    id: TemplateId::new(organism),
                    stats: TemplateStats::default(),
                    description: String::new(),
                });
                slot
            }
        };
        let description = &mut templates[slot as usize].description;
        if !description.is_empty() {
            description.push_str(", ");
        }
        description.push_str(accession);
    }

    // Organism of each source template, by source index
    let mut target = Vec::with_capacity(index.len());
    for info in index.templates() {
        let slot = organisms
            .organism(info.id.as_str())
            .and_then(|organism| organism_index.get(organism))
            .copied()
            .ok_or_else(|| RemapError::UnmappedAccession(info.id.to_string()))?;
        target.push(slot);
    }

    let mut kmers = HashMap::with_capacity(index.kmer_count());
    for (kmer, entry) in index.kmers() {
        let mut mapped: Vec<TemplateIndex> = Vec::with_capacity(entry.len());
        for &t in entry {
            let organism = target[t as usize];
            let stats = &mut templates[organism as usize].stats;
            stats.total_kmers += 1;
            if !mapped.contains(&organism) {
                stats.unique_kmers += 1;
            }
            mapped.push(organism);
        }
        kmers.insert(kmer.to_vec(), mapped);
    }

    debug!(
        "remapped {} templates onto {} organisms",
        index.len(),
        templates.len()
    );
    Ok(KmerIndex::from_parts(index.params().clone(), templates, kmers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::KmerParams;

    fn accession_index() -> KmerIndex {
        let mut index = KmerIndex::new(KmerParams::new(4));
        let chr = index.add_template(TemplateId::new("NC_1"), "chromosome");
        let plasmid = index.add_template(TemplateId::new("NC_2"), "plasmid");
        let other = index.add_template(TemplateId::new("NC_3"), "");
        index.insert(b"AAAA", chr);
        index.insert(b"AAAA", plasmid);
        index.insert(b"CCCC", chr);
        index.insert(b"CCCC", chr);
        index.insert(b"GGGG", other);
        index
    }

    #[test]
    fn test_remap_counts() {
        let organisms: OrganismMap = [
            ("NC_1", "E_coli"),
            ("NC_2", "E_coli"),
            ("NC_3", "S_aureus"),
        ]
        .into_iter()
        .collect();
        let remapped = remap_to_organisms(&accession_index(), &organisms).unwrap();

        assert_eq!(remapped.len(), 2);
        let ecoli = remapped.get(&TemplateId::new("E_coli")).unwrap();
        // AAAA twice, CCCC twice
        assert_eq!(ecoli.stats.total_kmers, 4);
        // once per k-mer
        assert_eq!(ecoli.stats.unique_kmers, 2);
        assert_eq!(ecoli.description, "NC_1, NC_2");

        let staph = remapped.get(&TemplateId::new("S_aureus")).unwrap();
        assert_eq!(staph.stats.total_kmers, 1);
        assert_eq!(staph.stats.unique_kmers, 1);

        assert_eq!(remapped.lookup(b"AAAA"), Some(&[0, 0][..]));
        assert_eq!(remapped.k(), 4);
    }

    #[test]
    fn test_remap_unmapped_accession() {
        let organisms: OrganismMap = [("NC_1", "E_coli"), ("NC_2", "E_coli")]
            .into_iter()
            .collect();
        let err = remap_to_organisms(&accession_index(), &organisms).unwrap_err();
        assert!(matches!(err, RemapError::UnmappedAccession(ref a) if a == "NC_3"));
    }

    #[test]
    fn test_organism_map_later_assignment_wins() {
        let mut map = OrganismMap::new();
        map.insert("acc", "first");
        map.insert("other", "elsewhere");
        map.insert("acc", "second");
        assert_eq!(map.len(), 2);
        assert_eq!(map.organism("acc"), Some("second"));
        assert_eq!(map.organism("missing"), None);

        let order: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(order, vec![("acc", "second"), ("other", "elsewhere")]);
    }

    #[test]
    fn test_unused_list_entries_are_ignored() {
        let organisms: OrganismMap = [
            ("NC_9", "Unused"),
            ("NC_1", "E_coli"),
            ("NC_2", "E_coli"),
            ("NC_3", "S_aureus"),
        ]
        .into_iter()
        .collect();
        let remapped = remap_to_organisms(&accession_index(), &organisms).unwrap();
        assert!(remapped.get(&TemplateId::new("Unused")).is_none());
        assert_eq!(remapped.templates()[0].id.as_str(), "E_coli");
    }
}
