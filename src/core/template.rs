/// A named sequence as read from a FASTA/FASTQ file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Record name (first word of the header line)
    pub name: String,

    /// Rest of the header line, if any
    pub description: String,

    /// Uppercase bases
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(name: impl Into<String>, sequence: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sequence: sequence.as_ref().to_ascii_uppercase(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One template to be indexed: a name, a description and one or more sequence
/// segments.
///
/// Consecutive input records with the same name form a single template; each
/// record contributes one segment. K-mer windows never span two segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRecord {
    pub name: String,
    pub description: String,
    pub segments: Vec<Vec<u8>>,
}

impl TemplateRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            segments: Vec::new(),
        }
    }

    /// Convenience constructor for a single-segment template
    pub fn single(name: impl Into<String>, sequence: impl AsRef<[u8]>) -> Self {
        let mut record = Self::new(name, "");
        record.push_segment(sequence);
        record
    }

    pub fn push_segment(&mut self, sequence: impl AsRef<[u8]>) {
        self.segments.push(sequence.as_ref().to_ascii_uppercase());
    }

    /// Append a description fragment, joining with ", "
    pub fn append_description(&mut self, fragment: &str) {
        if self.description.is_empty() {
            self.description = fragment.to_string();
        } else {
            self.description.push_str(", ");
            self.description.push_str(fragment);
        }
    }

    /// Total number of bases across all segments
    #[must_use]
    pub fn total_length(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }
}

/// Groups consecutive records sharing a name into templates.
///
/// `rename` maps a record name to the template name (organism list); when it
/// returns a different name, the original record name is used as the
/// description fragment instead of the header description.
pub struct TemplateGrouper<I, F> {
    records: I,
    rename: F,
    pending: Option<TemplateRecord>,
}

impl<I, F> TemplateGrouper<I, F> {
    pub fn new(records: I, rename: F) -> Self {
        Self {
            records,
            rename,
            pending: None,
        }
    }
}

impl<I, F, E> Iterator for TemplateGrouper<I, F>
where
    I: Iterator<Item = Result<SequenceRecord, E>>,
    F: FnMut(&str) -> Result<String, E>,
{
    type Item = Result<TemplateRecord, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(e)) => return Some(Err(e)),
                None => return self.pending.take().map(Ok),
            };

            let name = match (self.rename)(&record.name) {
                Ok(name) => name,
                Err(e) => return Some(Err(e)),
            };
            let fragment = if name == record.name {
                record.description
            } else {
                record.name
            };

            if let Some(current) = self.pending.as_mut().filter(|c| c.name == name) {
                current.append_description(&fragment);
                current.push_segment(&record.sequence);
                continue;
            }

            let mut next = TemplateRecord::new(name, fragment);
            next.push_segment(&record.sequence);
            if let Some(done) = self.pending.replace(next) {
                return Some(Ok(done));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(records: Vec<SequenceRecord>) -> impl Iterator<Item = Result<SequenceRecord, String>> {
        records.into_iter().map(Ok)
    }

    #[test]
    fn test_grouper_merges_consecutive_names() {
        let records = vec![
            SequenceRecord::new("a", "ACGT").with_description("plasmid 1"),
            SequenceRecord::new("a", "GGCC").with_description("plasmid 2"),
            SequenceRecord::new("b", "TTTT"),
        ];
        let templates: Vec<TemplateRecord> = TemplateGrouper::new(ok(records), |n: &str| {
            Ok::<_, String>(n.to_string())
        })
        .collect::<Result<_, _>>()
        .unwrap();

        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].name, "a");
        assert_eq!(templates[0].segments.len(), 2);
        assert_eq!(templates[0].description, "plasmid 1, plasmid 2");
        assert_eq!(templates[1].name, "b");
        assert_eq!(templates[1].total_length(), 4);
    }

    #[test]
    fn test_grouper_renames_and_uses_accession_as_description() {
        let records = vec![
            SequenceRecord::new("acc1", "ACGT").with_description("chromosome"),
            SequenceRecord::new("acc2", "GGCC").with_description("plasmid"),
        ];
        let templates: Vec<TemplateRecord> = TemplateGrouper::new(ok(records), |_: &str| {
            Ok::<_, String>("E_coli".to_string())
        })
        .collect::<Result<_, _>>()
        .unwrap();

        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "E_coli");
        assert_eq!(templates[0].description, "acc1, acc2");
    }

    #[test]
    fn test_grouper_propagates_rename_error() {
        let records = vec![SequenceRecord::new("acc1", "ACGT")];
        let mut grouper = TemplateGrouper::new(ok(records), |n: &str| {
            Err::<String, _>(format!("unknown {n}"))
        });
        assert_eq!(grouper.next(), Some(Err("unknown acc1".to_string())));
    }

    #[test]
    fn test_segments_are_uppercased() {
        let record = TemplateRecord::single("t", "acgn");
        assert_eq!(record.segments[0], b"ACGN");
    }
}
