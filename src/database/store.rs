//! On-disk database format.
//!
//! A database is four bincode files sharing a path prefix:
//!
//! | file                 | content                                             |
//! |----------------------|-----------------------------------------------------|
//! | `<prefix>.kmers.bin` | header, template order, k-mer -> template indices   |
//! | `<prefix>.len.bin`   | template -> total k-mer count                       |
//! | `<prefix>.ulen.bin`  | template -> unique k-mer count                      |
//! | `<prefix>.desc.bin`  | template -> description                             |
//!
//! The three template tables list templates in index order. Each table can be
//! loaded on its own; [`load_database`] loads all four and checks that they
//! agree.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::types::{KmerParams, TemplateId};
use crate::database::index::{KmerIndex, TemplateIndex, TemplateInfo, TemplateStats};

/// Database format version for compatibility checking
pub const DATABASE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode database: {0}")]
    Decode(#[from] bincode::Error),

    #[error("Unsupported database version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("Inconsistent database: {0}")]
    Inconsistent(String),
}

/// One of the four database files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Kmers,
    Lengths,
    UniqueLengths,
    Descriptions,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Kmers,
        Table::Lengths,
        Table::UniqueLengths,
        Table::Descriptions,
    ];

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Table::Kmers => ".kmers.bin",
            Table::Lengths => ".len.bin",
            Table::UniqueLengths => ".ulen.bin",
            Table::Descriptions => ".desc.bin",
        }
    }

    /// File path of this table for a database prefix
    #[must_use]
    pub fn path(self, prefix: &Path) -> PathBuf {
        let mut name = prefix.as_os_str().to_owned();
        name.push(self.suffix());
        PathBuf::from(name)
    }
}

/// Parameters and provenance stored at the start of the k-mer table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseHeader {
    pub version: u32,
    pub created_at: String,
    pub k: usize,
    pub step: usize,
    pub prefix: Vec<u8>,
}

impl DatabaseHeader {
    fn for_params(params: &KmerParams) -> Self {
        Self {
            version: DATABASE_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            k: params.k,
            step: params.step,
            prefix: params.prefix.clone(),
        }
    }

    #[must_use]
    pub fn params(&self) -> KmerParams {
        KmerParams::new(self.k)
            .with_step(self.step)
            .with_prefix(&self.prefix)
    }
}

/// Contents of `<prefix>.kmers.bin`
#[derive(Debug, Clone, Deserialize)]
pub struct KmerTable {
    pub header: DatabaseHeader,
    pub templates: Vec<TemplateId>,
    pub kmers: HashMap<Vec<u8>, Vec<TemplateIndex>>,
}

/// Borrowed form of [`KmerTable`] with the same encoding
#[derive(Serialize)]
struct KmerTableRef<'a> {
    header: DatabaseHeader,
    templates: Vec<&'a TemplateId>,
    kmers: &'a HashMap<Vec<u8>, Vec<TemplateIndex>>,
}

/// Write all four tables for `index` under `prefix`.
///
/// # Errors
///
/// Returns an error if a file cannot be created or written.
pub fn save_database(index: &KmerIndex, prefix: &Path) -> Result<(), DatabaseError> {
    let templates = index.templates();

    write_table(
        &Table::Kmers.path(prefix),
        &KmerTableRef {
            header: DatabaseHeader::for_params(index.params()),
            templates: templates.iter().map(|t| &t.id).collect(),
            kmers: index.kmer_map(),
        },
    )?;
    write_table(
        &Table::Lengths.path(prefix),
        &templates
            .iter()
            .map(|t| (&t.id, t.stats.total_kmers))
            .collect::<Vec<_>>(),
    )?;
    write_table(
        &Table::UniqueLengths.path(prefix),
        &templates
            .iter()
            .map(|t| (&t.id, t.stats.unique_kmers))
            .collect::<Vec<_>>(),
    )?;
    write_table(
        &Table::Descriptions.path(prefix),
        &templates
            .iter()
            .map(|t| (&t.id, t.description.as_str()))
            .collect::<Vec<_>>(),
    )?;

    debug!(
        "saved {} templates and {} k-mers to {}",
        index.len(),
        index.kmer_count(),
        prefix.display()
    );
    Ok(())
}

/// Load and cross-check all four tables under `prefix`.
///
/// # Errors
///
/// Returns an error if a table cannot be read or decoded, or if the tables
/// are inconsistent with each other.
pub fn load_database(prefix: &Path) -> Result<KmerIndex, DatabaseError> {
    let table = load_kmer_table(prefix)?;
    let lengths = load_lengths(prefix)?;
    let unique_lengths = load_unique_lengths(prefix)?;
    let descriptions = load_descriptions(prefix)?;

    let ids = &table.templates;
    check_keys(ids, lengths.iter().map(|(id, _)| id), Table::Lengths)?;
    check_keys(ids, unique_lengths.iter().map(|(id, _)| id), Table::UniqueLengths)?;
    check_keys(ids, descriptions.iter().map(|(id, _)| id), Table::Descriptions)?;

    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if id.as_str().is_empty() {
            return Err(DatabaseError::Inconsistent("empty template id".to_string()));
        }
        if !seen.insert(id) {
            return Err(DatabaseError::Inconsistent(format!(
                "duplicate template id '{id}'"
            )));
        }
    }

    let k = table.header.k;
    for (kmer, entry) in &table.kmers {
        if kmer.len() != k {
            return Err(DatabaseError::Inconsistent(format!(
                "k-mer '{}' has length {}, expected {k}",
                String::from_utf8_lossy(kmer),
                kmer.len()
            )));
        }
        if let Some(bad) = entry.iter().find(|&&t| t as usize >= ids.len()) {
            return Err(DatabaseError::Inconsistent(format!(
                "k-mer '{}' references unknown template {bad}",
                String::from_utf8_lossy(kmer)
            )));
        }
    }

    let templates = lengths
        .into_iter()
        .zip(unique_lengths)
        .zip(descriptions)
        .map(|(((id, total_kmers), (_, unique_kmers)), (_, description))| {
            if unique_kmers > total_kmers {
                return Err(DatabaseError::Inconsistent(format!(
                    "template '{id}' has {unique_kmers} unique k-mers but {total_kmers} in total"
                )));
            }
            Ok(TemplateInfo {
                id,
                stats: TemplateStats {
                    total_kmers,
                    unique_kmers,
                },
                description,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "loaded {} templates and {} k-mers from {} (created {})",
        templates.len(),
        table.kmers.len(),
        prefix.display(),
        table.header.created_at
    );
    Ok(KmerIndex::from_parts(
        table.header.params(),
        templates,
        table.kmers,
    ))
}

/// Load `<prefix>.kmers.bin` on its own.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded, or has an
/// unsupported version.
pub fn load_kmer_table(prefix: &Path) -> Result<KmerTable, DatabaseError> {
    let table: KmerTable = read_table(&Table::Kmers.path(prefix))?;
    if table.header.version != DATABASE_VERSION {
        return Err(DatabaseError::Version {
            found: table.header.version,
            expected: DATABASE_VERSION,
        });
    }
    Ok(table)
}

/// Load `<prefix>.len.bin` (total k-mers per template) on its own.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_lengths(prefix: &Path) -> Result<Vec<(TemplateId, u64)>, DatabaseError> {
    read_table(&Table::Lengths.path(prefix))
}

/// Load `<prefix>.ulen.bin` (unique k-mers per template) on its own.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_unique_lengths(prefix: &Path) -> Result<Vec<(TemplateId, u64)>, DatabaseError> {
    read_table(&Table::UniqueLengths.path(prefix))
}

/// Load `<prefix>.desc.bin` on its own.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_descriptions(prefix: &Path) -> Result<Vec<(TemplateId, String)>, DatabaseError> {
    read_table(&Table::Descriptions.path(prefix))
}

fn write_table<T: Serialize>(path: &Path, value: &T) -> Result<(), DatabaseError> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<T, DatabaseError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

fn check_keys<'a>(
    expected: &[TemplateId],
    found: impl ExactSizeIterator<Item = &'a TemplateId>,
    table: Table,
) -> Result<(), DatabaseError> {
    if found.len() != expected.len() {
        return Err(DatabaseError::Inconsistent(format!(
            "{} lists {} templates, k-mer table lists {}",
            table.suffix(),
            found.len(),
            expected.len()
        )));
    }
    if let Some((want, got)) = expected.iter().zip(found).find(|(a, b)| a != b) {
        return Err(DatabaseError::Inconsistent(format!(
            "{} lists template '{got}' where the k-mer table has '{want}'",
            table.suffix()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::TemplateRecord;
    use crate::database::builder::IndexBuilder;
    use tempfile::TempDir;

    fn sample_index() -> KmerIndex {
        let builder = IndexBuilder::new(KmerParams::new(4).with_prefix("A"));
        let mut session = builder.session();
        for (name, seq) in [("t1", "AACGTTAGCA"), ("t2", "ATTACGGAACT")] {
            let mut record = TemplateRecord::single(name, seq);
            record.append_description(&format!("{name} description"));
            builder.add_template(&mut session, &record).unwrap();
        }
        session.into_index()
    }

    #[test]
    fn test_table_paths() {
        let prefix = Path::new("/data/db/bacteria");
        assert_eq!(
            Table::Kmers.path(prefix),
            PathBuf::from("/data/db/bacteria.kmers.bin")
        );
        assert_eq!(
            Table::UniqueLengths.path(prefix),
            PathBuf::from("/data/db/bacteria.ulen.bin")
        );
    }

    #[test]
    fn test_save_load_preserves_index() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("db");
        let index = sample_index();

        save_database(&index, &prefix).unwrap();
        for table in Table::ALL {
            assert!(table.path(&prefix).exists());
        }

        let loaded = load_database(&prefix).unwrap();
        assert_eq!(loaded.params(), index.params());
        assert_eq!(loaded.templates(), index.templates());
        assert_eq!(loaded.kmer_count(), index.kmer_count());
        for (kmer, entry) in index.kmers() {
            assert_eq!(loaded.lookup(kmer), Some(entry));
        }
        assert_eq!(
            loaded.template_index(&TemplateId::new("t2")),
            Some(1)
        );
    }

    #[test]
    fn test_tables_load_independently() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("db");
        save_database(&sample_index(), &prefix).unwrap();

        let lengths = load_lengths(&prefix).unwrap();
        let descriptions = load_descriptions(&prefix).unwrap();
        let table = load_kmer_table(&prefix).unwrap();

        assert_eq!(lengths.len(), 2);
        assert_eq!(lengths[0].0.as_str(), "t1");
        assert_eq!(descriptions[1].1, "t2 description");
        assert_eq!(table.header.k, 4);
        assert_eq!(table.header.prefix, b"A");
        assert_eq!(table.header.version, DATABASE_VERSION);
    }

    #[test]
    fn test_seeded_build_after_round_trip() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("db");
        let params = KmerParams::new(4);
        let builder = IndexBuilder::new(params);

        let mut single = builder.session();
        let mut first = builder.session();
        let t1 = TemplateRecord::single("t1", "ACGTTGCAAGG");
        let t2 = TemplateRecord::single("t2", "ACGTTTTCCAG");
        builder.add_template(&mut single, &t1).unwrap();
        builder.add_template(&mut single, &t2).unwrap();
        builder.add_template(&mut first, &t1).unwrap();

        save_database(first.index(), &prefix).unwrap();
        let mut seeded = builder.seed(load_database(&prefix).unwrap()).unwrap();
        builder.add_template(&mut seeded, &t2).unwrap();

        assert_eq!(seeded.index().templates(), single.index().templates());
        for (kmer, entry) in single.index().kmers() {
            assert_eq!(seeded.index().lookup(kmer), Some(entry));
        }
    }

    #[test]
    fn test_missing_table_is_error() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("db");
        save_database(&sample_index(), &prefix).unwrap();
        std::fs::remove_file(Table::Descriptions.path(&prefix)).unwrap();

        assert!(matches!(
            load_database(&prefix),
            Err(DatabaseError::Io(_))
        ));
    }

    #[test]
    fn test_mismatched_tables_are_rejected() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("db");
        save_database(&sample_index(), &prefix).unwrap();

        let mut lengths = load_lengths(&prefix).unwrap();
        lengths.swap(0, 1);
        write_table(&Table::Lengths.path(&prefix), &lengths).unwrap();

        let err = load_database(&prefix).unwrap_err();
        assert!(matches!(err, DatabaseError::Inconsistent(_)));
        assert!(err.to_string().contains(".len.bin"));
    }

    #[test]
    fn test_unique_above_total_is_rejected() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("db");
        save_database(&sample_index(), &prefix).unwrap();

        let mut unique = load_unique_lengths(&prefix).unwrap();
        unique[0].1 = 1_000;
        write_table(&Table::UniqueLengths.path(&prefix), &unique).unwrap();

        assert!(matches!(
            load_database(&prefix),
            Err(DatabaseError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_wrong_kmer_length_is_rejected() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("db");
        let mut index = KmerIndex::new(KmerParams::new(4));
        let t = index.add_template(TemplateId::new("t"), "");
        index.insert(b"ACGT", t);
        save_database(&index, &prefix).unwrap();

        let mut table = load_kmer_table(&prefix).unwrap();
        table.kmers.insert(b"ACG".to_vec(), vec![0]);
        let broken = KmerTableRef {
            header: table.header.clone(),
            templates: table.templates.iter().collect(),
            kmers: &table.kmers,
        };
        write_table(&Table::Kmers.path(&prefix), &broken).unwrap();

        let err = load_database(&prefix).unwrap_err();
        assert!(err.to_string().contains("length 3"));
    }
}
