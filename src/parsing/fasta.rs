//! Sequence reader for FASTA and FASTQ files using noodles.
//!
//! The format is detected from the first byte of the input (`>` or `@`), and
//! gzip/bgzip compression from its magic number, so file extensions are not
//! consulted. A path of `-` reads standard input.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::{fasta, fastq};
use thiserror::Error;

use crate::core::template::SequenceRecord;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),
}

/// Sequence file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Fasta,
    Fastq,
}

impl SequenceFormat {
    /// Format indicated by the first byte of a file
    #[must_use]
    pub fn from_first_byte(byte: u8) -> Option<Self> {
        match byte {
            b'>' => Some(Self::Fasta),
            b'@' => Some(Self::Fastq),
            _ => None,
        }
    }
}

enum Inner {
    Fasta {
        reader: fasta::io::Reader<Box<dyn BufRead>>,
        definition: String,
        sequence: Vec<u8>,
    },
    Fastq {
        reader: fastq::io::Reader<Box<dyn BufRead>>,
        record: fastq::Record,
    },
    Empty,
}

/// Iterator over the records of a FASTA or FASTQ input
pub struct SequenceReader {
    inner: Inner,
}

impl SequenceReader {
    /// Open a file, or standard input for `-`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be opened, or
    /// `ParseError::InvalidFormat` if it is neither FASTA nor FASTQ.
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        let raw: Box<dyn Read> = if path == Path::new("-") {
            Box::new(io::stdin())
        } else {
            Box::new(File::open(path)?)
        };
        Self::from_reader(raw)
    }

    /// Wrap any reader; compression and format are detected from its content.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` on read failure, or
    /// `ParseError::InvalidFormat` if the content is neither FASTA nor FASTQ.
    pub fn from_reader<R: Read + 'static>(raw: R) -> Result<Self, ParseError> {
        let mut buffered = BufReader::new(raw);
        let mut reader: Box<dyn BufRead> = if buffered.fill_buf()?.starts_with(&GZIP_MAGIC) {
            Box::new(BufReader::new(MultiGzDecoder::new(buffered)))
        } else {
            Box::new(buffered)
        };

        skip_blank(&mut reader)?;
        let first = reader.fill_buf()?.first().copied();
        let inner = match first {
            None => Inner::Empty,
            Some(byte) => match SequenceFormat::from_first_byte(byte) {
                Some(SequenceFormat::Fasta) => Inner::Fasta {
                    reader: fasta::io::Reader::new(reader),
                    definition: String::new(),
                    sequence: Vec::new(),
                },
                Some(SequenceFormat::Fastq) => Inner::Fastq {
                    reader: fastq::io::Reader::new(reader),
                    record: fastq::Record::default(),
                },
                None => {
                    return Err(ParseError::InvalidFormat(format!(
                        "expected FASTA ('>') or FASTQ ('@'), found '{}'",
                        char::from(byte).escape_default()
                    )))
                }
            },
        };
        Ok(Self { inner })
    }

    /// Detected format; `None` for empty input
    #[must_use]
    pub fn format(&self) -> Option<SequenceFormat> {
        match self.inner {
            Inner::Fasta { .. } => Some(SequenceFormat::Fasta),
            Inner::Fastq { .. } => Some(SequenceFormat::Fastq),
            Inner::Empty => None,
        }
    }
}

impl Iterator for SequenceReader {
    type Item = Result<SequenceRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Fasta {
                reader,
                definition,
                sequence,
            } => next_fasta(reader, definition, sequence).transpose(),
            Inner::Fastq { reader, record } => next_fastq(reader, record).transpose(),
            Inner::Empty => None,
        }
    }
}

fn next_fasta(
    reader: &mut fasta::io::Reader<Box<dyn BufRead>>,
    definition: &mut String,
    sequence: &mut Vec<u8>,
) -> Result<Option<SequenceRecord>, ParseError> {
    definition.clear();
    if reader.read_definition(definition)? == 0 {
        return Ok(None);
    }
    sequence.clear();
    reader.read_sequence(sequence)?;

    let parsed: fasta::record::Definition = definition.parse().map_err(|e| {
        ParseError::Noodles(format!("Failed to parse FASTA definition '{definition}': {e}"))
    })?;
    let name = String::from_utf8_lossy(parsed.name()).into_owned();
    if name.is_empty() {
        return Err(ParseError::InvalidFormat(
            "FASTA record has no name".to_string(),
        ));
    }
    let description = parsed
        .description()
        .map(|d| String::from_utf8_lossy(d).into_owned())
        .unwrap_or_default();

    Ok(Some(
        SequenceRecord::new(name, sequence.as_slice()).with_description(description),
    ))
}

fn next_fastq(
    reader: &mut fastq::io::Reader<Box<dyn BufRead>>,
    record: &mut fastq::Record,
) -> Result<Option<SequenceRecord>, ParseError> {
    if reader.read_record(record)? == 0 {
        return Ok(None);
    }

    let name = String::from_utf8_lossy(record.name()).into_owned();
    if name.is_empty() {
        return Err(ParseError::InvalidFormat(
            "FASTQ record has no name".to_string(),
        ));
    }
    let description = String::from_utf8_lossy(record.description()).into_owned();

    Ok(Some(
        SequenceRecord::new(name, record.sequence()).with_description(description),
    ))
}

/// Consume leading blank lines
fn skip_blank<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<()> {
    loop {
        let buf = reader.fill_buf()?;
        let blank = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        if blank == 0 {
            return Ok(());
        }
        reader.consume(blank);
    }
}

/// Read every record of a file into memory.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a record is malformed.
pub fn read_sequences(path: &Path) -> Result<Vec<SequenceRecord>, ParseError> {
    SequenceReader::open(path)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn records_of(content: &'static [u8]) -> Vec<SequenceRecord> {
        SequenceReader::from_reader(content)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_read_fasta() {
        let records = records_of(b">seq1 first sequence\nacgt\nACGT\n>seq2\nTTTT\n");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "seq1");
        assert_eq!(records[0].description, "first sequence");
        assert_eq!(records[0].sequence, b"ACGTACGT");
        assert_eq!(records[1].name, "seq2");
        assert_eq!(records[1].description, "");
    }

    #[test]
    fn test_read_fastq() {
        let records = records_of(b"@read1 lane 1\nacgtn\n+\nIIIII\n@read2\nGGCC\n+\nIIII\n");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "read1");
        assert_eq!(records[0].sequence, b"ACGTN");
        assert_eq!(records[1].sequence, b"GGCC");
    }

    #[test]
    fn test_format_detection() {
        let fasta = SequenceReader::from_reader(&b"\n>s\nA\n"[..]).unwrap();
        assert_eq!(fasta.format(), Some(SequenceFormat::Fasta));

        let fastq = SequenceReader::from_reader(&b"@r\nA\n+\nI\n"[..]).unwrap();
        assert_eq!(fastq.format(), Some(SequenceFormat::Fastq));

        let empty = SequenceReader::from_reader(&b""[..]).unwrap();
        assert_eq!(empty.format(), None);
        assert_eq!(empty.count(), 0);
    }

    #[test]
    fn test_unknown_format() {
        let result = SequenceReader::from_reader(&b"name\tlength\n"[..]);
        assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_gzipped_file() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b">gz seq\nACGTTGCA\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut file = NamedTempFile::with_suffix(".fa.gz").unwrap();
        file.write_all(&compressed).unwrap();
        file.flush().unwrap();

        let records = read_sequences(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "gz");
        assert_eq!(records[0].sequence, b"ACGTTGCA");
    }

    #[test]
    fn test_missing_file() {
        let result = read_sequences(Path::new("/nonexistent/reads.fq"));
        assert!(matches!(result, Err(ParseError::Io(_))));
    }
}
