use std::path::{Path, PathBuf};

use crate::database::organism::OrganismMap;
use crate::parsing::fasta::ParseError;

/// Parse an organism list file: `accession<TAB>organism` per line
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_organism_file(path: &Path) -> Result<OrganismMap, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_organism_text(&content)
}

/// Parse organism list text with columns: accession, organism.
///
/// Blank lines and lines starting with `#` are skipped. Fields are trimmed;
/// columns after the second are ignored.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a line has fewer than 2 fields or an
/// empty field, or if no entries are found.
pub fn parse_organism_text(text: &str) -> Result<OrganismMap, ParseError> {
    let mut organisms = OrganismMap::new();

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        // Line numbers in errors are 1-based for user friendliness
        let line_num = i + 1;

        let mut fields = line.split('\t').map(str::trim);
        let (Some(accession), Some(organism)) = (fields.next(), fields.next()) else {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has fewer than 2 tab-separated fields"
            )));
        };
        if accession.is_empty() || organism.is_empty() {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has an empty accession or organism"
            )));
        }

        organisms.insert(accession, organism);
    }

    if organisms.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No organisms found in file".to_string(),
        ));
    }

    Ok(organisms)
}

/// Parse a file listing one input path per line.
///
/// Relative paths are resolved against the list file's directory.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read.
pub fn parse_path_list(path: &Path) -> Result<Vec<PathBuf>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| base.join(line))
        .collect())
}
