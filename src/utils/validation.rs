//! Centralized validation of user-supplied parameters.

use crate::core::types::KmerParams;

/// Largest supported k-mer length
pub const MAX_KMER_SIZE: usize = 1024;

/// Parameter validation error types
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("K-mer size must be between 1 and {MAX_KMER_SIZE}, got {0}")]
    KmerSize(usize),
    #[error("Step size must be at least 1")]
    StepSize,
    #[error("Prefix '{prefix}' must be shorter than the k-mer size {k}")]
    PrefixTooLong { prefix: String, k: usize },
    #[error("Prefix '{0}' may only contain A, C, G and T")]
    PrefixAlphabet(String),
    #[error("Homology threshold must be in (0, 1], got {0}")]
    HomologyThreshold(f64),
    #[error("E-value threshold must be a non-negative number, got {0}")]
    Evalue(f64),
    #[error("Maximum iterations must be at least 1")]
    MaxIterations,
    #[error("Database uses k={database}, but k={requested} was requested")]
    KmerSizeMismatch { database: usize, requested: usize },
}

/// Validate window parameters before building or searching.
///
/// # Errors
///
/// Returns `ValidationError::KmerSize` if k is zero or too large,
/// `ValidationError::StepSize` if the step is zero, or a prefix error if the
/// prefix is not shorter than k or contains characters other than ACGT.
pub fn validate_kmer_params(params: &KmerParams) -> Result<(), ValidationError> {
    if params.k == 0 || params.k > MAX_KMER_SIZE {
        return Err(ValidationError::KmerSize(params.k));
    }
    if params.step == 0 {
        return Err(ValidationError::StepSize);
    }
    if params.prefix.len() >= params.k {
        return Err(ValidationError::PrefixTooLong {
            prefix: params.prefix_str(),
            k: params.k,
        });
    }
    if !params
        .prefix
        .iter()
        .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
    {
        return Err(ValidationError::PrefixAlphabet(params.prefix_str()));
    }
    Ok(())
}

/// # Errors
///
/// Returns `ValidationError::HomologyThreshold` unless `0 < threshold <= 1`.
pub fn validate_homology_threshold(threshold: f64) -> Result<(), ValidationError> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(ValidationError::HomologyThreshold(threshold))
    }
}

/// # Errors
///
/// Returns `ValidationError::Evalue` if the threshold is negative or NaN.
pub fn validate_evalue(evalue: f64) -> Result<(), ValidationError> {
    if evalue >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Evalue(evalue))
    }
}

/// # Errors
///
/// Returns `ValidationError::MaxIterations` if zero.
pub fn validate_max_iterations(max_iterations: usize) -> Result<(), ValidationError> {
    if max_iterations == 0 {
        Err(ValidationError::MaxIterations)
    } else {
        Ok(())
    }
}

/// Check a requested k-mer size against the size a database was built with.
///
/// # Errors
///
/// Returns `ValidationError::KmerSizeMismatch` if they differ.
pub fn check_database_kmer_size(database: usize, requested: usize) -> Result<(), ValidationError> {
    if database == requested {
        Ok(())
    } else {
        Err(ValidationError::KmerSizeMismatch {
            database,
            requested,
        })
    }
}
