use serde::{Deserialize, Serialize};

/// Default k-mer length
pub const DEFAULT_KMER_SIZE: usize = 16;

/// Default stride between indexed windows
pub const DEFAULT_STEP: usize = 1;

/// Identifier of a template (reference genome) in the database
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub String);

impl TemplateId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Window parameters shared by index building and query profiling.
///
/// A window of width `k` starting at `start` is used only if the bases at
/// `start..start + prefix.len()` equal `prefix`. An empty prefix accepts every
/// window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmerParams {
    /// K-mer length
    pub k: usize,

    /// Distance between consecutive window starts
    pub step: usize,

    /// Required leading bases of a window (uppercase)
    pub prefix: Vec<u8>,
}

impl Default for KmerParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_KMER_SIZE,
            step: DEFAULT_STEP,
            prefix: Vec::new(),
        }
    }
}

impl KmerParams {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = prefix.as_ref().to_ascii_uppercase();
        self
    }

    /// The same parameters with a stride of one, as used for scanning queries
    #[must_use]
    pub fn query_scan(&self) -> Self {
        Self {
            k: self.k,
            step: 1,
            prefix: self.prefix.clone(),
        }
    }

    /// Prefix as a printable string
    #[must_use]
    pub fn prefix_str(&self) -> String {
        String::from_utf8_lossy(&self.prefix).into_owned()
    }
}
