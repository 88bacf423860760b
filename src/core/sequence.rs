//! Nucleotide sequence helpers: reverse complement and k-mer windows.

use crate::core::types::KmerParams;

/// Watson-Crick complement of an uppercase base.
///
/// Anything other than `A`, `C`, `G` or `T` (ambiguity codes, `N`, gaps) is
/// returned unchanged.
#[inline]
#[must_use]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        other => other,
    }
}

/// Reverse complement of a sequence
#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Iterate over the k-mer windows of `seq` that pass the prefix filter.
///
/// Window starts are `0, step, 2 * step, ...` while `start + k <= seq.len()`.
/// Sequences shorter than `k` yield nothing.
pub fn kmer_windows<'a>(seq: &'a [u8], params: &'a KmerParams) -> impl Iterator<Item = &'a [u8]> {
    let k = params.k;
    let last_start = if k == 0 || seq.len() < k {
        None
    } else {
        Some(seq.len() - k)
    };

    last_start
        .into_iter()
        .flat_map(move |last| (0..=last).step_by(params.step.max(1)))
        .filter(move |&start| seq[start..].starts_with(&params.prefix))
        .map(move |start| &seq[start..start + k])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"AACG"), b"CGTT");
        assert_eq!(reverse_complement(b"AAAATTTT"), b"AAAATTTT");
        assert_eq!(reverse_complement(b""), b"");
    }

    #[test]
    fn test_reverse_complement_is_involution() {
        for seq in [&b"ACGTTGCA"[..], b"GATTACA", b"CCCCGGGGAT", b"T"] {
            assert_eq!(reverse_complement(&reverse_complement(seq)), seq);
        }
    }

    #[test]
    fn test_reverse_complement_passes_ambiguity_codes() {
        assert_eq!(reverse_complement(b"ANRG"), b"CRNT");
        assert_eq!(reverse_complement(b"N-A"), b"T-N");
    }

    #[test]
    fn test_windows_all() {
        let params = KmerParams::new(4);
        let windows: Vec<&[u8]> = kmer_windows(b"AAAATTTT", &params).collect();
        assert_eq!(windows.len(), 5);
        assert_eq!(windows[0], b"AAAA");
        assert_eq!(windows[4], b"TTTT");
    }

    #[test]
    fn test_windows_short_sequence() {
        let params = KmerParams::new(16);
        assert_eq!(kmer_windows(b"ACGT", &params).count(), 0);
    }

    #[test]
    fn test_windows_exact_length() {
        let params = KmerParams::new(4);
        let windows: Vec<&[u8]> = kmer_windows(b"ACGT", &params).collect();
        assert_eq!(windows, vec![&b"ACGT"[..]]);
    }

    #[test]
    fn test_windows_with_step() {
        let params = KmerParams::new(3).with_step(2);
        let windows: Vec<&[u8]> = kmer_windows(b"ACGTACG", &params).collect();
        assert_eq!(windows, vec![&b"ACG"[..], b"GTA", b"ACG"]);
    }

    #[test]
    fn test_windows_with_prefix() {
        let params = KmerParams::new(3).with_prefix("A");
        let windows: Vec<&[u8]> = kmer_windows(b"ACGAAT", &params).collect();
        assert_eq!(windows, vec![&b"ACG"[..], b"AAT"]);
    }

    #[test]
    fn test_prefix_longer_than_k() {
        // The prefix is matched against the sequence, not the window
        let params = KmerParams::new(2).with_prefix("ACG");
        let windows: Vec<&[u8]> = kmer_windows(b"ACGTAC", &params).collect();
        assert_eq!(windows, vec![&b"AC"[..]]);
    }
}
