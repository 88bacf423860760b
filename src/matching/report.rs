//! Tab-separated and JSON match reports.
//!
//! The table layout is fixed-width within tab-separated columns: template
//! names are left-aligned to 12 characters, counts right-aligned to 8, and
//! p-values and fractions printed in scientific notation with one decimal and
//! a signed two-digit exponent (`1.0e-05`).
//!
//! The `p_value` column holds the p-value corrected for the number of
//! templates in the database.

use std::io::{self, Write};

use serde::Serialize;

use crate::matching::engine::WtaHit;
use crate::matching::scoring::TemplateMatch;

const HEADER: &str = "Template\tScore\tExpected\tz\tp_value\tfrac_q\tfrac_d\tcoverage\tunique_Kmers_in_Template\tDescription";
const HEADER_WTA: &str = "Template\tScore\tExpected\tz\tp_value\tfrac_q\tfrac_d\tcoverage\ttotal_frac_q\ttotal_frac_d\ttotal_coverage\tunique_Kmers_in_Template\tDescription";
const HEADER_ROUNDED: &str = "#Template\tScore\tExpected\tz\tp_value\tfrac_q\tfrac_d\tcoverage\tKmers in Template\tDescription";
const HEADER_ROUNDED_WTA: &str = "#Template\tScore\tExpected\tz\tp_value\tfrac_q\tfrac_d\tcoverage\ttotal frac_q\ttotal frac_d\ttotal coverage\tKmers in Template\tDescription";

/// Writes match tables
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportWriter {
    rounded: bool,
}

impl ReportWriter {
    /// `rounded` prints the expected score as an integer and z with one decimal
    #[must_use]
    pub fn new(rounded: bool) -> Self {
        Self { rounded }
    }

    /// Write a ranked match table with its header line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_matches<W: Write>(&self, out: &mut W, matches: &[TemplateMatch]) -> io::Result<()> {
        writeln!(out, "{}", if self.rounded { HEADER_ROUNDED } else { HEADER })?;
        for m in matches {
            self.write_leading(out, m)?;
            self.write_trailing(out, m)?;
        }
        Ok(())
    }

    /// Write a winner-takes-all table with its header line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_wta<W: Write>(&self, out: &mut W, hits: &[WtaHit]) -> io::Result<()> {
        writeln!(
            out,
            "{}",
            if self.rounded {
                HEADER_ROUNDED_WTA
            } else {
                HEADER_WTA
            }
        )?;
        for hit in hits {
            self.write_leading(out, &hit.residual)?;
            write!(
                out,
                "\t{}\t{}\t{}",
                sci(hit.total_frac_query),
                sci(hit.total_frac_template),
                sci(hit.total_coverage)
            )?;
            self.write_trailing(out, &hit.residual)?;
        }
        Ok(())
    }

    /// Columns from the template name up to coverage
    fn write_leading<W: Write>(&self, out: &mut W, m: &TemplateMatch) -> io::Result<()> {
        let (expected, z) = if self.rounded {
            (format!("{:.0}", m.expected.round()), (m.z * 10.0).round() / 10.0)
        } else {
            (float_str(m.expected), m.z)
        };
        write!(
            out,
            "{:<12}\t{:>8}\t{:>8}\t{:>8.1}\t{}\t{}\t{}\t{}",
            m.template.as_str(),
            m.score,
            expected,
            z,
            sci(m.corrected_p),
            sci(m.frac_query),
            sci(m.frac_template),
            sci(m.coverage)
        )
    }

    fn write_trailing<W: Write>(&self, out: &mut W, m: &TemplateMatch) -> io::Result<()> {
        writeln!(out, "\t{:>8}\t{}", m.unique_kmers, m.description.trim())
    }
}

/// Write rows as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write, T: Serialize>(out: &mut W, rows: &[T]) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut *out, rows)?;
    writeln!(out).map_err(serde_json::Error::io)
}

/// One-decimal scientific notation with a signed exponent of at least two
/// digits, e.g. `5.0e-02`, `1.2e+03`
#[must_use]
pub fn sci(value: f64) -> String {
    if !value.is_finite() {
        return format!("{value}");
    }
    split_exponent(&format!("{value:.1e}"))
}

/// Shortest round-trip representation, always with a decimal point or a
/// signed two-digit exponent: `5.0`, `0.25`, `1e-05`
#[must_use]
pub fn float_str(value: f64) -> String {
    if !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        return split_exponent(&format!("{value:e}"));
    }
    let plain = format!("{value}");
    if plain.contains('.') {
        plain
    } else {
        format!("{plain}.0")
    }
}

/// Rewrite Rust's `1.0e-5` exponent form as `1.0e-05`
fn split_exponent(formatted: &str) -> String {
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted.to_string(),
    }
}
