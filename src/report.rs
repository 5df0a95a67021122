//! Fund report parser
//!
//! Extracts a structured [`Snapshot`] from free-form text pasted out of the
//! fund portal. The portal's layout is not contractually fixed (line breaks,
//! label/value adjacency and currency prefixes drift between releases), so
//! each fact is located by an independent anchored pattern search rather than
//! a positional parse. A field whose surrounding text varies still extracts
//! even when another field's does not.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Snapshot;

/// A required report field the parser failed to locate.
///
/// Variants are listed in the reporting order used by [`ExtractionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Date,
    Value,
    Units,
    Nav,
    OneYearReturn,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingField::Date => "date",
            MissingField::Value => "value",
            MissingField::Units => "units",
            MissingField::Nav => "NAV",
            MissingField::OneYearReturn => "one-year return",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction failure: one entry per missing required field, in fixed order
/// (date, value, units, NAV, one-year return). The input text is left
/// untouched so the caller can re-prompt and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not extract required report fields: {}", join_fields(.missing))]
pub struct ExtractionError {
    pub missing: Vec<MissingField>,
}

fn join_fields(missing: &[MissingField]) -> String {
    missing
        .iter()
        .map(MissingField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// "as of June 6, 2025" / "as of Sept 3 2024" - month name, day, 4-digit year,
// separated by whitespace/commas.
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)as\s+of\s+([A-Za-z]{3,9})\.?[\s,]+(\d{1,2})[\s,]+(\d{4})").unwrap()
});

// Decimal immediately followed by '%' and a whitespace-tolerant "1 yr" token.
static ONE_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([+-]?[0-9][0-9.,]*)%\s*1\s*yr").unwrap());

static VALUE_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)total\s+investment\s+value").unwrap());
static UNITS_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)total\s+units").unwrap());
static NAV_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)navpu").unwrap());
static PENDING_BUY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)pending\s+buy\s+order(?:\(s\)|s)?").unwrap());
static PENDING_SELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)pending\s+sell\s+order(?:\(s\)|s)?").unwrap());

// First run of number-ish characters after a label. Deliberately loose: a
// garbled token (say a lone dash) must be captured here and rejected by
// `clean_decimal` as absent, not skipped in favor of an unrelated number
// further down the text. Currency markers ("PHP", "P") carry none of these
// characters and are stepped over naturally.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9.,+-]+").unwrap());

/// Parse pasted portal text into a [`Snapshot`].
///
/// All five core facts (date, total value, total units, NAVPU, one-year
/// return) must be located; pending buy/sell are optional and default to
/// zero. On failure no snapshot is constructed and the returned
/// [`ExtractionError`] lists every field that could not be found.
pub fn parse_report(text: &str) -> Result<Snapshot, ExtractionError> {
    let source = text.replace('\r', "").trim().to_string();

    let observed_date = extract_date(&source);
    let one_year_return_pct = extract_one_year_return(&source);
    // Negative magnitudes for the three core figures are reporting noise;
    // treat them the same as "not found".
    let total_value = number_after_label(&source, &VALUE_LABEL_RE).filter(|v| !v.is_sign_negative());
    let total_units = number_after_label(&source, &UNITS_LABEL_RE).filter(|v| !v.is_sign_negative());
    let nav_per_unit = number_after_label(&source, &NAV_LABEL_RE).filter(|v| !v.is_sign_negative());
    let pending_buy = number_after_label(&source, &PENDING_BUY_RE).unwrap_or(Decimal::ZERO);
    let pending_sell = number_after_label(&source, &PENDING_SELL_RE).unwrap_or(Decimal::ZERO);

    let mut missing = Vec::new();
    if observed_date.is_none() {
        missing.push(MissingField::Date);
    }
    if total_value.is_none() {
        missing.push(MissingField::Value);
    }
    if total_units.is_none() {
        missing.push(MissingField::Units);
    }
    if nav_per_unit.is_none() {
        missing.push(MissingField::Nav);
    }
    if one_year_return_pct.is_none() {
        missing.push(MissingField::OneYearReturn);
    }

    if let (
        Some(observed_date),
        Some(total_value),
        Some(total_units),
        Some(nav_per_unit),
        Some(one_year_return_pct),
    ) = (
        observed_date,
        total_value,
        total_units,
        nav_per_unit,
        one_year_return_pct,
    ) {
        debug!(
            "parsed report: {} NAVPU {} x {} units = {}",
            observed_date, nav_per_unit, total_units, total_value
        );
        Ok(Snapshot {
            id: snapshot_id(&source),
            observed_date,
            nav_per_unit,
            total_units,
            total_value,
            one_year_return_pct,
            pending_buy,
            pending_sell,
            source_text: source,
        })
    } else {
        let err = ExtractionError { missing };
        warn!("report extraction failed: {}", err);
        Err(err)
    }
}

/// Content-derived opaque identifier for a snapshot.
fn snapshot_id(source: &str) -> String {
    let hex = blake3::hash(source.as_bytes()).to_hex();
    hex.as_str()[..16].to_string()
}

fn extract_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(text)?;
    let month = month_number(caps.get(1)?.as_str())?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    // Invalid calendar combinations (e.g. Feb 30) count as absent.
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Month name to number, full or abbreviated ("September", "Sept", "sep").
fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let prefix = lower.get(..3)?;
    match prefix {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

fn extract_one_year_return(text: &str) -> Option<Decimal> {
    let caps = ONE_YEAR_RE.captures(text)?;
    clean_decimal(caps.get(1)?.as_str())
}

/// Nearest numeric token following the label match, parsed with
/// [`clean_decimal`]. `None` when the label itself is absent or the token
/// does not survive parsing.
fn number_after_label(text: &str, label: &Regex) -> Option<Decimal> {
    let found = label.find(text)?;
    let tail = &text[found.end()..];
    let token = NUMBER_RE.find(tail)?;
    clean_decimal(token.as_str())
}

/// Shared numeric rule: keep only digits, comma, period and minus, strip the
/// comma thousands separators, then parse. A token with no digits or that
/// fails to parse is absent, never zero.
fn clean_decimal(raw: &str) -> Option<Decimal> {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    let normalized = filtered.replace(',', "");
    if !normalized.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FULL_REPORT: &str = "\
Balanced Equity Fund
as of June 6, 2025
+12.34% 1 yr
Total Investment Value PHP 6,329.87
Total Units 52.1378
NAVPU PHP 121.4056
Pending Buy Order(s) PHP 250.00
Pending Sell Order(s) PHP 0.00
";

    #[test]
    fn test_parse_full_report() {
        let snapshot = parse_report(FULL_REPORT).unwrap();
        assert_eq!(
            snapshot.observed_date,
            NaiveDate::from_ymd_opt(2025, 6, 6).unwrap()
        );
        assert_eq!(snapshot.total_value, dec!(6329.87));
        assert_eq!(snapshot.total_units, dec!(52.1378));
        assert_eq!(snapshot.nav_per_unit, dec!(121.4056));
        assert_eq!(snapshot.one_year_return_pct, dec!(12.34));
        assert_eq!(snapshot.pending_buy, dec!(250.00));
        assert_eq!(snapshot.pending_sell, dec!(0.00));
    }

    #[test]
    fn test_parse_multi_line_label_value_split() {
        // Same logical fields spread across lines with the value below the
        // label, as the portal renders on narrow screens.
        let text = "\
as of Sept 3 2024

Total Investment Value
P 10,500.00

Total Units
100.0000

NAVPU
P 105.00

-3.5% 1 yr
";
        let snapshot = parse_report(text).unwrap();
        assert_eq!(
            snapshot.observed_date,
            NaiveDate::from_ymd_opt(2024, 9, 3).unwrap()
        );
        assert_eq!(snapshot.total_value, dec!(10500.00));
        assert_eq!(snapshot.total_units, dec!(100.0000));
        assert_eq!(snapshot.nav_per_unit, dec!(105.00));
        assert_eq!(snapshot.one_year_return_pct, dec!(-3.5));
        // Pending orders absent from the text default to zero.
        assert_eq!(snapshot.pending_buy, Decimal::ZERO);
        assert_eq!(snapshot.pending_sell, Decimal::ZERO);
    }

    #[test]
    fn test_missing_date_reported() {
        let text = "\
Total Investment Value PHP 6,329.87
Total Units 52.1378
NAVPU 121.4056
12.34% 1 yr
";
        let err = parse_report(text).unwrap_err();
        assert_eq!(err.missing, vec![MissingField::Date]);
    }

    #[test]
    fn test_missing_fields_reported_in_fixed_order() {
        let err = parse_report("nothing useful here").unwrap_err();
        assert_eq!(
            err.missing,
            vec![
                MissingField::Date,
                MissingField::Value,
                MissingField::Units,
                MissingField::Nav,
                MissingField::OneYearReturn,
            ]
        );
        let msg = err.to_string();
        assert!(msg.contains("date, value, units, NAV, one-year return"));
    }

    #[test]
    fn test_thousands_separators_are_idempotent() {
        let with_sep = parse_report(FULL_REPORT).unwrap();
        let without_sep = parse_report(&FULL_REPORT.replace("6,329.87", "6329.87")).unwrap();
        assert_eq!(with_sep.total_value, without_sep.total_value);
        assert_eq!(with_sep.total_value, dec!(6329.87));
    }

    #[test]
    fn test_garbled_number_is_treated_as_absent() {
        // Label present but the following token has no digits.
        let text = "\
as of June 6, 2025
Total Investment Value PHP -
Total Units 52.1378
NAVPU 121.4056
12.34% 1 yr
";
        let err = parse_report(text).unwrap_err();
        assert_eq!(err.missing, vec![MissingField::Value]);
    }

    #[test]
    fn test_invalid_calendar_date_is_absent() {
        let text = FULL_REPORT.replace("June 6, 2025", "February 30, 2025");
        let err = parse_report(&text).unwrap_err();
        assert_eq!(err.missing, vec![MissingField::Date]);
    }

    #[test]
    fn test_month_abbreviations() {
        assert_eq!(month_number("Jan"), Some(1));
        assert_eq!(month_number("sept"), Some(9));
        assert_eq!(month_number("December"), Some(12));
        assert_eq!(month_number("smarch"), None);
    }

    #[test]
    fn test_clean_decimal() {
        assert_eq!(clean_decimal("6,329.87"), Some(dec!(6329.87)));
        assert_eq!(clean_decimal("6329.87"), Some(dec!(6329.87)));
        assert_eq!(clean_decimal("PHP 1,000"), Some(dec!(1000)));
        assert_eq!(clean_decimal("-42.5"), Some(dec!(-42.5)));
        assert_eq!(clean_decimal("---"), None);
        assert_eq!(clean_decimal(""), None);
        // Multiple decimal points cannot parse; absent, not zero.
        assert_eq!(clean_decimal("1.2.3"), None);
    }

    #[test]
    fn test_source_text_is_normalized_and_retained() {
        let text = format!("\r\n{}\r\n", FULL_REPORT.replace('\n', "\r\n"));
        let snapshot = parse_report(&text).unwrap();
        assert!(!snapshot.source_text.contains('\r'));
        assert!(snapshot.source_text.starts_with("Balanced Equity Fund"));
        assert!(snapshot.source_text.contains("NAVPU PHP 121.4056"));
    }

    #[test]
    fn test_snapshot_id_is_stable_for_identical_text() {
        let a = parse_report(FULL_REPORT).unwrap();
        let b = parse_report(FULL_REPORT).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 16);

        let c = parse_report(&FULL_REPORT.replace("52.1378", "53.0000")).unwrap();
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_one_year_return_requires_adjacent_percent() {
        // "12.34 %" with a space before the percent sign is not the 1-yr
        // figure; the field should be reported missing.
        let text = FULL_REPORT.replace("+12.34% 1 yr", "12.34 % 1 yr");
        let err = parse_report(&text).unwrap_err();
        assert_eq!(err.missing, vec![MissingField::OneYearReturn]);
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let text = FULL_REPORT
            .replace("Total Investment Value", "TOTAL INVESTMENT VALUE")
            .replace("Total Units", "total units")
            .replace("NAVPU", "NavPU")
            .replace("as of", "AS OF");
        let snapshot = parse_report(&text).unwrap();
        assert_eq!(snapshot.total_units, dec!(52.1378));
    }
}
