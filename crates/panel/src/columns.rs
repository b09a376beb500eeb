//! Header resolution: named identity columns and year-bearing columns.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::PanelError;

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("digit-run pattern compiles"))
}

/// Pull a 4-digit year out of a column name or label.
///
/// Only maximal runs of exactly four digits count, so "pci_1947" yields 1947
/// while "code_01001" yields nothing. Repeats of the same year are fine;
/// two different years in one label are an error.
pub fn extract_year(label: &str) -> Result<Option<i32>, String> {
    let mut found: Option<i32> = None;
    for m in digit_runs().find_iter(label) {
        if m.as_str().len() != 4 {
            continue;
        }
        let year: i32 = m
            .as_str()
            .parse()
            .map_err(|_| format!("label {label:?}: bad year digits"))?;
        match found {
            Some(prev) if prev != year => {
                return Err(format!(
                    "label {label:?} names more than one year ({prev}, {year})"
                ));
            }
            _ => found = Some(year),
        }
    }
    Ok(found)
}

/// Position of a named column. Comparison trims both sides; with
/// `ignore_case` it also lowercases them.
pub fn resolve_column(
    source: &str,
    headers: &[String],
    name: &str,
    ignore_case: bool,
) -> Result<usize, PanelError> {
    let wanted = normalize_header(name, ignore_case);
    let mut hits = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| normalize_header(h, ignore_case) == wanted)
        .map(|(i, _)| i);

    let first = hits
        .next()
        .ok_or_else(|| PanelError::column(source, format!("missing column '{name}'")))?;
    if hits.next().is_some() {
        return Err(PanelError::column(
            source,
            format!("column '{name}' appears more than once"),
        ));
    }
    Ok(first)
}

pub fn normalize_header(header: &str, ignore_case: bool) -> String {
    let trimmed = header.trim();
    if ignore_case {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// Map each year-bearing column to its year, skipping the identity columns.
///
/// Fails when no label carries a year, when a label carries two, or when two
/// columns claim the same year.
pub fn resolve_year_columns(
    source: &str,
    labels: &[String],
    skip: &[usize],
) -> Result<Vec<(usize, i32)>, PanelError> {
    let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();

    for (idx, label) in labels.iter().enumerate() {
        if skip.contains(&idx) {
            continue;
        }
        let year = extract_year(label).map_err(|detail| PanelError::column(source, detail))?;
        let Some(year) = year else {
            log::debug!("{source}: column {idx} ({label:?}) carries no year, ignored");
            continue;
        };
        if let Some(prev) = by_year.insert(year, idx) {
            return Err(PanelError::column(
                source,
                format!("columns {prev} and {idx} both map to year {year}"),
            ));
        }
    }

    if by_year.is_empty() {
        return Err(PanelError::column(
            source,
            "no column label contains a 4-digit year",
        ));
    }

    let mut columns: Vec<(usize, i32)> = by_year.into_iter().map(|(y, i)| (i, y)).collect();
    columns.sort_by_key(|(_, y)| *y);
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn year_from_plain_and_prefixed_labels() {
        assert_eq!(extract_year("1947"), Ok(Some(1947)));
        assert_eq!(extract_year("pci_1962"), Ok(Some(1962)));
        assert_eq!(extract_year("Population, July 1 1950 (thousands)"), Ok(Some(1950)));
        assert_eq!(extract_year("1950 estimate, revised 1950"), Ok(Some(1950)));
    }

    #[test]
    fn no_year_in_label() {
        assert_eq!(extract_year("state"), Ok(None));
        assert_eq!(extract_year("GeoFips 01000"), Ok(None));
        assert_eq!(extract_year("v12"), Ok(None));
    }

    #[test]
    fn two_years_in_label_is_error() {
        let err = extract_year("1947 (1950 boundaries)").unwrap_err();
        assert!(err.contains("more than one year"));
    }

    #[test]
    fn resolve_column_trims_and_folds_case() {
        let headers = strings(&[" State ", "FY", "Federal_Share"]);
        assert_eq!(resolve_column("register", &headers, "state", true).unwrap(), 0);
        assert_eq!(resolve_column("register", &headers, "fy", true).unwrap(), 1);
        assert!(resolve_column("register", &headers, "fy", false).is_err());
    }

    #[test]
    fn resolve_column_missing_and_duplicate() {
        let headers = strings(&["state", "fips", "State"]);
        let err = resolve_column("income", &headers, "amount", false).unwrap_err();
        assert_eq!(err.kind(), "column_resolution");
        assert!(err.to_string().contains("missing column 'amount'"));

        let err = resolve_column("income", &headers, "state", true).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn year_columns_sorted_by_year() {
        let labels = strings(&["state", "fips", "1949", "1947", "1948"]);
        let cols = resolve_year_columns("income", &labels, &[0, 1]).unwrap();
        assert_eq!(cols, vec![(3, 1947), (4, 1948), (2, 1949)]);
    }

    #[test]
    fn year_columns_none_found() {
        let labels = strings(&["state", "fips", "a", "b"]);
        let err = resolve_year_columns("population", &labels, &[0, 1]).unwrap_err();
        assert!(err.to_string().contains("no column label contains a 4-digit year"));
    }

    #[test]
    fn year_columns_duplicate_year() {
        let labels = strings(&["state", "fips", "pop 1950", "1950"]);
        let err = resolve_year_columns("population", &labels, &[0, 1]).unwrap_err();
        assert!(err.to_string().contains("both map to year 1950"));
    }

    #[test]
    fn identity_columns_are_not_scanned() {
        // A code column labelled with a year-like string must not be read as data.
        let labels = strings(&["state 2000", "fips", "1950"]);
        let cols = resolve_year_columns("population", &labels, &[0, 1]).unwrap();
        assert_eq!(cols, vec![(2, 1950)]);
    }
}
