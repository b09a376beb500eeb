//! Project register → actual funding per (state name, year).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::columns::resolve_column;
use crate::config::RegisterConfig;
use crate::error::PanelError;
use crate::model::ActualFunding;
use crate::normalize::coerce_numeric;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterStats {
    pub rows_read: usize,
    pub absent_name: usize,
    pub absent_year: usize,
    pub absent_amount: usize,
    pub groups: usize,
}

/// Expand a two-digit register year ("47") to its four-digit form (1947).
///
/// The register only covers the 1940s-1960s, so every two-digit year is in
/// the 1900s. Anything that is not a number in 0..=99 is absent.
pub fn expand_two_digit_year(raw: &str) -> Option<i32> {
    let cleaned = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    let n: i32 = cleaned.parse().ok()?;
    (0..=99).contains(&n).then_some(1900 + n)
}

/// Sum register funding by (trimmed state name, year).
///
/// Header matching ignores case. Rows with no name or an unreadable year are
/// skipped; unreadable amounts are left out of the sum but still counted as
/// projects of their group.
pub fn aggregate_register(
    data: &str,
    config: &RegisterConfig,
) -> Result<(Vec<ActualFunding>, RegisterStats), PanelError> {
    const SOURCE: &str = "register";

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(config.delimiter_byte()?)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PanelError::csv(SOURCE, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let name_idx = resolve_column(SOURCE, &headers, &config.name_column, true)?;
    let year_idx = resolve_column(SOURCE, &headers, &config.year_column, true)?;
    let amount_idx = resolve_column(SOURCE, &headers, &config.amount_column, true)?;

    let mut stats = RegisterStats::default();
    // (name, year) -> (total, projects, absent amounts)
    let mut groups: BTreeMap<(String, i32), (f64, usize, usize)> = BTreeMap::new();

    for record in reader.records() {
        let record = record.map_err(|e| PanelError::csv(SOURCE, e))?;
        stats.rows_read += 1;

        let name = record.get(name_idx).unwrap_or("").trim();
        if name.is_empty() {
            stats.absent_name += 1;
            continue;
        }

        let raw_year = record.get(year_idx).unwrap_or("");
        let Some(year) = expand_two_digit_year(raw_year) else {
            stats.absent_year += 1;
            log::debug!("register: {name}: unreadable year {raw_year:?}, row skipped");
            continue;
        };

        let raw_amount = record.get(amount_idx).unwrap_or("");
        let amount = coerce_numeric(raw_amount);

        let entry = groups.entry((name.to_string(), year)).or_insert((0.0, 0, 0));
        entry.1 += 1;
        match amount {
            Some(a) => entry.0 += a,
            None => {
                stats.absent_amount += 1;
                entry.2 += 1;
                log::debug!("register: {name} {year}: unreadable amount {raw_amount:?}, not summed");
            }
        }
    }

    let actuals: Vec<ActualFunding> = groups
        .into_iter()
        .map(|((name, year), (total, project_count, absent_amounts))| ActualFunding {
            name,
            year,
            total,
            project_count,
            absent_amounts,
        })
        .collect();
    stats.groups = actuals.len();

    log::info!(
        "register: {} project row(s) into {} state-year group(s)",
        stats.rows_read,
        stats.groups
    );
    Ok((actuals, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_digit_years() {
        assert_eq!(expand_two_digit_year("47"), Some(1947));
        assert_eq!(expand_two_digit_year("64"), Some(1964));
        assert_eq!(expand_two_digit_year(" 05 "), Some(1905));
        assert_eq!(expand_two_digit_year("1947"), None);
        assert_eq!(expand_two_digit_year("FY"), None);
        assert_eq!(expand_two_digit_year(""), None);
    }

    #[test]
    fn sums_by_name_and_year() {
        let tsv = "\
STATE\tYEAR\tFederal_Share\tProject
Alabama\t48\t\"1,000\"\tA
Alabama\t48\t2500\tB
 Alabama \t49\t\"$3,000\"\tC
Arizona\t48\tn/a\tD
Arizona\t48\t400\tE
Arkansas\tXX\t900\tF
\t48\t100\tG
";
        let (actuals, stats) = aggregate_register(tsv, &RegisterConfig::default()).unwrap();
        assert_eq!(stats.rows_read, 7);
        assert_eq!(stats.absent_year, 1);
        assert_eq!(stats.absent_name, 1);
        assert_eq!(stats.absent_amount, 1);
        assert_eq!(stats.groups, 3);

        assert_eq!(actuals[0].name, "Alabama");
        assert_eq!(actuals[0].year, 1948);
        assert_eq!(actuals[0].total, 3500.0);
        assert_eq!(actuals[0].project_count, 2);
        assert_eq!(actuals[1].year, 1949);
        assert_eq!(actuals[1].total, 3000.0);
        assert_eq!(actuals[2].name, "Arizona");
        assert_eq!(actuals[2].total, 400.0);
        assert_eq!(actuals[2].absent_amounts, 1);
    }

    #[test]
    fn name_casing_preserved() {
        let tsv = "state\tyear\tfederal_share\nALABAMA\t50\t10\nAlabama\t50\t20\n";
        let (actuals, _) = aggregate_register(tsv, &RegisterConfig::default()).unwrap();
        assert_eq!(actuals.len(), 2);
        assert_eq!(actuals[0].name, "ALABAMA");
        assert_eq!(actuals[1].name, "Alabama");
    }

    #[test]
    fn annotated_amount_is_absent_not_rescaled() {
        let tsv = "state\tyear\tfederal_share\nUtah\t52\t\"1,200 (est. 1952)\"\nUtah\t52\t300\n";
        let (actuals, stats) = aggregate_register(tsv, &RegisterConfig::default()).unwrap();
        assert_eq!(stats.absent_amount, 1);
        assert_eq!(actuals[0].total, 300.0);
        assert_eq!(actuals[0].project_count, 2);
        assert_eq!(actuals[0].absent_amounts, 1);
    }

    #[test]
    fn missing_amount_column() {
        let tsv = "state\tyear\tamount\nAlabama\t50\t10\n";
        let err = aggregate_register(tsv, &RegisterConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "column_resolution");
        assert!(err.to_string().contains("federal_share"));
    }
}
