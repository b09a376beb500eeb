//! Final panel: allocation left-joined with actual funding, then checked for
//! balance.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::PanelConfig;
use crate::error::{BalanceReport, PanelError, PanelKey};
use crate::model::{ActualFunding, AllocationRecord, Panel, PanelRow};

/// Register groups that found no allocation row.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct DiscardedActuals {
    pub groups: usize,
    pub total: f64,
}

fn key(a: &AllocationRecord) -> PanelKey {
    PanelKey {
        code: a.jurisdiction.code,
        name: a.jurisdiction.name.clone(),
        year: a.year,
    }
}

/// Check row count, per-year count, key uniqueness and completeness.
pub fn check_balance(rows: &[&AllocationRecord], config: &PanelConfig) -> BalanceReport {
    let mut year_counts: BTreeMap<i32, usize> = config.years.iter().map(|y| (y, 0)).collect();
    let mut seen: BTreeSet<(u8, i32)> = BTreeSet::new();
    let mut duplicates = Vec::new();
    let mut incomplete = Vec::new();

    for row in rows {
        *year_counts.entry(row.year).or_insert(0) += 1;
        if !seen.insert((row.jurisdiction.code, row.year)) {
            duplicates.push(key(row));
        }
        if row.allotment_pct.is_none() || row.predicted.is_none() {
            incomplete.push(key(row));
        }
    }

    BalanceReport {
        expected_rows: config.expected_rows(),
        actual_rows: rows.len(),
        expected_per_year: config.jurisdictions.expected,
        year_counts,
        duplicates,
        incomplete,
    }
}

/// Left-join allocations (master) with actuals on (state name, year).
///
/// Actual funding with no allocation row is dropped; allocation rows with no
/// actual funding get 0. The result is sorted by year, then state name.
pub fn assemble(
    allocations: &[AllocationRecord],
    actuals: &[ActualFunding],
    config: &PanelConfig,
) -> Result<(Panel, DiscardedActuals), PanelError> {
    let in_range: Vec<&AllocationRecord> = allocations
        .iter()
        .filter(|a| config.years.contains(a.year))
        .collect();

    let report = check_balance(&in_range, config);
    if !report.is_balanced() {
        return Err(PanelError::BalanceViolation(report));
    }

    let by_key: HashMap<(&str, i32), &ActualFunding> = actuals
        .iter()
        .map(|a| ((a.name.as_str(), a.year), a))
        .collect();

    let mut matched: BTreeSet<(&str, i32)> = BTreeSet::new();
    let mut rows = Vec::with_capacity(in_range.len());

    for a in &in_range {
        let (Some(allotment_pct), Some(predicted)) = (a.allotment_pct, a.predicted) else {
            // check_balance already rejected incomplete rows
            continue;
        };
        let name = a.jurisdiction.name.as_str();
        let actual = match by_key.get(&(name, a.year)) {
            Some(found) => {
                matched.insert((name, a.year));
                found.total
            }
            None => 0.0,
        };
        rows.push(PanelRow {
            state: a.jurisdiction.name.clone(),
            code: a.jurisdiction.code,
            year: a.year,
            state_year: format!("{} {}", a.jurisdiction.name, a.year),
            predicted,
            actual,
            allotment_pct,
        });
    }

    rows.sort_by(|l, r| {
        l.year
            .cmp(&r.year)
            .then_with(|| l.state.cmp(&r.state))
            .then_with(|| l.code.cmp(&r.code))
    });

    let mut discarded = DiscardedActuals::default();
    for a in actuals {
        if !matched.contains(&(a.name.as_str(), a.year)) {
            discarded.groups += 1;
            discarded.total += a.total;
            if config.years.contains(a.year) {
                log::warn!(
                    "register: no panel state named {:?} for {}; {} dropped",
                    a.name,
                    a.year,
                    a.total
                );
            }
        }
    }

    log::info!(
        "panel: {} row(s); {} register group(s) outside the panel",
        rows.len(),
        discarded.groups
    );
    Ok((Panel::from_checked_rows(rows), discarded))
}
