//! Formula allocation: weighted population, per-year shares, appropriation
//! join and funding floors.

use std::collections::{BTreeMap, BTreeSet};

use crate::appropriation::{appropriation_for, funding_floor};
use crate::config::YearRange;
use crate::error::{JoinSide, MergeMismatch, PanelError, UnmatchedKey};
use crate::model::{AllocationRecord, PopulationRecord, SmoothedIncome};

/// A state-year with both its allotment percentage and its population.
#[derive(Debug, Clone)]
struct Joined<'a> {
    income: &'a SmoothedIncome,
    population: Option<f64>,
}

/// Inner join on (code, year). Either side having a key the other lacks is a
/// fatal mismatch; duplicate keys fan out and are caught by the balance check.
fn join_income_population<'a>(
    smoothed: &'a [SmoothedIncome],
    population: &'a [PopulationRecord],
) -> Result<Vec<Joined<'a>>, PanelError> {
    let mut pop_by_key: BTreeMap<(u8, i32), Vec<&PopulationRecord>> = BTreeMap::new();
    for p in population {
        pop_by_key
            .entry((p.jurisdiction.code, p.year))
            .or_default()
            .push(p);
    }
    let income_keys: BTreeSet<(u8, i32)> = smoothed
        .iter()
        .map(|s| (s.jurisdiction.code, s.year))
        .collect();

    let mut unmatched = Vec::new();
    let mut joined = Vec::new();

    for s in smoothed {
        match pop_by_key.get(&(s.jurisdiction.code, s.year)) {
            Some(matches) => joined.extend(matches.iter().map(|p| Joined {
                income: s,
                population: p.population,
            })),
            None => unmatched.push(UnmatchedKey {
                side: JoinSide::Left,
                jurisdiction: Some(s.jurisdiction.clone()),
                year: s.year,
            }),
        }
    }

    for ((code, year), records) in &pop_by_key {
        if !income_keys.contains(&(*code, *year)) {
            unmatched.extend(records.iter().map(|p| UnmatchedKey {
                side: JoinSide::Right,
                jurisdiction: Some(p.jurisdiction.clone()),
                year: *year,
            }));
        }
    }

    if !unmatched.is_empty() {
        return Err(PanelError::MergeIntegrity(MergeMismatch {
            join: "income/population".into(),
            left: "income".into(),
            right: "population".into(),
            unmatched,
        }));
    }
    Ok(joined)
}

/// Raise `predicted` to the year's floor, if the year has one.
pub fn apply_floor(year: i32, predicted: f64) -> f64 {
    match funding_floor(year) {
        Some(floor) if predicted < floor => floor,
        _ => predicted,
    }
}

/// Compute every state's predicted allotment for the panel years.
pub fn allocate(
    smoothed: &[SmoothedIncome],
    population: &[PopulationRecord],
    years: &YearRange,
) -> Result<Vec<AllocationRecord>, PanelError> {
    let joined = join_income_population(smoothed, population)?;

    let weighted: Vec<Option<f64>> = joined
        .iter()
        .map(|j| match (j.income.allotment_pct, j.population) {
            (Some(pct), Some(pop)) => Some(pct * pct * pop),
            _ => None,
        })
        .collect();

    let mut totals: BTreeMap<i32, f64> = BTreeMap::new();
    for (j, w) in joined.iter().zip(&weighted) {
        if let Some(w) = w {
            *totals.entry(j.income.year).or_insert(0.0) += w;
        }
    }

    // Appropriation join on year: every row needs an amount, every panel
    // year in the table needs rows
    let mut unmatched = Vec::new();
    for j in &joined {
        if appropriation_for(j.income.year).is_none() {
            unmatched.push(UnmatchedKey {
                side: JoinSide::Left,
                jurisdiction: Some(j.income.jurisdiction.clone()),
                year: j.income.year,
            });
        }
    }
    let row_years: BTreeSet<i32> = joined.iter().map(|j| j.income.year).collect();
    for year in years.iter() {
        if appropriation_for(year).is_some() && !row_years.contains(&year) {
            unmatched.push(UnmatchedKey {
                side: JoinSide::Right,
                jurisdiction: None,
                year,
            });
        }
    }
    if !unmatched.is_empty() {
        return Err(PanelError::MergeIntegrity(MergeMismatch {
            join: "allocation/appropriation".into(),
            left: "allocation".into(),
            right: "appropriation".into(),
            unmatched,
        }));
    }

    let mut records = Vec::with_capacity(joined.len());
    for (j, weighted_population) in joined.into_iter().zip(weighted) {
        let year = j.income.year;
        let appropriation = appropriation_for(year).unwrap_or_default();
        let share = match (weighted_population, totals.get(&year)) {
            (Some(w), Some(&total)) if total > 0.0 => Some(w / total),
            _ => None,
        };
        let predicted = share.map(|s| apply_floor(year, s * appropriation));

        records.push(AllocationRecord {
            jurisdiction: j.income.jurisdiction.clone(),
            year,
            allotment_pct: j.income.allotment_pct,
            population: j.population,
            weighted_population,
            share,
            appropriation,
            predicted,
        });
    }

    log::info!(
        "allocation: {} state-year record(s) over {} year(s)",
        records.len(),
        totals.len()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JurisdictionKey;

    fn smoothed(code: u8, year: i32, pct: f64) -> SmoothedIncome {
        SmoothedIncome {
            jurisdiction: JurisdictionKey::new(code, format!("State {code}")),
            year,
            smoothed: Some(1000.0),
            national_average: Some(1000.0),
            index: Some(1.0),
            allotment_pct: Some(pct),
        }
    }

    fn pop(code: u8, year: i32, value: f64) -> PopulationRecord {
        PopulationRecord {
            jurisdiction: JurisdictionKey::new(code, format!("State {code}")),
            year,
            population: Some(value),
        }
    }

    #[test]
    fn shares_weight_by_squared_percentage() {
        let years = YearRange { first: 1950, last: 1950 };
        let s = vec![smoothed(1, 1950, 0.75), smoothed(4, 1950, 0.5)];
        let p = vec![pop(1, 1950, 1_000_000.0), pop(4, 1950, 1_000_000.0)];
        let out = allocate(&s, &p, &years).unwrap();

        assert_eq!(out[0].weighted_population, Some(562_500.0));
        assert_eq!(out[1].weighted_population, Some(250_000.0));
        let total = 812_500.0;
        assert_eq!(out[0].share, Some(562_500.0 / total));
        let sum: f64 = out.iter().filter_map(|r| r.share).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(out[0].appropriation, 150_000_000.0);
        assert_eq!(out[0].predicted, Some(562_500.0 / total * 150_000_000.0));
    }

    #[test]
    fn floor_rules() {
        assert_eq!(apply_floor(1948, 150_000.0), 150_000.0);
        assert_eq!(apply_floor(1948, 50_000.0), 100_000.0);
        assert_eq!(apply_floor(1949, 150_000.0), 200_000.0);
        assert_eq!(apply_floor(1947, 10.0), 10.0);
    }

    #[test]
    fn tiny_state_raised_to_floor() {
        let years = YearRange { first: 1950, last: 1950 };
        let s = vec![smoothed(1, 1950, 0.5), smoothed(4, 1950, 0.5)];
        let p = vec![pop(1, 1950, 1.0), pop(4, 1950, 10_000_000.0)];
        let out = allocate(&s, &p, &years).unwrap();
        assert_eq!(out[0].predicted, Some(200_000.0));
        assert!(out[1].predicted.unwrap() > 149_000_000.0);
    }

    #[test]
    fn unmatched_population_key_is_fatal() {
        let years = YearRange { first: 1950, last: 1951 };
        let s = vec![smoothed(1, 1950, 0.5), smoothed(1, 1951, 0.5)];
        let p = vec![pop(1, 1950, 1.0), pop(4, 1950, 1.0)];
        let err = allocate(&s, &p, &years).unwrap_err();
        let PanelError::MergeIntegrity(m) = err else {
            panic!("expected merge integrity error");
        };
        assert_eq!(m.join, "income/population");
        assert_eq!(m.left_only(), 1);
        assert_eq!(m.right_only(), 1);
        assert_eq!(m.unmatched[0].year, 1951);
        assert_eq!(m.unmatched[1].jurisdiction.as_ref().unwrap().code, 4);
    }

    #[test]
    fn panel_year_without_rows_is_fatal() {
        let years = YearRange { first: 1950, last: 1951 };
        let s = vec![smoothed(1, 1950, 0.5)];
        let p = vec![pop(1, 1950, 1.0)];
        let err = allocate(&s, &p, &years).unwrap_err();
        let PanelError::MergeIntegrity(m) = err else {
            panic!("expected merge integrity error");
        };
        assert_eq!(m.join, "allocation/appropriation");
        assert_eq!(m.unmatched.len(), 1);
        assert_eq!(m.unmatched[0].side, JoinSide::Right);
        assert_eq!(m.unmatched[0].year, 1951);
        assert!(m.unmatched[0].jurisdiction.is_none());
    }

    #[test]
    fn absent_percentage_leaves_prediction_absent() {
        let years = YearRange { first: 1950, last: 1950 };
        let mut missing = smoothed(1, 1950, 0.5);
        missing.allotment_pct = None;
        let s = vec![missing, smoothed(4, 1950, 0.5)];
        let p = vec![pop(1, 1950, 1.0), pop(4, 1950, 1.0)];
        let out = allocate(&s, &p, &years).unwrap();
        assert_eq!(out[0].predicted, None);
        assert_eq!(out[1].share, Some(1.0));
    }
}
