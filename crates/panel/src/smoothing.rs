//! Lagged income smoothing and the allotment percentage.
//!
//! Allocation year Y uses the mean per-capita income of Y-4, Y-3 and Y-2.
//! The income source ends two years before the panel does, so each state's
//! series is first extended by two identity-only years; smoothing never reads
//! values from the extension, but the final two panel years exist only
//! because of it.

use std::collections::BTreeMap;

use crate::config::YearRange;
use crate::model::{JurisdictionKey, Observation, SmoothedIncome};

pub const ALLOTMENT_MIN: f64 = 0.33;
pub const ALLOTMENT_MAX: f64 = 0.75;

/// Years appended past the last observed income year.
pub const EXTENSION_YEARS: i32 = 2;

/// Lags averaged into smoothed income.
pub const INCOME_LAGS: [i32; 3] = [2, 3, 4];

/// One state's income, ordered by year. `None` marks an absent value,
/// whether blank in the source or added by [`extend_series`].
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeSeries {
    pub jurisdiction: JurisdictionKey,
    pub points: BTreeMap<i32, Option<f64>>,
}

impl IncomeSeries {
    pub fn last_year(&self) -> Option<i32> {
        self.points.keys().next_back().copied()
    }

    fn value(&self, year: i32) -> Option<f64> {
        self.points.get(&year).copied().flatten()
    }
}

/// Group observations into one series per state code, ascending by code.
///
/// The first name seen for a code is kept; a repeated (code, year) keeps the
/// first value.
pub fn group_series(observations: &[Observation]) -> Vec<IncomeSeries> {
    let mut by_code: BTreeMap<u8, IncomeSeries> = BTreeMap::new();
    for obs in observations {
        let series = by_code
            .entry(obs.jurisdiction.code)
            .or_insert_with(|| IncomeSeries {
                jurisdiction: obs.jurisdiction.clone(),
                points: BTreeMap::new(),
            });
        if series.points.contains_key(&obs.year) {
            log::warn!(
                "income: duplicate observation for {} {}, keeping the first",
                obs.jurisdiction.name,
                obs.year
            );
            continue;
        }
        series.points.insert(obs.year, obs.value);
    }
    by_code.into_values().collect()
}

/// Append `years` identity-only years after the series' last year.
pub fn extend_series(series: &IncomeSeries, years: i32) -> IncomeSeries {
    let mut extended = series.clone();
    if let Some(last) = series.last_year() {
        for year in (last + 1)..=(last + years) {
            extended.points.insert(year, None);
        }
    }
    extended
}

/// Mean income over [`INCOME_LAGS`] before `year`; absent if any lag is.
pub fn lagged_mean(series: &IncomeSeries, year: i32) -> Option<f64> {
    let mut sum = 0.0;
    for lag in INCOME_LAGS {
        sum += series.value(year - lag)?;
    }
    Some(sum / INCOME_LAGS.len() as f64)
}

/// `1 - 0.5 * index`, clamped to [0.33, 0.75].
pub fn allotment_percentage(index: f64) -> f64 {
    (1.0 - 0.5 * index).clamp(ALLOTMENT_MIN, ALLOTMENT_MAX)
}

/// Smoothed income, national average, income index and allotment percentage
/// for every state-year of the extended series that falls in `years`.
///
/// The national average for a year is the mean over the states whose
/// smoothed income is present; a state with an absent value is left out of
/// it and carries an absent allotment percentage.
pub fn smooth_income(observations: &[Observation], years: &YearRange) -> Vec<SmoothedIncome> {
    let series: Vec<IncomeSeries> = group_series(observations)
        .iter()
        .map(|s| extend_series(s, EXTENSION_YEARS))
        .collect();

    // (state, year, smoothed) for panel years the extended series reaches
    let mut smoothed: Vec<(JurisdictionKey, i32, Option<f64>)> = Vec::new();
    for s in &series {
        for &year in s.points.keys() {
            if years.contains(year) {
                smoothed.push((s.jurisdiction.clone(), year, lagged_mean(s, year)));
            }
        }
    }

    let mut national: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for (_, year, value) in &smoothed {
        if let Some(v) = value {
            let entry = national.entry(*year).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }
    let national: BTreeMap<i32, f64> = national
        .into_iter()
        .map(|(year, (sum, n))| (year, sum / n as f64))
        .collect();

    let mut out = Vec::with_capacity(smoothed.len());
    let mut absent = 0usize;
    for (jurisdiction, year, value) in smoothed {
        let national_average = national.get(&year).copied();
        let index = match (value, national_average) {
            (Some(v), Some(avg)) if avg != 0.0 => Some(v / avg),
            _ => None,
        };
        if value.is_none() {
            absent += 1;
            log::warn!("income: no smoothed income for {} {}", jurisdiction.name, year);
        }
        out.push(SmoothedIncome {
            jurisdiction,
            year,
            smoothed: value,
            national_average,
            index,
            allotment_pct: index.map(allotment_percentage),
        });
    }

    log::info!(
        "income: {} series, {} smoothed state-year(s), {} absent",
        series.len(),
        out.len(),
        absent
    );
    out
}
