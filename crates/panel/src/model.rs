use std::collections::BTreeMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A resolved state: FIPS code plus the trimmed name as the source spells it.
///
/// Ordering is by code first, so maps keyed on this type iterate in code order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JurisdictionKey {
    pub code: u8,
    pub name: String,
}

impl JurisdictionKey {
    pub fn new(code: u8, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized sources
// ---------------------------------------------------------------------------

/// One (jurisdiction, year, value) cell reshaped out of a wide source.
/// `value` is `None` when the cell was blank or not numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub jurisdiction: JurisdictionKey,
    pub year: i32,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedIncome {
    pub jurisdiction: JurisdictionKey,
    pub year: i32,
    pub smoothed: Option<f64>,
    pub national_average: Option<f64>,
    pub index: Option<f64>,
    pub allotment_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRecord {
    pub jurisdiction: JurisdictionKey,
    pub year: i32,
    pub population: Option<f64>,
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRecord {
    pub jurisdiction: JurisdictionKey,
    pub year: i32,
    pub allotment_pct: Option<f64>,
    pub population: Option<f64>,
    pub weighted_population: Option<f64>,
    pub share: Option<f64>,
    pub appropriation: f64,
    /// Share of the appropriation after the funding floor.
    pub predicted: Option<f64>,
}

/// Register funding summed over all projects sharing a (name, year).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActualFunding {
    pub name: String,
    pub year: i32,
    pub total: f64,
    pub project_count: usize,
    /// Projects in the group whose amount could not be parsed.
    pub absent_amounts: usize,
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// Final panel row. Field order is the column order of the persisted panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelRow {
    pub state: String,
    pub code: u8,
    pub year: i32,
    pub state_year: String,
    pub predicted: f64,
    pub actual: f64,
    pub allotment_pct: f64,
}

/// The balanced panel, sorted by year then state name.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    rows: Vec<PanelRow>,
}

impl Panel {
    /// Only the assembler builds panels, after the balance check has passed.
    pub(crate) fn from_checked_rows(rows: Vec<PanelRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[PanelRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn year_counts(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.year).or_insert(0) += 1;
        }
        counts
    }

    pub fn predicted(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.predicted).collect()
    }

    pub fn actual(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.actual).collect()
    }
}
