use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::model::JurisdictionKey;

#[derive(Debug)]
pub enum PanelError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad year range, missing appropriation, etc.).
    ConfigValidation(String),
    /// A required identity or year column cannot be located in a source.
    ColumnResolution { source: String, detail: String },
    /// An inner join that must be total found unmatched keys.
    MergeIntegrity(MergeMismatch),
    /// The assembled panel is not rectangular or not uniquely keyed.
    BalanceViolation(BalanceReport),
    /// Malformed delimited text (unterminated quote, bad UTF-8, ...).
    Csv { source: String, message: String },
}

impl PanelError {
    /// Stable machine-readable tag for JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "config_parse",
            Self::ConfigValidation(_) => "config_validation",
            Self::ColumnResolution { .. } => "column_resolution",
            Self::MergeIntegrity(_) => "merge_integrity",
            Self::BalanceViolation(_) => "balance_violation",
            Self::Csv { .. } => "csv",
        }
    }

    pub(crate) fn column(source: &str, detail: impl Into<String>) -> Self {
        Self::ColumnResolution {
            source: source.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn csv(source: &str, err: csv::Error) -> Self {
        Self::Csv {
            source: source.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::ColumnResolution { source, detail } => {
                write!(f, "source '{source}': cannot resolve columns: {detail}")
            }
            Self::MergeIntegrity(m) => write!(
                f,
                "join '{}' is not total: {} left-only, {} right-only key(s)",
                m.join,
                m.left_only(),
                m.right_only(),
            ),
            Self::BalanceViolation(r) => write!(
                f,
                "panel is unbalanced: {} row(s), expected {}; {} duplicate key(s), {} incomplete row(s)",
                r.actual_rows,
                r.expected_rows,
                r.duplicates.len(),
                r.incomplete.len(),
            ),
            Self::Csv { source, message } => write!(f, "source '{source}': {message}"),
        }
    }
}

impl std::error::Error for PanelError {}

// ---------------------------------------------------------------------------
// Merge diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSide {
    Left,
    Right,
}

/// A key present on only one side of a join. Year-only joins leave
/// `jurisdiction` empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedKey {
    pub side: JoinSide,
    pub jurisdiction: Option<JurisdictionKey>,
    pub year: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearMismatch {
    pub left_only: usize,
    pub right_only: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeMismatch {
    /// "income/population" or "allocation/appropriation".
    pub join: String,
    pub left: String,
    pub right: String,
    pub unmatched: Vec<UnmatchedKey>,
}

impl MergeMismatch {
    pub fn left_only(&self) -> usize {
        self.unmatched.iter().filter(|k| k.side == JoinSide::Left).count()
    }

    pub fn right_only(&self) -> usize {
        self.unmatched.iter().filter(|k| k.side == JoinSide::Right).count()
    }

    /// Mismatch counts grouped by year, ascending.
    pub fn per_year(&self) -> BTreeMap<i32, YearMismatch> {
        let mut counts: BTreeMap<i32, YearMismatch> = BTreeMap::new();
        for key in &self.unmatched {
            let entry = counts.entry(key.year).or_default();
            match key.side {
                JoinSide::Left => entry.left_only += 1,
                JoinSide::Right => entry.right_only += 1,
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Balance diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelKey {
    pub code: u8,
    pub name: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub expected_rows: usize,
    pub actual_rows: usize,
    pub expected_per_year: usize,
    /// Row count for every panel year, including years with zero rows.
    pub year_counts: BTreeMap<i32, usize>,
    pub duplicates: Vec<PanelKey>,
    /// Rows whose allotment percentage or predicted value is absent.
    pub incomplete: Vec<PanelKey>,
}

impl BalanceReport {
    pub fn is_balanced(&self) -> bool {
        self.actual_rows == self.expected_rows
            && self.year_counts.values().all(|&n| n == self.expected_per_year)
            && self.duplicates.is_empty()
            && self.incomplete.is_empty()
    }

    /// Years whose row count differs from the expected per-year count.
    pub fn unbalanced_years(&self) -> Vec<(i32, usize)> {
        self.year_counts
            .iter()
            .filter(|(_, &n)| n != self.expected_per_year)
            .map(|(&y, &n)| (y, n))
            .collect()
    }
}
