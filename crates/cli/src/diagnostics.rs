//! Human-readable diagnostic tables for fatal pipeline errors.

use std::fmt::Write as _;

use hillburton_panel::error::{BalanceReport, JoinSide, MergeMismatch};
use hillburton_panel::PanelError;

/// Keys listed before the table is cut short.
const MAX_KEYS: usize = 60;

/// Diagnostic table for errors that carry one; `None` otherwise.
pub fn render(err: &PanelError) -> Option<String> {
    match err {
        PanelError::MergeIntegrity(m) => Some(merge_table(m)),
        PanelError::BalanceViolation(r) => Some(balance_table(r)),
        _ => None,
    }
}

fn merge_table(m: &MergeMismatch) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "join '{}': unmatched keys", m.join);
    let _ = writeln!(out, "  {:<14}{:>6}  {:<24}{:>6}", "side", "code", "state", "year");
    for key in m.unmatched.iter().take(MAX_KEYS) {
        let side = match key.side {
            JoinSide::Left => &m.left,
            JoinSide::Right => &m.right,
        };
        let (code, name) = match &key.jurisdiction {
            Some(j) => (j.code.to_string(), j.name.as_str()),
            None => ("-".to_string(), "-"),
        };
        let _ = writeln!(out, "  {:<14}{:>6}  {:<24}{:>6}", format!("{side} only"), code, name, key.year);
    }
    if m.unmatched.len() > MAX_KEYS {
        let _ = writeln!(out, "  ... {} more", m.unmatched.len() - MAX_KEYS);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {:<6}{:>14}{:>14}", "year", format!("{} only", m.left), format!("{} only", m.right));
    for (year, counts) in m.per_year() {
        let _ = writeln!(out, "  {:<6}{:>14}{:>14}", year, counts.left_only, counts.right_only);
    }
    out
}

fn balance_table(r: &BalanceReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "panel rows: {} (expected {}, {} per year)",
        r.actual_rows, r.expected_rows, r.expected_per_year
    );
    let unbalanced = r.unbalanced_years();
    if !unbalanced.is_empty() {
        let _ = writeln!(out, "  {:<6}{:>8}{:>10}", "year", "rows", "expected");
        for (year, n) in unbalanced {
            let _ = writeln!(out, "  {:<6}{:>8}{:>10}", year, n, r.expected_per_year);
        }
    }
    for (label, keys) in [("duplicate", &r.duplicates), ("incomplete", &r.incomplete)] {
        if keys.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{} {label} key(s):", keys.len());
        for k in keys.iter().take(MAX_KEYS) {
            let _ = writeln!(out, "  {:>6}  {:<24}{:>6}", k.code, k.name, k.year);
        }
        if keys.len() > MAX_KEYS {
            let _ = writeln!(out, "  ... {} more", keys.len() - MAX_KEYS);
        }
    }
    out
}
