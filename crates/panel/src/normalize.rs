//! Wide-to-long reshaping of the income and population sources.

use crate::columns::{resolve_column, resolve_year_columns};
use crate::config::{JurisdictionConfig, WideSourceConfig, YearSource};
use crate::error::PanelError;
use crate::jurisdiction::{admit, Exclusion};
use crate::model::{JurisdictionKey, Observation};

/// Counts of source rows left out, for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct NormalizeStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub invalid_code: usize,
    pub unassigned_code: usize,
    pub national_aggregate: usize,
    pub excluded: usize,
    pub absent_values: usize,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub observations: Vec<Observation>,
    pub stats: NormalizeStats,
}

/// Coerce a cell to a number after stripping decoration.
///
/// Surrounding whitespace and quotes, thousands separators and a leading `$`
/// are dropped. Whatever does not parse afterwards is absent, never an error.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let unquoted = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    let unquoted = unquoted.strip_prefix('$').unwrap_or(unquoted).trim_start();
    let cleaned: String = unquoted.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse one wide source into long (jurisdiction, year, value) observations.
///
/// Rows are filtered to the panel's states; the year columns are found from
/// the header names or from the label row, depending on `year_source`.
pub fn load_wide_source(
    source: &str,
    data: &str,
    config: &WideSourceConfig,
    jurisdictions: &JurisdictionConfig,
) -> Result<Normalized, PanelError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(config.delimiter_byte()?)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PanelError::csv(source, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let name_idx = resolve_column(source, &headers, &config.name_column, false)?;
    let code_idx = resolve_column(source, &headers, &config.code_column, false)?;

    let mut records = reader.records();

    let labels: Vec<String> = match config.year_source {
        YearSource::Header => headers.clone(),
        YearSource::LabelRow => {
            let label_row = records
                .next()
                .ok_or_else(|| PanelError::column(source, "label row is missing"))?
                .map_err(|e| PanelError::csv(source, e))?;
            (0..headers.len())
                .map(|i| label_row.get(i).unwrap_or("").trim().to_string())
                .collect()
        }
    };

    let year_columns = resolve_year_columns(source, &labels, &[name_idx, code_idx])?;

    let mut stats = NormalizeStats::default();
    let mut observations = Vec::new();

    for record in records {
        let record = record.map_err(|e| PanelError::csv(source, e))?;
        stats.rows_read += 1;

        let name = record.get(name_idx).unwrap_or("").trim();
        let raw_code = record.get(code_idx).unwrap_or("");

        let code = match admit(name, raw_code, jurisdictions) {
            Ok(code) => code,
            Err(reason) => {
                log::debug!("{source}: dropping row {name:?} (code {raw_code:?}): {reason:?}");
                match reason {
                    Exclusion::InvalidCode => stats.invalid_code += 1,
                    Exclusion::UnassignedCode => stats.unassigned_code += 1,
                    Exclusion::NationalAggregate => stats.national_aggregate += 1,
                    Exclusion::Excluded => stats.excluded += 1,
                }
                continue;
            }
        };
        stats.rows_kept += 1;

        let jurisdiction = JurisdictionKey::new(code, name);
        for &(idx, year) in &year_columns {
            let cell = record.get(idx).unwrap_or("");
            let value = coerce_numeric(cell);
            if value.is_none() {
                stats.absent_values += 1;
                if !cell.trim().is_empty() {
                    log::debug!("{source}: {name} {year}: non-numeric cell {cell:?} treated as absent");
                }
            }
            observations.push(Observation {
                jurisdiction: jurisdiction.clone(),
                year,
                value,
            });
        }
    }

    log::info!(
        "{source}: {} of {} row(s) kept, {} year column(s), {} observation(s)",
        stats.rows_kept,
        stats.rows_read,
        year_columns.len(),
        observations.len(),
    );

    Ok(Normalized {
        observations,
        stats,
    })
}
