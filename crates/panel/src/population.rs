use crate::config::YearRange;
use crate::error::PanelError;
use crate::model::{Observation, PopulationRecord};

/// Restrict normalized population to the panel years.
///
/// The first panel year must be present; its absence means the year columns
/// were misread, and a partial panel is never built from that.
pub fn expand_population(
    observations: Vec<Observation>,
    years: &YearRange,
) -> Result<Vec<PopulationRecord>, PanelError> {
    if !observations.iter().any(|o| o.year == years.first) {
        return Err(PanelError::column(
            "population",
            format!("no column resolves to the first panel year {}", years.first),
        ));
    }

    let records: Vec<PopulationRecord> = observations
        .into_iter()
        .filter(|o| years.contains(o.year))
        .map(|o| PopulationRecord {
            jurisdiction: o.jurisdiction,
            year: o.year,
            population: o.value,
        })
        .collect();

    log::info!("population: {} state-year record(s)", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JurisdictionKey;

    fn obs(year: i32, value: f64) -> Observation {
        Observation {
            jurisdiction: JurisdictionKey::new(1, "Alabama"),
            year,
            value: Some(value),
        }
    }

    #[test]
    fn filters_to_panel_years() {
        let years = YearRange { first: 1947, last: 1948 };
        let out = expand_population(vec![obs(1946, 1.0), obs(1947, 2.0), obs(1948, 3.0)], &years)
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].year, 1947);
        assert_eq!(out[0].population, Some(2.0));
    }

    #[test]
    fn missing_first_year_is_fatal() {
        let years = YearRange::default();
        let err = expand_population(vec![obs(1948, 1.0), obs(1949, 1.0)], &years).unwrap_err();
        assert_eq!(err.kind(), "column_resolution");
        assert!(err.to_string().contains("1947"));
    }
}
