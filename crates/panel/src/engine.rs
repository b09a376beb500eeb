use serde::Serialize;

use crate::actuals::{aggregate_register, RegisterStats};
use crate::allocation::allocate;
use crate::assemble::{assemble, DiscardedActuals};
use crate::config::PanelConfig;
use crate::error::PanelError;
use crate::model::Panel;
use crate::normalize::{load_wide_source, NormalizeStats};
use crate::population::expand_population;
use crate::smoothing::smooth_income;

/// Raw text of the three sources, already read by the caller.
pub struct PipelineInput<'a> {
    pub income: &'a str,
    pub population: &'a str,
    pub register: &'a str,
}

/// Per-stage counts for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub income: NormalizeStats,
    pub population: NormalizeStats,
    pub register: RegisterStats,
    pub smoothed_records: usize,
    pub absent_smoothed: usize,
    pub allocation_records: usize,
    pub discarded_actuals: DiscardedActuals,
}

#[derive(Debug, Clone)]
pub struct PanelRun {
    pub panel: Panel,
    pub stats: PipelineStats,
}

/// Build the balanced panel. Any structural failure aborts the whole run;
/// nothing partial is returned.
pub fn run(config: &PanelConfig, input: &PipelineInput<'_>) -> Result<PanelRun, PanelError> {
    let income = load_wide_source("income", input.income, &config.income, &config.jurisdictions)?;
    let population = load_wide_source(
        "population",
        input.population,
        &config.population,
        &config.jurisdictions,
    )?;

    let smoothed = smooth_income(&income.observations, &config.years);
    let population_records = expand_population(population.observations, &config.years)?;
    let (actuals, register_stats) = aggregate_register(input.register, &config.register)?;

    let allocations = allocate(&smoothed, &population_records, &config.years)?;
    let (panel, discarded_actuals) = assemble(&allocations, &actuals, config)?;

    let stats = PipelineStats {
        income: income.stats,
        population: population.stats,
        register: register_stats,
        smoothed_records: smoothed.len(),
        absent_smoothed: smoothed.iter().filter(|s| s.smoothed.is_none()).count(),
        allocation_records: allocations.len(),
        discarded_actuals,
    };

    Ok(PanelRun { panel, stats })
}
