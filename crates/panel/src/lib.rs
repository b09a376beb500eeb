//! Hill-Burton allotment reconstruction engine.
//!
//! Pure engine crate: receives pre-loaded source text (income, population,
//! project register), returns a balanced state-year panel of predicted vs.
//! actual funding. No CLI dependencies; file reads and writes stay in the
//! caller.

pub mod actuals;
pub mod allocation;
pub mod appropriation;
pub mod assemble;
pub mod columns;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod jurisdiction;
pub mod model;
pub mod normalize;
pub mod plot;
pub mod population;
pub mod report;
pub mod smoothing;

pub use config::PanelConfig;
pub use engine::{run, PanelRun, PipelineInput, PipelineStats};
pub use error::PanelError;
pub use model::{JurisdictionKey, Panel, PanelRow};
