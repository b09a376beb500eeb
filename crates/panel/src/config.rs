use serde::{Deserialize, Deserializer};

use crate::appropriation::appropriation_for;
use crate::error::PanelError;
use crate::jurisdiction::{ALASKA, DISTRICT_OF_COLUMBIA, HAWAII, MAX_STATE_CODE, MIN_STATE_CODE};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Pipeline configuration. Every table is optional; the defaults describe the
/// 48-state, 1947-1964 panel built from `income.csv`, `population.csv` and
/// `projects.tsv` in the working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct PanelConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub years: YearRange,
    #[serde(default)]
    pub jurisdictions: JurisdictionConfig,
    #[serde(default = "WideSourceConfig::income", deserialize_with = "income_section")]
    pub income: WideSourceConfig,
    #[serde(
        default = "WideSourceConfig::population",
        deserialize_with = "population_section"
    )]
    pub population: WideSourceConfig,
    #[serde(default)]
    pub register: RegisterConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "Hill-Burton allotments".into()
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            years: YearRange::default(),
            jurisdictions: JurisdictionConfig::default(),
            income: WideSourceConfig::income(),
            population: WideSourceConfig::population(),
            register: RegisterConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Years
// ---------------------------------------------------------------------------

/// Inclusive range of panel years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct YearRange {
    pub first: i32,
    pub last: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            first: 1947,
            last: 1964,
        }
    }
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        (self.first..=self.last).contains(&year)
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> {
        self.first..=self.last
    }

    pub fn len(&self) -> usize {
        if self.last < self.first {
            0
        } else {
            (self.last - self.first + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Jurisdictions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct JurisdictionConfig {
    /// Rows per year in the balanced panel.
    #[serde(default = "default_expected")]
    pub expected: usize,
    #[serde(default = "default_excluded")]
    pub excluded_codes: Vec<u8>,
    /// Name of the whole-country row, matched case-insensitively.
    #[serde(default = "default_aggregate_name")]
    pub aggregate_name: String,
}

fn default_expected() -> usize {
    48
}

fn default_excluded() -> Vec<u8> {
    vec![ALASKA, DISTRICT_OF_COLUMBIA, HAWAII]
}

fn default_aggregate_name() -> String {
    "United States".into()
}

impl Default for JurisdictionConfig {
    fn default() -> Self {
        Self {
            expected: default_expected(),
            excluded_codes: default_excluded(),
            aggregate_name: default_aggregate_name(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wide sources (income, population)
// ---------------------------------------------------------------------------

/// Where a wide source keeps the string each year column is identified by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearSource {
    /// The year is part of the header name ("1947", "pci_1947").
    Header,
    /// The first row after the header holds column labels; the year is
    /// read from the label, not from the raw header name.
    LabelRow,
}

/// A wide source after section defaults are applied. `[income]` and
/// `[population]` differ in their default file and year source, so each
/// table is read as [`WideSourceToml`] and filled from its own defaults.
#[derive(Debug, Clone)]
pub struct WideSourceConfig {
    pub file: String,
    pub name_column: String,
    pub code_column: String,
    pub delimiter: String,
    pub year_source: YearSource,
}

/// `[income]` / `[population]` as written; absent keys keep the section default.
#[derive(Debug, Default, Deserialize)]
struct WideSourceToml {
    file: Option<String>,
    name_column: Option<String>,
    code_column: Option<String>,
    delimiter: Option<String>,
    year_source: Option<YearSource>,
}

impl WideSourceToml {
    fn over(self, defaults: WideSourceConfig) -> WideSourceConfig {
        WideSourceConfig {
            file: self.file.unwrap_or(defaults.file),
            name_column: self.name_column.unwrap_or(defaults.name_column),
            code_column: self.code_column.unwrap_or(defaults.code_column),
            delimiter: self.delimiter.unwrap_or(defaults.delimiter),
            year_source: self.year_source.unwrap_or(defaults.year_source),
        }
    }
}

fn income_section<'de, D: Deserializer<'de>>(d: D) -> Result<WideSourceConfig, D::Error> {
    Ok(WideSourceToml::deserialize(d)?.over(WideSourceConfig::income()))
}

fn population_section<'de, D: Deserializer<'de>>(d: D) -> Result<WideSourceConfig, D::Error> {
    Ok(WideSourceToml::deserialize(d)?.over(WideSourceConfig::population()))
}

fn default_name_column() -> String {
    "state".into()
}

fn default_code_column() -> String {
    "fips".into()
}

fn default_comma() -> String {
    ",".into()
}

impl WideSourceConfig {
    pub fn income() -> Self {
        Self {
            file: "income.csv".into(),
            name_column: default_name_column(),
            code_column: default_code_column(),
            delimiter: default_comma(),
            year_source: YearSource::Header,
        }
    }

    pub fn population() -> Self {
        Self {
            file: "population.csv".into(),
            name_column: default_name_column(),
            code_column: default_code_column(),
            delimiter: default_comma(),
            year_source: YearSource::LabelRow,
        }
    }

    pub fn delimiter_byte(&self) -> Result<u8, PanelError> {
        delimiter_byte(&self.delimiter)
    }
}

// ---------------------------------------------------------------------------
// Project register
// ---------------------------------------------------------------------------

/// Column names are matched case-insensitively against the register header.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterConfig {
    #[serde(default = "default_register_file")]
    pub file: String,
    #[serde(default = "default_tab")]
    pub delimiter: String,
    #[serde(default = "default_name_column")]
    pub name_column: String,
    #[serde(default = "default_year_column")]
    pub year_column: String,
    #[serde(default = "default_amount_column")]
    pub amount_column: String,
}

fn default_register_file() -> String {
    "projects.tsv".into()
}

fn default_tab() -> String {
    "\t".into()
}

fn default_year_column() -> String {
    "year".into()
}

fn default_amount_column() -> String {
    "federal_share".into()
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            file: default_register_file(),
            delimiter: default_tab(),
            name_column: default_name_column(),
            year_column: default_year_column(),
            amount_column: default_amount_column(),
        }
    }
}

impl RegisterConfig {
    pub fn delimiter_byte(&self) -> Result<u8, PanelError> {
        delimiter_byte(&self.delimiter)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Artifact directory, relative to the config file.
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_panel_file")]
    pub panel: String,
    #[serde(default = "default_plot_file")]
    pub plot: String,
    #[serde(default = "default_report_file")]
    pub report: String,
}

fn default_output_dir() -> String {
    ".".into()
}

fn default_panel_file() -> String {
    "panel.csv".into()
}

fn default_plot_file() -> String {
    "actual_vs_predicted.svg".into()
}

fn default_report_file() -> String {
    "report.txt".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            panel: default_panel_file(),
            plot: default_plot_file(),
            report: default_report_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

fn delimiter_byte(raw: &str) -> Result<u8, PanelError> {
    match raw.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(PanelError::ConfigValidation(format!(
            "delimiter must be a single ASCII character, got {raw:?}"
        ))),
    }
}

impl PanelConfig {
    pub fn from_toml(input: &str) -> Result<Self, PanelError> {
        let config: PanelConfig =
            toml::from_str(input).map_err(|e| PanelError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        if self.years.is_empty() {
            return Err(PanelError::ConfigValidation(format!(
                "years.first ({}) is after years.last ({})",
                self.years.first, self.years.last
            )));
        }

        // The appropriation table is fixed; every panel year needs an entry
        let missing: Vec<String> = self
            .years
            .iter()
            .filter(|y| appropriation_for(*y).is_none())
            .map(|y| y.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PanelError::ConfigValidation(format!(
                "no appropriation for year(s) {}",
                missing.join(", ")
            )));
        }

        if self.jurisdictions.expected == 0 {
            return Err(PanelError::ConfigValidation(
                "jurisdictions.expected must be at least 1".into(),
            ));
        }

        for code in &self.jurisdictions.excluded_codes {
            if !(MIN_STATE_CODE..=MAX_STATE_CODE).contains(code) {
                return Err(PanelError::ConfigValidation(format!(
                    "excluded code {code} is outside [{MIN_STATE_CODE}, {MAX_STATE_CODE}]"
                )));
            }
        }

        for (section, source) in [("income", &self.income), ("population", &self.population)] {
            source.delimiter_byte()?;
            require_non_empty(section, "file", &source.file)?;
            require_non_empty(section, "name_column", &source.name_column)?;
            require_non_empty(section, "code_column", &source.code_column)?;
            if source.name_column.trim() == source.code_column.trim() {
                return Err(PanelError::ConfigValidation(format!(
                    "{section}: name_column and code_column are both '{}'",
                    source.name_column
                )));
            }
        }

        self.register.delimiter_byte()?;
        require_non_empty("register", "file", &self.register.file)?;
        require_non_empty("register", "name_column", &self.register.name_column)?;
        require_non_empty("register", "year_column", &self.register.year_column)?;
        require_non_empty("register", "amount_column", &self.register.amount_column)?;

        require_non_empty("output", "panel", &self.output.panel)?;
        require_non_empty("output", "plot", &self.output.plot)?;
        require_non_empty("output", "report", &self.output.report)?;

        Ok(())
    }

    /// Rows the balanced panel must contain.
    pub fn expected_rows(&self) -> usize {
        self.jurisdictions.expected * self.years.len()
    }
}

fn require_non_empty(section: &str, field: &str, value: &str) -> Result<(), PanelError> {
    if value.trim().is_empty() {
        return Err(PanelError::ConfigValidation(format!(
            "{section}.{field} must not be empty"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
