//! `hbpanel run` / `hbpanel validate`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use hillburton_panel::engine::{run, PipelineInput, PipelineStats};
use hillburton_panel::export::{fingerprint, panel_csv};
use hillburton_panel::plot::scatter_svg;
use hillburton_panel::report::{validate_panel, ValidationReport};
use hillburton_panel::{PanelConfig, PanelError};

use crate::diagnostics;
use crate::exit_codes::panel_exit_code;
use crate::CliError;

/// Load the config (or defaults) and the directory its paths resolve against.
fn load_config(config_path: Option<&Path>) -> Result<(PanelConfig, PathBuf), CliError> {
    match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
            let config = PanelConfig::from_toml(&text)
                .map_err(|e| CliError::config(e.to_string()))?;
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            log::info!("config {}: inputs resolve against {}", path.display(), base.display());
            Ok((config, base))
        }
        None => {
            log::info!("no config given, using defaults");
            Ok((PanelConfig::default(), PathBuf::from(".")))
        }
    }
}

fn read_source(base: &Path, file: &str) -> Result<String, CliError> {
    let path = base.join(file);
    std::fs::read_to_string(&path).map_err(|e| {
        CliError::io(format!("cannot read {}: {e}", path.display()))
            .with_hint("input paths are relative to the config file's directory")
    })
}

#[derive(Serialize)]
struct RunSummary<'a> {
    name: &'a str,
    rows: usize,
    rows_per_year: std::collections::BTreeMap<i32, usize>,
    fingerprint: String,
    artifacts: Vec<String>,
    stats: &'a PipelineStats,
    report: &'a ValidationReport,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: &'static str,
    message: String,
    exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Print the diagnostic table (and JSON error when asked), then map to an exit code.
fn engine_failure(err: PanelError, json_output: bool) -> CliError {
    let code = panel_exit_code(&err);
    if let Some(table) = diagnostics::render(&err) {
        eprint!("{table}");
    }
    if json_output {
        let details = match &err {
            PanelError::MergeIntegrity(m) => serde_json::to_value(m).ok(),
            PanelError::BalanceViolation(r) => serde_json::to_value(r).ok(),
            _ => None,
        };
        let output = ErrorOutput {
            error: err.kind(),
            message: err.to_string(),
            exit_code: code,
            details,
        };
        if let Ok(text) = serde_json::to_string(&output) {
            eprintln!("{text}");
        }
    }
    CliError { code, message: err.to_string(), hint: Some("no artifacts were written".into()) }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write every artifact or none: each goes to a `.tmp` sibling first and is
/// renamed into place only after all of them were written.
fn write_artifacts(artifacts: &[(PathBuf, &[u8])]) -> Result<(), CliError> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(artifacts.len());
    for (path, bytes) in artifacts {
        let tmp = staging_path(path);
        if let Err(e) = std::fs::write(&tmp, bytes) {
            for t in &staged {
                let _ = std::fs::remove_file(t);
            }
            return Err(CliError::io(format!("cannot write {}: {e}", path.display()))
                .with_hint("no artifacts were written"));
        }
        staged.push(tmp);
    }

    for (i, (path, _)) in artifacts.iter().enumerate() {
        if let Err(e) = std::fs::rename(&staged[i], path) {
            for (done, _) in &artifacts[..i] {
                let _ = std::fs::remove_file(done);
            }
            for t in &staged[i..] {
                let _ = std::fs::remove_file(t);
            }
            return Err(CliError::io(format!("cannot write {}: {e}", path.display()))
                .with_hint("no artifacts were written"));
        }
    }

    for (path, _) in artifacts {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

pub fn cmd_run(
    config_path: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let (config, base) = load_config(config_path.as_deref())?;

    let income = read_source(&base, &config.income.file)?;
    let population = read_source(&base, &config.population.file)?;
    let register = read_source(&base, &config.register.file)?;

    let input = PipelineInput {
        income: &income,
        population: &population,
        register: &register,
    };
    let result = run(&config, &input).map_err(|e| engine_failure(e, json_output))?;

    // Render everything before touching the filesystem
    let panel_bytes = panel_csv(&result.panel).map_err(|e| engine_failure(e, json_output))?;
    let report = validate_panel(&config.name, &result.panel);
    let report_text = report.render();
    let svg = scatter_svg(&result.panel, &format!("{}: actual vs. predicted", config.name));
    let digest = fingerprint(&panel_bytes);

    let dir = out_dir.unwrap_or_else(|| base.join(&config.output.dir));
    std::fs::create_dir_all(&dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", dir.display())))?;

    let artifacts = [
        (dir.join(&config.output.panel), panel_bytes.as_slice()),
        (dir.join(&config.output.plot), svg.as_bytes()),
        (dir.join(&config.output.report), report_text.as_bytes()),
    ];
    write_artifacts(&artifacts)?;

    if json_output {
        let summary = RunSummary {
            name: &config.name,
            rows: result.panel.len(),
            rows_per_year: result.panel.year_counts(),
            fingerprint: digest.clone(),
            artifacts: artifacts.iter().map(|(p, _)| p.display().to_string()).collect(),
            stats: &result.stats,
            report: &report,
        };
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{text}");
    }

    // Human summary to stderr
    let s = &result.stats;
    eprintln!(
        "panel '{}': {} rows over {} year(s), sha256 {}",
        config.name,
        result.panel.len(),
        config.years.len(),
        digest,
    );
    eprintln!(
        "register: {} project(s), {} unreadable amount(s), {} group(s) outside the panel",
        s.register.rows_read, s.register.absent_amount, s.discarded_actuals.groups,
    );
    match report.correlation {
        Some(r) => eprintln!("corr(actual, predicted) = {r:.4}"),
        None => eprintln!("corr(actual, predicted) = n/a"),
    }

    Ok(())
}

pub fn cmd_validate(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let (config, base) = load_config(config_path.as_deref())?;
    eprintln!(
        "valid: '{}': {}..={} ({} year(s)), {} state(s) per year, {} panel row(s)",
        config.name,
        config.years.first,
        config.years.last,
        config.years.len(),
        config.jurisdictions.expected,
        config.expected_rows(),
    );
    for (label, file) in [
        ("income", &config.income.file),
        ("population", &config.population.file),
        ("register", &config.register.file),
    ] {
        let path = base.join(file);
        if !path.exists() {
            eprintln!("warning: {label} file {} does not exist", path.display());
        }
    }
    Ok(())
}
