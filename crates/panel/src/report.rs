//! Validation statistics for the finished panel: Pearson correlation and a
//! simple OLS of actual funding on predicted allotment.

use std::fmt::Write as _;

use serde::Serialize;

use crate::model::Panel;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Regression {
    pub n: usize,
    pub intercept: f64,
    pub slope: f64,
    /// Standard errors need at least three points.
    pub intercept_se: Option<f64>,
    pub slope_se: Option<f64>,
    pub r_squared: Option<f64>,
}

impl Regression {
    pub fn slope_t(&self) -> Option<f64> {
        self.slope_se.filter(|se| *se > 0.0).map(|se| self.slope / se)
    }

    pub fn intercept_t(&self) -> Option<f64> {
        self.intercept_se
            .filter(|se| *se > 0.0)
            .map(|se| self.intercept / se)
    }
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Pearson r. `None` with fewer than two points or no variance.
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Least-squares fit of `ys = intercept + slope * xs`.
pub fn regress(xs: &[f64], ys: &[f64]) -> Option<Regression> {
    let n = xs.len();
    if n != ys.len() || n < 2 {
        return None;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let sxx: f64 = xs.iter().map(|x| (x - mx) * (x - mx)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let syy: f64 = ys.iter().map(|y| (y - my) * (y - my)).sum();

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let sse: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| {
            let resid = y - intercept - slope * x;
            resid * resid
        })
        .sum();

    let (intercept_se, slope_se) = if n > 2 {
        let sigma2 = sse / (n - 2) as f64;
        (
            Some((sigma2 * (1.0 / n as f64 + mx * mx / sxx)).sqrt()),
            Some((sigma2 / sxx).sqrt()),
        )
    } else {
        (None, None)
    };
    let r_squared = (syy > 0.0).then(|| 1.0 - sse / syy);

    Some(Regression {
        n,
        intercept,
        slope,
        intercept_se,
        slope_se,
        r_squared,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub name: String,
    pub rows: usize,
    pub total_predicted: f64,
    pub total_actual: f64,
    pub correlation: Option<f64>,
    pub regression: Option<Regression>,
}

pub fn validate_panel(name: &str, panel: &Panel) -> ValidationReport {
    let predicted = panel.predicted();
    let actual = panel.actual();
    ValidationReport {
        name: name.to_string(),
        rows: panel.len(),
        total_predicted: predicted.iter().sum(),
        total_actual: actual.iter().sum(),
        correlation: correlation(&predicted, &actual),
        regression: regress(&predicted, &actual),
    }
}

fn opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".into(),
    }
}

impl ValidationReport {
    /// Plain-text report: correlation, then the regression table.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.name);
        let _ = writeln!(out, "{}", "=".repeat(self.name.len().max(8)));
        let _ = writeln!(out, "observations       {}", self.rows);
        let _ = writeln!(out, "total predicted    {:.0}", self.total_predicted);
        let _ = writeln!(out, "total actual       {:.0}", self.total_actual);
        let _ = writeln!(out);
        let _ = writeln!(out, "corr(actual, predicted) = {}", opt(self.correlation, 4));
        let _ = writeln!(out);

        match &self.regression {
            Some(r) => {
                let _ = writeln!(out, "OLS: actual = b0 + b1 * predicted   (n = {})", r.n);
                let _ = writeln!(out, "{:<12}{:>18}{:>16}{:>10}", "term", "coef", "std err", "t");
                let _ = writeln!(
                    out,
                    "{:<12}{:>18.4}{:>16}{:>10}",
                    "intercept",
                    r.intercept,
                    opt(r.intercept_se, 4),
                    opt(r.intercept_t(), 2),
                );
                let _ = writeln!(
                    out,
                    "{:<12}{:>18.4}{:>16}{:>10}",
                    "predicted",
                    r.slope,
                    opt(r.slope_se, 4),
                    opt(r.slope_t(), 2),
                );
                let _ = writeln!(out, "R-squared = {}", opt(r.r_squared, 4));
            }
            None => {
                let _ = writeln!(out, "OLS: not estimable (fewer than two points or constant predicted)");
            }
        }
        out
    }
}
