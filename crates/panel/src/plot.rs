//! SVG scatter of actual vs. predicted funding with a 45-degree reference line.

use std::fmt::Write as _;

use crate::model::Panel;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 540.0;
const MARGIN: f64 = 70.0;

struct Axis {
    min: f64,
    max: f64,
}

impl Axis {
    fn new(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        if max <= min {
            return Self {
                min: min - 0.5,
                max: max + 0.5,
            };
        }
        Self { min, max }
    }

    fn fraction(&self, v: f64) -> f64 {
        (v - self.min) / (self.max - self.min)
    }
}

fn px(axis: &Axis, v: f64) -> f64 {
    MARGIN + axis.fraction(v) * (WIDTH - 2.0 * MARGIN)
}

fn py(axis: &Axis, v: f64) -> f64 {
    HEIGHT - MARGIN - axis.fraction(v) * (HEIGHT - 2.0 * MARGIN)
}

fn millions(v: f64) -> String {
    format!("{:.1}M", v / 1_000_000.0)
}

/// Render the scatter. The identity line spans the predicted range; the y axis
/// covers both actual values and that line.
pub fn scatter_svg(panel: &Panel, title: &str) -> String {
    let rows = panel.rows();
    let x = Axis::new(rows.iter().map(|r| r.predicted));
    let y = Axis::new(
        rows.iter()
            .map(|r| r.actual)
            .chain([x.min, x.max]),
    );

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="30" text-anchor="middle" font-family="sans-serif" font-size="16">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );

    // Axes
    let (x0, x1) = (MARGIN, WIDTH - MARGIN);
    let (y0, y1) = (HEIGHT - MARGIN, MARGIN);
    let _ = writeln!(svg, r#"<line x1="{x0}" y1="{y0}" x2="{x1}" y2="{y0}" stroke="black"/>"#);
    let _ = writeln!(svg, r#"<line x1="{x0}" y1="{y0}" x2="{x0}" y2="{y1}" stroke="black"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{x0}" y="{}" font-family="sans-serif" font-size="11">{}</text>"#,
        y0 + 18.0,
        millions(x.min)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{x1}" y="{}" text-anchor="end" font-family="sans-serif" font-size="11">{}</text>"#,
        y0 + 18.0,
        millions(x.max)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{y0}" text-anchor="end" font-family="sans-serif" font-size="11">{}</text>"#,
        x0 - 6.0,
        millions(y.min)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end" font-family="sans-serif" font-size="11">{}</text>"#,
        x0 - 6.0,
        y1 + 4.0,
        millions(y.max)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="13">Predicted allotment</text>"#,
        WIDTH / 2.0,
        HEIGHT - 20.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{}" text-anchor="middle" font-family="sans-serif" font-size="13" transform="rotate(-90 20 {})">Actual funding</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0
    );

    // Identity line over the predicted range
    let _ = writeln!(
        svg,
        r#"<line class="identity" x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="firebrick" stroke-dasharray="6 4"/>"#,
        px(&x, x.min),
        py(&y, x.min),
        px(&x, x.max),
        py(&y, x.max)
    );

    for r in rows {
        let _ = writeln!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="3" fill="steelblue" fill-opacity="0.6"><title>{}</title></circle>"#,
            px(&x, r.predicted),
            py(&y, r.actual),
            escape(&r.state_year)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
