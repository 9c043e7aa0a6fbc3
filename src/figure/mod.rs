//! Line figures with vertically stacked subplots, rendered to static SVG.
//!
//! Hover tooltips live in [`tooltip`]; they attach to markers, so a line drawn without a
//! marker can be plotted but not hovered.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::render::html_escape;

pub mod tooltip;

pub use tooltip::{attach_tooltips, point_tooltip, to_interactive_html, LineTooltips, Tooltips, TOOLTIP_CSS};

pub const TAB_BLUE: &str = "#1f77b4";
pub const TAB_ORANGE: &str = "#ff7f0e";
pub const BLACK: &str = "#000000";

const AXES_PAD: f64 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    None,
    /// `,`: a single pixel
    Pixel,
    /// `.`: a small dot
    Point,
    /// `+`: drawn as a cross, which has no hover target.
    Plus,
}

impl Marker {
    pub fn radius(&self) -> f64 {
        match self {
            Marker::None => 0.0,
            Marker::Pixel => 1.0,
            Marker::Point => 2.5,
            Marker::Plus => 3.0,
        }
    }

    /// Whether a tooltip can be bound to this marker.
    pub fn is_hoverable(&self) -> bool {
        matches!(self, Marker::Pixel | Marker::Point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub color: String,
    pub marker: Marker,
    pub line_style: LineStyle,
}

impl Line {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, color: &str) -> Self {
        Self { xs, ys, color: color.to_string(), marker: Marker::None, line_style: LineStyle::Solid }
    }

    pub fn from_fn(xs: Vec<f64>, f: impl Fn(f64) -> f64, color: &str) -> Self {
        let ys = xs.iter().map(|&x| f(x)).collect();
        Self::new(xs, ys, color)
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.marker = marker;
        self
    }

    pub fn style(mut self, line_style: LineStyle) -> Self {
        self.line_style = line_style;
        self
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub lines: Vec<Line>,
}

impl Axes {
    pub fn plot(&mut self, line: Line) -> &mut Self {
        self.lines.push(line);
        self
    }

    /// `(x_min, x_max, y_min, y_max)` over every line; degenerate spans are widened by 1.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut pts = self.lines.iter().flat_map(|l| l.points()).filter(|(x, y)| x.is_finite() && y.is_finite());
        let (x0, y0) = pts.next()?;
        let (mut x_min, mut x_max, mut y_min, mut y_max) = (x0, x0, y0, y0);
        for (x, y) in pts {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        if x_max == x_min {
            x_min -= 0.5;
            x_max += 0.5;
        }
        if y_max == y_min {
            y_min -= 0.5;
            y_max += 0.5;
        }
        Some((x_min, x_max, y_min, y_max))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub width: f64,
    pub height: f64,
    pub axes: Vec<Axes>,
}

impl Figure {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, axes: Vec::new() }
    }

    /// Append a subplot below the existing ones.
    pub fn subplot(&mut self) -> &mut Axes {
        self.axes.push(Axes::default());
        let last = self.axes.len() - 1;
        &mut self.axes[last]
    }

    fn panel_height(&self) -> f64 {
        self.height / self.axes.len().max(1) as f64
    }
}

/// `start, start + step, ...` up to but excluding `stop`.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step == 0.0 || !step.is_finite() {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil();
    if n.is_nan() || n <= 0.0 {
        return Vec::new();
    }
    (0..n as usize).map(|i| start + i as f64 * step).collect()
}

pub fn damped_cosine(t: f64) -> f64 {
    (-t).exp() * (2.0 * PI * t).cos()
}

/// Two subplots: the damped cosine sampled coarse and fine, then a dashed plain cosine.
pub fn demo_figure() -> Figure {
    let t1 = arange(0.0, 5.0, 0.1);
    let t2 = arange(0.0, 5.0, 0.02);

    let mut fig = Figure::new(480.0, 480.0);
    fig.subplot()
        .plot(Line::from_fn(t1, damped_cosine, TAB_BLUE).marker(Marker::Pixel))
        .plot(Line::from_fn(t2.clone(), damped_cosine, BLACK).marker(Marker::Point));
    fig.subplot().plot(
        Line::from_fn(t2, |t| (2.0 * PI * t).cos(), TAB_ORANGE)
            .marker(Marker::Point)
            .style(LineStyle::Dashed),
    );
    fig
}

/// Static SVG. Markers carry `data-axes`, `data-line` and `data-point` so a page script can
/// look up the tooltip for the hovered point.
pub fn to_svg(fig: &Figure) -> String {
    let mut s = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = fig.width,
        h = fig.height
    );
    let panel_h = fig.panel_height();
    for (ai, axes) in fig.axes.iter().enumerate() {
        let top = panel_h * ai as f64;
        let left = AXES_PAD;
        let plot_w = fig.width - AXES_PAD * 1.5;
        let plot_h = panel_h - AXES_PAD;
        s.push_str(&format!(
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#333"/>"##,
            left,
            top + AXES_PAD / 2.0,
            plot_w,
            plot_h
        ));
        let Some((x_min, x_max, y_min, y_max)) = axes.bounds() else {
            continue;
        };
        let px = |x: f64| left + (x - x_min) / (x_max - x_min) * plot_w;
        let py = |y: f64| top + AXES_PAD / 2.0 + plot_h - (y - y_min) / (y_max - y_min) * plot_h;

        for (li, line) in axes.lines.iter().enumerate() {
            let path: Vec<String> = line
                .points()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|(x, y)| format!("{:.2},{:.2}", px(x), py(y)))
                .collect();
            let dash = match line.line_style {
                LineStyle::Solid => "",
                LineStyle::Dashed => r#" stroke-dasharray="6,4""#,
            };
            s.push_str(&format!(
                r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="1.5"{}/>"#,
                path.join(" "),
                html_escape(&line.color),
                dash
            ));
            if line.marker == Marker::None {
                continue;
            }
            for (pi, (x, y)) in line.points().enumerate() {
                if !(x.is_finite() && y.is_finite()) {
                    continue;
                }
                s.push_str(&format!(
                    r#"<circle class="pt" cx="{:.2}" cy="{:.2}" r="{}" fill="{}" data-axes="{}" data-line="{}" data-point="{}"/>"#,
                    px(x),
                    py(y),
                    line.marker.radius(),
                    html_escape(&line.color),
                    ai,
                    li,
                    pi
                ));
            }
        }
        let label_y = top + AXES_PAD / 2.0 + plot_h + 14.0;
        s.push_str(&tick_label(left, label_y, "start", x_min));
        s.push_str(&tick_label(left + plot_w, label_y, "end", x_max));
        s.push_str(&tick_label(left - 4.0, top + AXES_PAD / 2.0 + 4.0, "end", y_max));
        s.push_str(&tick_label(left - 4.0, top + AXES_PAD / 2.0 + plot_h, "end", y_min));
    }
    s.push_str("</svg>");
    s
}

fn tick_label(x: f64, y: f64, anchor: &str, v: f64) -> String {
    format!(r#"<text x="{:.1}" y="{:.1}" text-anchor="{}" font-size="10">{:.2}</text>"#, x, y, anchor, v)
}
