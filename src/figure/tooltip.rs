use serde::Serialize;
use serde_json::json;

use crate::error::{DashError, DashResult};
use crate::figure::{to_svg, Figure};
use crate::logging::{log, obj, Domain, Level};

pub const TOOLTIP_CSS: &str = r#"
table
{
  border-collapse: collapse;
}
th
{
  color: #ffffff;
  background-color: #000000;
}
td
{
  background-color: #cccccc;
}
table, th, td
{
  font-family:Arial, Helvetica, sans-serif;
  border: 1px solid black;
  text-align: right;
}
"#;

/// Labels for one line, indexed like the line's points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTooltips {
    pub axes: usize,
    pub line: usize,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tooltips {
    pub lines: Vec<LineTooltips>,
    /// `(axes, line)` of lines left without tooltips because their marker cannot be hovered.
    pub skipped: Vec<(usize, usize)>,
}

impl Tooltips {
    pub fn label(&self, axes: usize, line: usize, point: usize) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| l.axes == axes && l.line == line)
            .and_then(|l| l.labels.get(point))
            .map(String::as_str)
    }

    pub fn count(&self) -> usize {
        self.lines.iter().map(|l| l.labels.len()).sum()
    }
}

/// Shortest round-trip decimal; integral values gain a `.0` (`1` prints `1.0`).
fn coord(v: f64) -> String {
    let s = v.to_string();
    if v.is_finite() && !s.contains('.') {
        format!("{}.0", s)
    } else {
        s
    }
}

/// The two-row x/y table shown when hovering one point.
pub fn point_tooltip(x: f64, y: f64) -> String {
    format!(
        r#"<table border="1" class="dataframe"> <thead> <tr style="text-align: right;"> </thead> <tbody> <tr> <th>x</th> <td>{}</td> </tr> <tr> <th>y</th> <td>{}</td> </tr> </tbody> </table>"#,
        coord(x),
        coord(y)
    )
}

pub fn attach_tooltips(fig: &Figure) -> Tooltips {
    let mut out = Tooltips::default();
    for (ai, axes) in fig.axes.iter().enumerate() {
        for (li, line) in axes.lines.iter().enumerate() {
            if !line.marker.is_hoverable() {
                out.skipped.push((ai, li));
                log(
                    Level::Warn,
                    Domain::Chart,
                    "tooltip.skipped",
                    obj(&[("axes", json!(ai)), ("line", json!(li)), ("marker", json!(line.marker))]),
                );
                continue;
            }
            let labels = line.points().map(|(x, y)| point_tooltip(x, y)).collect();
            out.lines.push(LineTooltips { axes: ai, line: li, labels });
        }
    }
    out
}

/// A standalone page with the SVG and a hover script that shows each point's table.
pub fn to_interactive_html(fig: &Figure, tooltips: &Tooltips, title: &str) -> DashResult<String> {
    let mut keyed = serde_json::Map::new();
    for l in &tooltips.lines {
        keyed.insert(format!("{}-{}", l.axes, l.line), json!(l.labels));
    }
    let table = serde_json::to_string(&keyed).map_err(|e| DashError::Render(e.to_string()))?;
    // Keep `</` out of the inline script.
    let table = table.replace("</", "<\\/");

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
{css}
#tip {{ position: absolute; pointer-events: none; display: none; }}
circle.pt {{ cursor: crosshair; }}
</style>
</head>
<body>
{svg}
<div id="tip"></div>
<script>
const TIPS = {table};
const tip = document.getElementById("tip");
document.querySelectorAll("circle.pt").forEach(function (c) {{
  const labels = TIPS[c.dataset.axes + "-" + c.dataset.line];
  if (!labels) return;
  const html = labels[Number(c.dataset.point)];
  c.addEventListener("mouseover", function () {{ tip.innerHTML = html; tip.style.display = "block"; }});
  c.addEventListener("mousemove", function (e) {{
    tip.style.left = (e.pageX + 10) + "px";
    tip.style.top = (e.pageY - 10) + "px";
  }});
  c.addEventListener("mouseout", function () {{ tip.style.display = "none"; }});
}});
</script>
</body>
</html>
"#,
        title = crate::render::html_escape(title),
        css = TOOLTIP_CSS,
        svg = to_svg(fig),
        table = table,
    ))
}
