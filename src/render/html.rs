//! Self-contained HTML dashboard page.
//!
//! The page is rewritten on every tick and reloads itself at the tick interval, so a
//! browser pointed at `index.html` behaves like a live placeholder. Writes go
//! through a temp file and a rename; a reader never sees half a page.

use std::fs;
use std::path::{Path, PathBuf};

use crate::charts::{DensityHeatmap, Histogram};
use crate::engine::live::RunSummary;
use crate::engine::Tick;
use crate::error::DashResult;
use crate::kpi::MetricCard;
use crate::render::{html_escape, Renderer, TableLayout};

const CHART_W: f64 = 520.0;
const CHART_H: f64 = 320.0;
const PAD: f64 = 48.0;

pub struct HtmlRenderer {
    out_dir: PathBuf,
    table: TableLayout,
    tick_count: usize,
    refresh_secs: u64,
}

impl HtmlRenderer {
    pub fn new(out_dir: PathBuf, table: TableLayout, tick_count: usize, tick_ms: u64) -> DashResult<Self> {
        fs::create_dir_all(&out_dir)?;
        Ok(Self { out_dir, table, tick_count, refresh_secs: tick_ms.div_ceil(1000).max(1) })
    }

    pub fn page_path(&self) -> PathBuf {
        page_location(&self.out_dir)
    }

    fn write_atomic(&self, body: &str) -> DashResult<()> {
        let tmp = self.out_dir.join("index.html.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, self.page_path())?;
        Ok(())
    }

    pub fn page(&self, tick: &Tick<'_>) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta http-equiv="refresh" content="{refresh}">
    <title>Real-Time Data Science Dashboard</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        <header>
            <h1>🤖 Real-Time / Live Data Science Dashboard</h1>
            <div class="meta">job: <b>{job}</b> · tick {n}/{total} · multipliers age×{am} balance×{bm}</div>
        </header>
        <div class="cards">{cards}</div>
        <div class="charts">
            <section><h3>First Chart</h3>{heatmap}</section>
            <section><h3>Second Chart</h3>{histogram}</section>
        </div>
        <h3>Detailed Data View</h3>
        {table}
    </div>
</body>
</html>"#,
            refresh = self.refresh_secs,
            css = inline_css(),
            job = html_escape(&tick.snapshot.base.job),
            n = tick.index + 1,
            total = self.tick_count,
            am = tick.draws.age_mult,
            bm = tick.draws.balance_mult,
            cards = tick.kpis.cards().iter().map(render_card).collect::<String>(),
            heatmap = heatmap_svg(&tick.charts.heatmap),
            histogram = histogram_svg(&tick.charts.histogram),
            table = self.render_table(tick),
        )
    }

    fn render_table(&self, tick: &Tick<'_>) -> String {
        let mut s = String::from("<table class=\"data\"><thead><tr>");
        for h in self.table.headers() {
            s.push_str(&format!("<th>{}</th>", html_escape(&h)));
        }
        s.push_str("</tr></thead><tbody>");
        for row in self.table.rows(tick) {
            s.push_str("<tr>");
            for cell in row {
                s.push_str(&format!("<td>{}</td>", html_escape(&cell)));
            }
            s.push_str("</tr>");
        }
        s.push_str("</tbody></table>");
        s
    }
}

impl Renderer for HtmlRenderer {
    fn name(&self) -> &'static str {
        "html"
    }

    fn render(&mut self, tick: &Tick<'_>) -> DashResult<()> {
        let page = self.page(tick);
        self.write_atomic(&page)
    }

    fn finish(&mut self, summary: &RunSummary) -> DashResult<()> {
        let body = serde_json::json!({
            "rendered": summary.rendered,
            "skipped": summary.skipped,
            "cancelled": summary.cancelled,
            "halted": summary.halted,
        });
        fs::write(self.out_dir.join("summary.json"), body.to_string())?;
        Ok(())
    }
}

fn render_card(card: &MetricCard) -> String {
    let class = if card.delta >= 0 { "up" } else { "down" };
    format!(
        r#"<div class="card"><div class="label">{}</div><div class="value">{}</div><div class="delta {}">{}</div></div>"#,
        html_escape(card.label),
        html_escape(&card.value),
        class,
        card.delta_str()
    )
}

/// Heatmap as an SVG grid; darker cells hold more points.
pub fn heatmap_svg(hm: &DensityHeatmap) -> String {
    let cols = hm.categories.len().max(1) as f64;
    let rows = hm.buckets.len().max(1) as f64;
    let cw = (CHART_W - PAD * 2.0) / cols;
    let ch = (CHART_H - PAD * 2.0) / rows;
    let max = hm.max_cell().max(1) as f64;

    let mut s = svg_open();
    for (y, (bucket, row)) in hm.buckets.iter().zip(hm.cells.iter()).enumerate() {
        // Bucket 0 sits at the bottom.
        let top = CHART_H - PAD - ch * (y as f64 + 1.0);
        for (x, &n) in row.iter().enumerate() {
            let alpha = n as f64 / max;
            s.push_str(&format!(
                r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="rgba(99,110,250,{:.3})" stroke="#fff"><title>{}, {:.1}-{:.1}: {}</title></rect>"##,
                PAD + cw * x as f64,
                top,
                cw,
                ch,
                alpha,
                html_escape(&hm.categories[x]),
                bucket.lo,
                bucket.hi,
                n
            ));
        }
        s.push_str(&axis_label(PAD - 4.0, top + ch / 2.0, "end", &format!("{:.0}", bucket.lo)));
    }
    for (x, c) in hm.categories.iter().enumerate() {
        s.push_str(&axis_label(PAD + cw * (x as f64 + 0.5), CHART_H - PAD + 16.0, "middle", c));
    }
    s.push_str(&axis_label(CHART_W / 2.0, CHART_H - 8.0, "middle", "marital"));
    s.push_str("</svg>");
    s
}

pub fn histogram_svg(h: &Histogram) -> String {
    let n = h.bins.len().max(1) as f64;
    let bw = (CHART_W - PAD * 2.0) / n;
    let max = h.max_count().max(1) as f64;
    let plot_h = CHART_H - PAD * 2.0;

    let mut s = svg_open();
    for (i, b) in h.bins.iter().enumerate() {
        let bh = plot_h * b.count as f64 / max;
        s.push_str(&format!(
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#636efa" stroke="#fff"><title>{:.1}-{:.1}: {}</title></rect>"##,
            PAD + bw * i as f64,
            CHART_H - PAD - bh,
            bw,
            bh,
            b.lo,
            b.hi,
            b.count
        ));
    }
    if let (Some(first), Some(last)) = (h.bins.first(), h.bins.last()) {
        s.push_str(&axis_label(PAD, CHART_H - PAD + 16.0, "start", &format!("{:.0}", first.lo)));
        s.push_str(&axis_label(CHART_W - PAD, CHART_H - PAD + 16.0, "end", &format!("{:.0}", last.hi)));
    }
    s.push_str(&axis_label(PAD - 4.0, PAD, "end", &h.max_count().to_string()));
    s.push_str(&axis_label(CHART_W / 2.0, CHART_H - 8.0, "middle", "age_new"));
    s.push_str("</svg>");
    s
}

fn svg_open() -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = CHART_W,
        h = CHART_H
    )
}

fn axis_label(x: f64, y: f64, anchor: &str, text: &str) -> String {
    format!(
        r#"<text x="{:.1}" y="{:.1}" text-anchor="{}" font-size="11">{}</text>"#,
        x,
        y,
        anchor,
        html_escape(text)
    )
}

fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; color: #111827; background: #fff; }
.container { max-width: 1200px; margin: 0 auto; padding: 2rem; }
header { margin-bottom: 1.5rem; border-bottom: 2px solid #e5e7eb; padding-bottom: 1rem; }
header .meta { color: #6b7280; font-size: 0.875rem; margin-top: 0.25rem; }
.cards { display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem; margin-bottom: 1.5rem; }
.card { border: 1px solid #e5e7eb; border-radius: 8px; padding: 1rem; }
.card .label { color: #6b7280; font-size: 0.875rem; }
.card .value { font-size: 2rem; font-weight: 600; }
.delta.up { color: #059669; }
.delta.down { color: #dc2626; }
.charts { display: grid; grid-template-columns: repeat(2, 1fr); gap: 1rem; margin-bottom: 1.5rem; }
table.data { border-collapse: collapse; width: 100%; font-size: 0.8rem; }
table.data th, table.data td { border: 1px solid #e5e7eb; padding: 0.25rem 0.5rem; text-align: right; }
table.data th { background: #f9fafb; }
"#
}

/// Where the page for `out_dir` is written; `livedash` logs it at startup.
pub fn page_location(out_dir: &Path) -> PathBuf {
    out_dir.join("index.html")
}
