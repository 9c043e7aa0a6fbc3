//! Renderers consume ticks; they never feed anything back into the loop.

use std::path::PathBuf;

use crate::engine::live::RunSummary;
use crate::engine::Tick;
use crate::error::DashResult;
use crate::state::Config;

pub mod console;
pub mod html;
pub mod log;

pub use console::ConsoleRenderer;
pub use html::HtmlRenderer;
pub use log::LogRenderer;

pub trait Renderer {
    fn name(&self) -> &'static str;

    /// Replace whatever the previous tick displayed with this tick.
    fn render(&mut self, tick: &Tick<'_>) -> DashResult<()>;

    fn finish(&mut self, _summary: &RunSummary) -> DashResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Console,
    Html,
    Log,
    All,
}

impl RenderKind {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("RENDER").unwrap_or_default())
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => RenderKind::Html,
            "log" | "json" => RenderKind::Log,
            "all" => RenderKind::All,
            _ => RenderKind::Console,
        }
    }

    /// `columns` is the dataset header in file order; the data table follows it.
    pub fn build(self, cfg: &Config, columns: &[String]) -> DashResult<Box<dyn Renderer>> {
        let table = TableLayout { columns: columns.to_vec(), max_rows: cfg.table_rows };
        let html = || HtmlRenderer::new(PathBuf::from(&cfg.out_dir), table.clone(), cfg.tick_count, cfg.tick_ms);
        let renderer: Box<dyn Renderer> = match self {
            RenderKind::Console => Box::new(ConsoleRenderer::stdout(table.clone(), cfg.tick_count)),
            RenderKind::Html => Box::new(html()?),
            RenderKind::Log => Box::new(LogRenderer::new()),
            RenderKind::All => Box::new(FanoutRenderer::new(vec![
                Box::new(ConsoleRenderer::stdout(table.clone(), cfg.tick_count)) as Box<dyn Renderer>,
                Box::new(html()?) as Box<dyn Renderer>,
                Box::new(LogRenderer::new()) as Box<dyn Renderer>,
            ])),
        };
        Ok(renderer)
    }

    /// Whether this kind writes the HTML page.
    pub fn writes_html(self) -> bool {
        matches!(self, RenderKind::Html | RenderKind::All)
    }
}

/// Columns and row cap for the detailed data view.
#[derive(Debug, Clone, Default)]
pub struct TableLayout {
    /// Source header in file order.
    pub columns: Vec<String>,
    pub max_rows: usize,
}

/// Where a header column's value lives on a `Record`.
enum Cell {
    Age,
    Balance,
    Job,
    Marital,
    Extra(usize),
}

impl TableLayout {
    /// Source columns in file order, then the two derived columns.
    pub fn headers(&self) -> Vec<String> {
        let mut h = self.columns.clone();
        h.push("age_new".to_string());
        h.push("balance_new".to_string());
        h
    }

    /// Required columns bind to their first matching header, as the parser does; every
    /// other header is the next `extra` cell.
    fn cells(&self) -> Vec<Cell> {
        let mut seen = [false; 4];
        let mut extra = 0;
        self.columns
            .iter()
            .map(|name| {
                let slot = match name.to_ascii_lowercase().as_str() {
                    "age" => Some((0, Cell::Age)),
                    "balance" => Some((1, Cell::Balance)),
                    "job" => Some((2, Cell::Job)),
                    "marital" => Some((3, Cell::Marital)),
                    _ => None,
                };
                match slot {
                    Some((i, cell)) if !seen[i] => {
                        seen[i] = true;
                        cell
                    }
                    _ => {
                        extra += 1;
                        Cell::Extra(extra - 1)
                    }
                }
            })
            .collect()
    }

    pub fn rows(&self, tick: &Tick<'_>) -> Vec<Vec<String>> {
        let cells = self.cells();
        tick.snapshot
            .rows()
            .take(self.max_rows)
            .map(|row| {
                let r = row.record;
                let mut out: Vec<String> = cells
                    .iter()
                    .map(|c| match c {
                        Cell::Age => fmt_num(r.age),
                        Cell::Balance => fmt_num(r.balance),
                        Cell::Job => r.job.clone(),
                        Cell::Marital => r.marital.clone(),
                        Cell::Extra(i) => r.extra.get(*i).cloned().unwrap_or_default(),
                    })
                    .collect();
                out.push(fmt_num(row.age_new));
                out.push(fmt_num(row.balance_new));
                out
            })
            .collect()
    }
}

/// Integers print without a fractional part.
pub fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Renders every tick to each inner renderer in order; the first error wins.
pub struct FanoutRenderer {
    inner: Vec<Box<dyn Renderer>>,
}

impl FanoutRenderer {
    pub fn new(inner: Vec<Box<dyn Renderer>>) -> Self {
        Self { inner }
    }
}

impl Renderer for FanoutRenderer {
    fn name(&self) -> &'static str {
        "fanout"
    }

    fn render(&mut self, tick: &Tick<'_>) -> DashResult<()> {
        for r in self.inner.iter_mut() {
            r.render(tick)?;
        }
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> DashResult<()> {
        for r in self.inner.iter_mut() {
            r.finish(summary)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_kind_parse() {
        assert_eq!(RenderKind::parse("HTML"), RenderKind::Html);
        assert_eq!(RenderKind::parse("json"), RenderKind::Log);
        assert_eq!(RenderKind::parse("all"), RenderKind::All);
        assert_eq!(RenderKind::parse(""), RenderKind::Console);
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(42.0), "42");
        assert_eq!(fmt_num(-3.0), "-3");
        assert_eq!(fmt_num(1.25), "1.25");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_headers_keep_file_order_then_derived() {
        let t = TableLayout { columns: cols(&["age", "job", "marital", "education", "balance"]), max_rows: 5 };
        assert_eq!(
            t.headers(),
            vec!["age", "job", "marital", "education", "balance", "age_new", "balance_new"]
        );
    }

    #[test]
    fn test_rows_follow_header_order() {
        use crate::data::parse_dataset;
        use crate::engine::{build_tick, LoopSettings};
        use crate::snapshot::TickDraws;

        let ds = parse_dataset("balance,education,job,age,marital,loan\n120,primary,admin.,30,married,no\n").unwrap();
        let base = crate::data::filter_by_job(&ds, "admin.").unwrap();
        let tick = build_tick(
            &base,
            0,
            TickDraws { age_mult: 2, balance_mult: 3, married_jitter: 1 },
            &LoopSettings::default(),
        )
        .unwrap();
        let t = TableLayout { columns: ds.columns.clone(), max_rows: 5 };
        assert_eq!(t.rows(&tick), vec![cols(&["120", "primary", "admin.", "30", "married", "no", "60", "360"])]);
    }

    #[test]
    fn test_html_kinds() {
        assert!(RenderKind::Html.writes_html());
        assert!(RenderKind::All.writes_html());
        assert!(!RenderKind::Console.writes_html());
        assert!(!RenderKind::Log.writes_html());
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }
}
