use std::io::{Stdout, Write};

use crate::charts::{DensityHeatmap, Histogram};
use crate::engine::live::RunSummary;
use crate::engine::Tick;
use crate::error::{DashError, DashResult};
use crate::render::{Renderer, TableLayout};

const BAR_WIDTH: usize = 40;
const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Plain-text dashboard: summary cards, both charts and the head of the table.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    table: TableLayout,
    tick_count: usize,
    clear: bool,
}

impl ConsoleRenderer<Stdout> {
    /// Clears the terminal before every tick so only the latest frame is visible.
    pub fn stdout(table: TableLayout, tick_count: usize) -> Self {
        Self { out: std::io::stdout(), table, tick_count, clear: true }
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, table: TableLayout, tick_count: usize) -> Self {
        Self { out, table, tick_count, clear: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn frame(&self, tick: &Tick<'_>) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "== Real-Time / Live Data Science Dashboard == tick {}/{} | job={} | rows={}\n\n",
            tick.index + 1,
            self.tick_count,
            tick.snapshot.base.job,
            tick.snapshot.len()
        ));

        let cards = tick.kpis.cards();
        for c in &cards {
            s.push_str(&format!("{:<24}", c.label));
        }
        s.push('\n');
        for c in &cards {
            s.push_str(&format!("{:<24}", format!("{} ({})", c.value, c.delta_str())));
        }
        s.push_str("\n\n");

        s.push_str("-- First Chart: age_new by marital --\n");
        s.push_str(&heatmap_text(&tick.charts.heatmap));
        s.push_str("\n-- Second Chart: age_new histogram --\n");
        s.push_str(&histogram_text(&tick.charts.histogram));

        let rows = self.table.rows(tick);
        s.push_str(&format!(
            "\n-- Detailed Data View ({} of {} rows) --\n",
            rows.len(),
            tick.snapshot.len()
        ));
        s.push_str(&self.table.headers().join("\t"));
        s.push('\n');
        for row in rows {
            s.push_str(&row.join("\t"));
            s.push('\n');
        }
        s
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn name(&self) -> &'static str {
        "console"
    }

    fn render(&mut self, tick: &Tick<'_>) -> DashResult<()> {
        let frame = self.frame(tick);
        if self.clear {
            write!(self.out, "\x1b[2J\x1b[H")?;
        }
        self.out.write_all(frame.as_bytes())?;
        self.out.flush().map_err(DashError::from)
    }

    fn finish(&mut self, summary: &RunSummary) -> DashResult<()> {
        writeln!(
            self.out,
            "\nrun finished: rendered={} skipped={} cancelled={} halted={}",
            summary.rendered, summary.skipped, summary.cancelled, summary.halted
        )?;
        Ok(())
    }
}

pub fn histogram_text(h: &Histogram) -> String {
    let max = h.max_count().max(1);
    let mut s = String::new();
    for b in &h.bins {
        let width = b.count * BAR_WIDTH / max;
        s.push_str(&format!("{:>9.1} - {:>9.1} | {} {}\n", b.lo, b.hi, "#".repeat(width), b.count));
    }
    s
}

pub fn heatmap_text(hm: &DensityHeatmap) -> String {
    let max = hm.max_cell().max(1);
    let mut s = format!("{:>21} |", "");
    for c in &hm.categories {
        s.push_str(&format!(" {:^10}", truncate(c, 10)));
    }
    s.push('\n');
    // Highest bucket first so the y axis reads upwards.
    for (b, row) in hm.buckets.iter().zip(hm.cells.iter()).rev() {
        s.push_str(&format!("{:>9.1} - {:>9.1} |", b.lo, b.hi));
        for &n in row {
            let shade = SHADES[(n * (SHADES.len() - 1) + max - 1) / max];
            s.push_str(&format!(" {}{:>5}", shade.to_string().repeat(4), n));
        }
        s.push('\n');
    }
    s
}

fn truncate(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::Bin;
    use crate::data::{FilteredBase, Record};
    use crate::engine::{build_tick, LoopSettings};
    use crate::snapshot::TickDraws;

    #[test]
    fn test_histogram_text_scales_bars() {
        let h = Histogram {
            bins: vec![Bin { lo: 0.0, hi: 1.0, count: 2 }, Bin { lo: 1.0, hi: 2.0, count: 4 }],
        };
        let text = histogram_text(&h);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(&"#".repeat(BAR_WIDTH)));
        assert!(lines[0].ends_with(" 2"));
    }

    #[test]
    fn test_frame_contains_cards_and_table() {
        let base = FilteredBase {
            job: "admin.".into(),
            rows: vec![Record {
                age: 30.0,
                balance: 50.0,
                job: "admin.".into(),
                marital: "married".into(),
                extra: vec!["secondary".into()],
            }],
            married: 1,
        };
        let draws = TickDraws { age_mult: 2, balance_mult: 1, married_jitter: 1 };
        let tick = build_tick(&base, 0, draws, &LoopSettings::default()).unwrap();
        let table = TableLayout {
            columns: ["age", "job", "marital", "balance", "education"].iter().map(|s| s.to_string()).collect(),
            max_rows: 10,
        };
        let mut r = ConsoleRenderer::new(Vec::new(), table, 3);
        r.render(&tick).unwrap();
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert!(out.contains("tick 1/3"));
        assert!(out.contains("Married Count"));
        assert!(out.contains("60 (+50)"));
        assert!(out.contains("30\tadmin.\tmarried\t50\tsecondary\t60\t50"));
        assert!(!out.contains("\x1b[2J"));
    }
}
