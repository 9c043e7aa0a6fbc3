use serde_json::json;

use crate::engine::live::RunSummary;
use crate::engine::Tick;
use crate::error::DashResult;
use crate::logging::{log, obj, v_num, v_str, Domain, Level};
use crate::render::Renderer;

/// One structured `tick` event per tick; useful headless or when piping to jq.
#[derive(Debug, Default)]
pub struct LogRenderer;

impl LogRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for LogRenderer {
    fn name(&self) -> &'static str {
        "log"
    }

    fn render(&mut self, tick: &Tick<'_>) -> DashResult<()> {
        let k = &tick.kpis;
        log(
            Level::Info,
            Domain::Kpi,
            "tick",
            obj(&[
                ("job", v_str(&tick.snapshot.base.job)),
                ("tick", json!(tick.index)),
                ("rows", v_num(tick.snapshot.len() as f64)),
                ("draws", json!(tick.draws)),
                ("kpis", json!(k)),
                ("hist_bins", json!(tick.charts.histogram.bins.len())),
                ("heatmap_categories", json!(tick.charts.heatmap.categories)),
            ]),
        );
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> DashResult<()> {
        log(
            Level::Info,
            Domain::System,
            "run.finished",
            obj(&[
                ("rendered", json!(summary.rendered)),
                ("skipped", json!(summary.skipped)),
                ("cancelled", json!(summary.cancelled)),
                ("halted", json!(summary.halted)),
            ]),
        );
        Ok(())
    }
}
