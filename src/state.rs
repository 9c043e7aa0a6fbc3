use std::path::Path;
use std::time::Duration;

use crate::engine::LoopSettings;
use crate::error::{DashError, DashResult};
use crate::render::RenderKind;
use crate::snapshot::DrawRanges;

pub const DEFAULT_KILL_FILE: &str = "/tmp/LIVEDASH_STOP";

pub const DEFAULT_DATASET: &str =
    "https://raw.githubusercontent.com/Lexie88rus/bank-marketing-analysis/master/bank.csv";

#[derive(Debug, Clone)]
pub struct Config {
    /// File path or http(s) URL of the source CSV.
    pub dataset: String,
    /// Job to filter on; `None` picks the first distinct job in the data.
    pub job_filter: Option<String>,
    pub tick_count: usize,
    pub tick_ms: u64,
    pub mult_min: i64,
    pub mult_max: i64,
    pub jitter_min: i64,
    pub jitter_max: i64,
    pub delta_offset: i64,
    pub seed: Option<u64>,
    pub hist_bins: usize,
    pub heatmap_bins: usize,
    pub table_rows: usize,
    pub render: RenderKind,
    pub out_dir: String,
    pub max_tick_failures: u32,
    pub kill_file: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            dataset: std::env::var("DATASET").unwrap_or_else(|_| DEFAULT_DATASET.to_string()),
            job_filter: std::env::var("JOB_FILTER").ok().filter(|v| !v.trim().is_empty()),
            tick_count: std::env::var("TICK_COUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(200),
            tick_ms: std::env::var("TICK_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(1000),
            mult_min: std::env::var("MULT_MIN").ok().and_then(|v| v.parse().ok()).unwrap_or(1),
            mult_max: std::env::var("MULT_MAX").ok().and_then(|v| v.parse().ok()).unwrap_or(4),
            jitter_min: std::env::var("JITTER_MIN").ok().and_then(|v| v.parse().ok()).unwrap_or(1),
            jitter_max: std::env::var("JITTER_MAX").ok().and_then(|v| v.parse().ok()).unwrap_or(29),
            delta_offset: std::env::var("DELTA_OFFSET").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
            seed: std::env::var("SEED").ok().and_then(|v| v.parse().ok()),
            hist_bins: std::env::var("HIST_BINS").ok().and_then(|v| v.parse().ok()).unwrap_or(20),
            heatmap_bins: std::env::var("HEATMAP_BINS").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
            table_rows: std::env::var("TABLE_ROWS").ok().and_then(|v| v.parse().ok()).unwrap_or(20),
            render: RenderKind::from_env(),
            out_dir: std::env::var("OUT_DIR").unwrap_or_else(|_| "out/dashboard".to_string()),
            max_tick_failures: std::env::var("MAX_TICK_FAILURES").ok().and_then(|v| v.parse().ok()).unwrap_or(5),
            kill_file: std::env::var("KILL_FILE").unwrap_or_else(|_| DEFAULT_KILL_FILE.to_string()),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn draw_ranges(&self) -> DrawRanges {
        DrawRanges {
            multiplier: (self.mult_min, self.mult_max),
            married_jitter: (self.jitter_min, self.jitter_max),
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            tick_count: self.tick_count,
            ranges: self.draw_ranges(),
            delta_offset: self.delta_offset,
            hist_bins: self.hist_bins,
            heatmap_bins: self.heatmap_bins,
        }
    }

    pub fn kill_switch_engaged(&self) -> bool {
        !self.kill_file.is_empty() && Path::new(&self.kill_file).exists()
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> DashResult<()> {
        self.loop_settings().validate()?;
        if self.max_tick_failures == 0 {
            return Err(DashError::InvalidConfig("MAX_TICK_FAILURES must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            job_filter: None,
            tick_count: 200,
            tick_ms: 1000,
            mult_min: 1,
            mult_max: 4,
            jitter_min: 1,
            jitter_max: 29,
            delta_offset: 10,
            seed: None,
            hist_bins: 20,
            heatmap_bins: 10,
            table_rows: 20,
            render: RenderKind::Console,
            out_dir: "out/dashboard".to_string(),
            max_tick_failures: 5,
            kill_file: DEFAULT_KILL_FILE.to_string(),
        }
    }
}
