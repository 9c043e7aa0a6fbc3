//! The refresh loop.
//!
//! ```text
//! ┌──────────────┐   draws   ┌──────────────┐        ┌──────────────┐
//! │ FilteredBase │──────────►│   Snapshot   │───────►│ KPI + charts │──► Renderer
//! │  (constant)  │  per tick │ (age/bal new)│  pure  │  (per tick)  │
//! └──────────────┘           └──────────────┘        └──────────────┘
//! ```
//!
//! [`RefreshLoop`] is a plain iterator: it computes ticks and never sleeps or renders.
//! [`live::run_live`] drives it against a renderer with a fixed wait between ticks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::charts::ChartDatasets;
use crate::data::FilteredBase;
use crate::error::{DashError, DashResult};
use crate::kpi::KpiBundle;
use crate::snapshot::{DrawRanges, Snapshot, TickDraws, MAX_ABS_SETTING};

pub mod breaker;
pub mod live;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    pub tick_count: usize,
    pub ranges: DrawRanges,
    pub delta_offset: i64,
    pub hist_bins: usize,
    pub heatmap_bins: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            tick_count: 200,
            ranges: DrawRanges::default(),
            delta_offset: 10,
            hist_bins: 20,
            heatmap_bins: 10,
        }
    }
}

impl LoopSettings {
    pub fn validate(&self) -> DashResult<()> {
        self.ranges.validate()?;
        if self.delta_offset.unsigned_abs() > MAX_ABS_SETTING.unsigned_abs() {
            return Err(DashError::InvalidConfig(format!(
                "delta offset {} exceeds +/-{}",
                self.delta_offset, MAX_ABS_SETTING
            )));
        }
        if self.hist_bins == 0 || self.heatmap_bins == 0 {
            return Err(DashError::InvalidConfig("bin counts must be positive".to_string()));
        }
        Ok(())
    }
}

/// Everything one tick hands to a renderer.
#[derive(Debug, Clone)]
pub struct Tick<'a> {
    pub index: usize,
    pub draws: TickDraws,
    pub snapshot: Snapshot<'a>,
    pub kpis: KpiBundle,
    pub charts: ChartDatasets,
}

/// Compute one tick from the base and its draws. No partial tick is ever returned.
pub fn build_tick<'a>(
    base: &'a FilteredBase,
    index: usize,
    draws: TickDraws,
    settings: &LoopSettings,
) -> DashResult<Tick<'a>> {
    let snapshot = Snapshot::build(base, &draws)?;
    let kpis = KpiBundle::compute(&snapshot, draws.married_jitter, settings.delta_offset)?;
    let charts = ChartDatasets::from_snapshot(&snapshot, settings.heatmap_bins, settings.hist_bins);
    Ok(Tick { index, draws, snapshot, kpis, charts })
}

/// Finite, non-restartable sequence of ticks over one filtered base.
pub struct RefreshLoop<'a, R> {
    base: &'a FilteredBase,
    rng: R,
    settings: LoopSettings,
    next: usize,
}

impl<'a, R: Rng> RefreshLoop<'a, R> {
    pub fn new(base: &'a FilteredBase, rng: R, settings: LoopSettings) -> DashResult<Self> {
        settings.validate()?;
        if base.is_empty() {
            return Err(DashError::EmptyFilterResult(base.job.clone()));
        }
        Ok(Self { base, rng, settings, next: 0 })
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn base(&self) -> &'a FilteredBase {
        self.base
    }

    /// Ticks not yet produced.
    pub fn remaining(&self) -> usize {
        self.settings.tick_count.saturating_sub(self.next)
    }
}

impl<'a> RefreshLoop<'a, StdRng> {
    /// Seeded runs are reproducible; `None` seeds from OS entropy.
    pub fn seeded(base: &'a FilteredBase, settings: LoopSettings, seed: Option<u64>) -> DashResult<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self::new(base, rng, settings)
    }
}

impl<'a, R: Rng> Iterator for RefreshLoop<'a, R> {
    type Item = DashResult<Tick<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.settings.tick_count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let draws = TickDraws::sample(&mut self.rng, &self.settings.ranges);
        Some(build_tick(self.base, index, draws, &self.settings))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl<R: Rng> ExactSizeIterator for RefreshLoop<'_, R> {}
