use rand::Rng;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};

use crate::engine::breaker::TickBreaker;
use crate::engine::RefreshLoop;
use crate::logging::{agg_increment, log, obj, tick_aggregator, v_num, v_str, Domain, Level, ProfileScope};
use crate::render::Renderer;
use crate::verify::invariants::check_tick;

/// Checked at the top of every tick. Tripped by `cancel()` or by the kill file appearing.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
    kill_file: Option<PathBuf>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kill_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.kill_file = if path.as_os_str().is_empty() { None } else { Some(path) };
        self
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.kill_file.as_ref().map(|p| p.exists()).unwrap_or(false)
    }

    /// Resolves once `cancel()` has been called.
    pub async fn cancelled(&self) {
        if self.flag.load(Ordering::SeqCst) {
            return;
        }
        self.notify.notified().await;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rendered: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub halted: bool,
}

/// Drive the loop: compute, check, render, then wait `interval` before the next tick.
///
/// A failed tick is skipped without rendering. The run halts once `max_failures` ticks
/// fail in a row. There is no wait after the final tick.
pub async fn run_live<R: Rng>(
    mut ticks: RefreshLoop<'_, R>,
    renderer: &mut dyn Renderer,
    interval: Duration,
    cancel: &CancelToken,
    max_failures: u32,
) -> RunSummary {
    let settings = *ticks.settings();
    let mut breaker = TickBreaker::new(max_failures);
    let mut summary = RunSummary::default();

    log(
        Level::Info,
        Domain::System,
        "loop.start",
        obj(&[
            ("job", v_str(&ticks.base().job)),
            ("rows", v_num(ticks.base().len() as f64)),
            ("tick_count", json!(settings.tick_count)),
            ("interval_ms", json!(interval.as_millis() as u64)),
            ("renderer", v_str(renderer.name())),
        ]),
    );

    loop {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            log(Level::Info, Domain::System, "loop.cancelled", obj(&[("rendered", json!(summary.rendered))]));
            break;
        }
        let index = summary.rendered + summary.skipped;
        let Some(result) = ticks.next() else {
            break;
        };

        let outcome = {
            let _prof = ProfileScope::with_context("engine", "tick", &[("tick", json!(index))]);
            result.and_then(|tick| {
                check_tick(&tick, &settings)?;
                renderer.render(&tick)?;
                Ok(tick.kpis)
            })
        };

        match outcome {
            Ok(kpis) => {
                breaker.record_success();
                summary.rendered += 1;
                agg_increment("rendered");
                log(
                    Level::Debug,
                    Domain::Tick,
                    "tick.rendered",
                    obj(&[("tick", json!(index)), ("kpis", json!(kpis))]),
                );
            }
            Err(err) => {
                breaker.record_failure();
                summary.skipped += 1;
                agg_increment("skipped");
                log(
                    Level::Warn,
                    Domain::Tick,
                    "tick.skipped",
                    obj(&[
                        ("tick", json!(index)),
                        ("kind", v_str(err.kind())),
                        ("msg", v_str(&err.to_string())),
                        ("consecutive_failures", json!(breaker.consecutive_failures)),
                    ]),
                );
            }
        }
        tick_aggregator();

        if !breaker.allow() {
            summary.halted = true;
            log(
                Level::Error,
                Domain::System,
                "loop.halted",
                obj(&[("consecutive_failures", json!(breaker.consecutive_failures))]),
            );
            break;
        }
        if ticks.remaining() == 0 {
            break;
        }
        tokio::select! {
            _ = sleep(interval) => {}
            _ = cancel.cancelled() => {}
        }
    }

    if let Err(err) = renderer.finish(&summary) {
        log(
            Level::Warn,
            Domain::Render,
            "render.finish_failed",
            obj(&[("kind", v_str(err.kind())), ("msg", v_str(&err.to_string()))]),
        );
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FilteredBase, Record};
    use crate::engine::{LoopSettings, Tick};
    use crate::error::{DashError, DashResult};
    use crate::kpi::KpiBundle;
    use crate::snapshot::DrawRanges;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recording {
        kpis: Vec<KpiBundle>,
        cancel_after: Option<(usize, CancelToken)>,
        fail: bool,
        finished: Option<RunSummary>,
    }

    impl Renderer for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn render(&mut self, tick: &Tick<'_>) -> DashResult<()> {
            if self.fail {
                return Err(DashError::Render("boom".to_string()));
            }
            self.kpis.push(tick.kpis);
            if let Some((n, token)) = &self.cancel_after {
                if self.kpis.len() == *n {
                    token.cancel();
                }
            }
            Ok(())
        }

        fn finish(&mut self, summary: &RunSummary) -> DashResult<()> {
            self.finished = Some(*summary);
            Ok(())
        }
    }

    fn base() -> FilteredBase {
        let rows = (0..4)
            .map(|i| Record {
                age: 20.0 + 10.0 * i as f64,
                balance: 50.0,
                job: "admin.".into(),
                marital: "married".into(),
                extra: vec![],
            })
            .collect();
        FilteredBase { job: "admin.".into(), rows, married: 4 }
    }

    fn settings(n: usize) -> LoopSettings {
        LoopSettings { tick_count: n, ..LoopSettings::default() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ticks_no_render_no_sleep() {
        let b = base();
        let ticks = RefreshLoop::seeded(&b, settings(0), Some(1)).unwrap();
        let mut r = Recording::default();
        let start = Instant::now();
        let summary = run_live(ticks, &mut r, Duration::from_secs(1), &CancelToken::new(), 5).await;
        assert_eq!(summary.rendered, 0);
        assert!(r.kpis.is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(r.finished, Some(summary));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_ticks_only() {
        let b = base();
        let ticks = RefreshLoop::seeded(&b, settings(3), Some(1)).unwrap();
        let mut r = Recording::default();
        let start = Instant::now();
        let summary = run_live(ticks, &mut r, Duration::from_secs(1), &CancelToken::new(), 5).await;
        assert_eq!(summary.rendered, 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_renderer_halts_loop() {
        let b = base();
        let ticks = RefreshLoop::seeded(&b, settings(10), Some(1)).unwrap();
        let mut r = Recording { fail: true, ..Recording::default() };
        let summary = run_live(ticks, &mut r, Duration::from_millis(10), &CancelToken::new(), 3).await;
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.rendered, 0);
        assert!(summary.halted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_division_by_zero_ticks_are_skipped() {
        let b = FilteredBase { married: 0, ..base() };
        let s = LoopSettings {
            tick_count: 4,
            ranges: DrawRanges { multiplier: (1, 4), married_jitter: (0, 0) },
            ..LoopSettings::default()
        };
        let ticks = RefreshLoop::seeded(&b, s, Some(1)).unwrap();
        let mut r = Recording::default();
        let summary = run_live(ticks, &mut r, Duration::from_millis(10), &CancelToken::new(), 10).await;
        assert_eq!(summary.skipped, 4);
        assert!(r.kpis.is_empty());
        assert!(!summary.halted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_at_next_tick() {
        let b = base();
        let token = CancelToken::new();
        let ticks = RefreshLoop::seeded(&b, settings(50), Some(1)).unwrap();
        let mut r = Recording { cancel_after: Some((2, token.clone())), ..Recording::default() };
        let summary = run_live(ticks, &mut r, Duration::from_secs(1), &token, 5).await;
        assert_eq!(summary.rendered, 2);
        assert!(summary.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kill_file_cancels_before_first_tick() {
        let dir = tempfile::TempDir::new().unwrap();
        let kill = dir.path().join("STOP");
        std::fs::write(&kill, b"").unwrap();
        let b = base();
        let ticks = RefreshLoop::seeded(&b, settings(5), Some(1)).unwrap();
        let mut r = Recording::default();
        let token = CancelToken::new().with_kill_file(&kill);
        let summary = run_live(ticks, &mut r, Duration::from_secs(1), &token, 5).await;
        assert_eq!(summary.rendered, 0);
        assert!(summary.cancelled);
    }
}
