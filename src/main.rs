use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

use livedash::data::source::DatasetStore;
use livedash::data::{distinct_jobs, filter_by_job};
use livedash::engine::live::{run_live, CancelToken};
use livedash::engine::RefreshLoop;
use livedash::logging::{json_log, obj, params_hash, run_id, v_num, v_str};
use livedash::render::html::page_location;
use livedash::state::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    cfg.validate()?;
    if cfg.kill_switch_engaged() {
        json_log("startup", obj(&[("status", v_str("kill_file_present")), ("path", v_str(&cfg.kill_file))]));
        return Ok(());
    }

    json_log(
        "startup",
        obj(&[
            ("run_id", v_str(&run_id())),
            ("dataset", v_str(&cfg.dataset)),
            ("tick_count", json!(cfg.tick_count)),
            ("tick_ms", json!(cfg.tick_ms)),
            ("seed", json!(cfg.seed)),
            ("params_hash", v_str(&params_hash(&format!("{:?}", cfg.loop_settings())))),
        ]),
    );

    let store = DatasetStore::from_location(&cfg.dataset)?;
    let dataset = store.get().await.with_context(|| format!("loading {}", cfg.dataset))?;

    let jobs = distinct_jobs(&dataset.records);
    let job = match &cfg.job_filter {
        Some(job) => job.clone(),
        None => jobs.first().cloned().context("dataset has no rows to pick a job from")?,
    };
    json_log(
        "filter",
        obj(&[
            ("job", v_str(&job)),
            ("choices", json!(jobs)),
            ("rows_total", v_num(dataset.len() as f64)),
        ]),
    );
    let base = filter_by_job(&dataset, &job)?;

    let ticks = RefreshLoop::seeded(&base, cfg.loop_settings(), cfg.seed)?;
    let mut renderer = cfg.render.build(&cfg, &dataset.columns)?;
    if cfg.render.writes_html() {
        let page = page_location(Path::new(&cfg.out_dir));
        json_log("render", obj(&[("page", v_str(&page.display().to_string()))]));
    }

    let cancel = CancelToken::new().with_kill_file(&cfg.kill_file);
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let summary = run_live(ticks, renderer.as_mut(), cfg.tick_interval(), &cancel, cfg.max_tick_failures).await;
    json_log("shutdown", obj(&[("job", v_str(&job)), ("summary", json!(summary))]));

    if summary.halted {
        anyhow::bail!("halted after {} consecutive failed ticks", cfg.max_tick_failures);
    }
    Ok(())
}
