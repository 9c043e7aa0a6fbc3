//! Writes the chart demo pages: a static figure and its interactive, tooltip-enabled twin.
//!
//! Usage: charts_demo [out_dir]   (default out/charts)

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use livedash::figure::{attach_tooltips, demo_figure, to_interactive_html, to_svg, Figure, Line, TAB_BLUE};
use livedash::logging::{json_log, obj, v_num, v_str};

fn basic_figure() -> Figure {
    let mut fig = Figure::new(480.0, 360.0);
    fig.subplot().plot(Line::new(vec![0.0, 1.0, 2.0, 3.0, 4.0], vec![1.0, 2.0, 3.0, 4.0, 5.0], TAB_BLUE));
    fig
}

fn write(path: &PathBuf, body: &str) -> Result<()> {
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    json_log("charts_demo", obj(&[("wrote", v_str(&path.display().to_string())), ("bytes", v_num(body.len() as f64))]));
    Ok(())
}

fn main() -> Result<()> {
    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "out/charts".to_string()));
    fs::create_dir_all(&out_dir)?;

    let basic = basic_figure();
    write(&out_dir.join("basic.svg"), &to_svg(&basic))?;
    let basic_tips = attach_tooltips(&basic);
    write(&out_dir.join("basic.html"), &to_interactive_html(&basic, &basic_tips, "Chart Interactive")?)?;

    let fig = demo_figure();
    write(&out_dir.join("subplots.svg"), &to_svg(&fig))?;
    let tips = attach_tooltips(&fig);
    json_log(
        "charts_demo",
        obj(&[
            ("tooltips", v_num(tips.count() as f64)),
            ("lines_without_tooltips", v_num(tips.skipped.len() as f64)),
        ]),
    );
    write(&out_dir.join("subplots.html"), &to_interactive_html(&fig, &tips, "Chart Interactive")?)?;

    println!("wrote charts to {}", out_dir.display());
    Ok(())
}
