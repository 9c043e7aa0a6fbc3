//! Aggregate chart datasets derived from a snapshot.
//!
//! Both charts use equal-width buckets over the observed `age_new` range. The top edge
//! of the last bucket is inclusive so the maximum value is always counted. A column with
//! a single distinct value collapses to one bucket.

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<Bin>,
}

impl Histogram {
    pub fn build(values: &[f64], bins: usize) -> Self {
        let edges = Edges::over(values, bins);
        let mut out: Vec<Bin> = (0..edges.count())
            .map(|i| Bin { lo: edges.lo(i), hi: edges.hi(i), count: 0 })
            .collect();
        for &v in values {
            if let Some(i) = edges.index(v) {
                out[i].count += 1;
            }
        }
        Self { bins: out }
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

/// Count of points per (category, value-bucket) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityHeatmap {
    /// x axis, in first-appearance order.
    pub categories: Vec<String>,
    /// y axis buckets; `count` on these is the row total.
    pub buckets: Vec<Bin>,
    /// `cells[y][x]`
    pub cells: Vec<Vec<usize>>,
}

impl DensityHeatmap {
    pub fn build<'a>(categories: impl Iterator<Item = &'a str>, values: &[f64], bins: usize) -> Self {
        let cats: Vec<&str> = categories.collect();
        let mut names: Vec<String> = Vec::new();
        let mut col_of = Vec::with_capacity(cats.len());
        for c in &cats {
            let idx = match names.iter().position(|n| n == c) {
                Some(i) => i,
                None => {
                    names.push(c.to_string());
                    names.len() - 1
                }
            };
            col_of.push(idx);
        }

        let edges = Edges::over(values, bins);
        let mut buckets: Vec<Bin> = (0..edges.count())
            .map(|i| Bin { lo: edges.lo(i), hi: edges.hi(i), count: 0 })
            .collect();
        let mut cells = vec![vec![0usize; names.len()]; edges.count()];
        for (&v, &x) in values.iter().zip(col_of.iter()) {
            if let Some(y) = edges.index(v) {
                cells[y][x] += 1;
                buckets[y].count += 1;
            }
        }
        Self { categories: names, buckets, cells }
    }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }

    pub fn max_cell(&self) -> usize {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDatasets {
    pub heatmap: DensityHeatmap,
    pub histogram: Histogram,
}

impl ChartDatasets {
    pub fn from_snapshot(snapshot: &Snapshot<'_>, heatmap_bins: usize, hist_bins: usize) -> Self {
        Self {
            heatmap: DensityHeatmap::build(snapshot.marital(), &snapshot.age_new, heatmap_bins),
            histogram: Histogram::build(&snapshot.age_new, hist_bins),
        }
    }
}

struct Edges {
    lo: f64,
    width: f64,
    n: usize,
}

impl Edges {
    fn over(values: &[f64], bins: usize) -> Self {
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if bins == 0 || lo > hi {
            return Self { lo: 0.0, width: 0.0, n: 0 };
        }
        if lo == hi {
            return Self { lo, width: 0.0, n: 1 };
        }
        Self { lo, width: (hi - lo) / bins as f64, n: bins }
    }

    fn count(&self) -> usize {
        self.n
    }

    fn lo(&self, i: usize) -> f64 {
        self.lo + self.width * i as f64
    }

    fn hi(&self, i: usize) -> f64 {
        self.lo + self.width * (i + 1) as f64
    }

    fn index(&self, v: f64) -> Option<usize> {
        if self.n == 0 || !v.is_finite() {
            return None;
        }
        if self.width == 0.0 {
            return Some(0);
        }
        let i = ((v - self.lo) / self.width).floor();
        Some((i.max(0.0) as usize).min(self.n - 1))
    }
}
