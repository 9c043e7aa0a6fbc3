use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::{FilteredBase, Record};
use crate::error::{DashError, DashResult};

/// Inclusive integer ranges the per-tick random draws come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRanges {
    pub multiplier: (i64, i64),
    pub married_jitter: (i64, i64),
}

impl Default for DrawRanges {
    fn default() -> Self {
        Self { multiplier: (1, 4), married_jitter: (1, 29) }
    }
}

/// Largest magnitude accepted for any draw bound or delta offset; keeps KPI arithmetic in range.
pub const MAX_ABS_SETTING: i64 = 1_000_000_000;

impl DrawRanges {
    pub fn validate(&self) -> DashResult<()> {
        for (name, (lo, hi)) in [("multiplier", self.multiplier), ("married_jitter", self.married_jitter)] {
            if lo > hi {
                return Err(DashError::InvalidConfig(format!("{} range inverted: {}..={}", name, lo, hi)));
            }
            if lo.unsigned_abs() > MAX_ABS_SETTING.unsigned_abs() || hi.unsigned_abs() > MAX_ABS_SETTING.unsigned_abs() {
                return Err(DashError::InvalidConfig(format!(
                    "{} range {}..={} exceeds +/-{}",
                    name, lo, hi, MAX_ABS_SETTING
                )));
            }
        }
        Ok(())
    }
}

/// The random inputs of one tick. Everything else a tick produces follows from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickDraws {
    pub age_mult: i64,
    pub balance_mult: i64,
    pub married_jitter: i64,
}

impl TickDraws {
    /// Draw order is fixed (age, balance, jitter) so seeded runs replay exactly.
    pub fn sample<R: Rng>(rng: &mut R, ranges: &DrawRanges) -> Self {
        let (m_lo, m_hi) = ranges.multiplier;
        let (j_lo, j_hi) = ranges.married_jitter;
        Self {
            age_mult: rng.gen_range(m_lo..=m_hi),
            balance_mult: rng.gen_range(m_lo..=m_hi),
            married_jitter: rng.gen_range(j_lo..=j_hi),
        }
    }
}

/// The filtered base with this tick's `age_new` / `balance_new` columns.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    pub base: &'a FilteredBase,
    pub age_mult: i64,
    pub balance_mult: i64,
    pub age_new: Vec<f64>,
    pub balance_new: Vec<f64>,
}

impl<'a> Snapshot<'a> {
    /// Rebuild the derived columns from the stable base; never from a previous snapshot.
    pub fn build(base: &'a FilteredBase, draws: &TickDraws) -> DashResult<Self> {
        if base.is_empty() {
            return Err(DashError::EmptyFilterResult(base.job.clone()));
        }
        let am = draws.age_mult as f64;
        let bm = draws.balance_mult as f64;
        Ok(Self {
            base,
            age_mult: draws.age_mult,
            balance_mult: draws.balance_mult,
            age_new: base.rows.iter().map(|r| r.age * am).collect(),
            balance_new: base.rows.iter().map(|r| r.balance * bm).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.base.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.rows.is_empty()
    }

    pub fn married(&self) -> usize {
        self.base.married
    }

    pub fn marital(&self) -> impl Iterator<Item = &str> + '_ {
        self.base.rows.iter().map(|r| r.marital.as_str())
    }

    /// Rows paired with their derived values, for the detailed table view.
    pub fn rows(&self) -> impl Iterator<Item = SnapshotRow<'_>> + '_ {
        self.base
            .rows
            .iter()
            .zip(self.age_new.iter().zip(self.balance_new.iter()))
            .map(|(record, (&age_new, &balance_new))| SnapshotRow { record, age_new, balance_new })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SnapshotRow<'a> {
    pub record: &'a Record,
    pub age_new: f64,
    pub balance_new: f64,
}
