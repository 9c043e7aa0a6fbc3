use crate::engine::{LoopSettings, Tick};
use crate::error::DashError;
use crate::kpi::KpiBundle;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub msg: String,
}

impl From<InvariantViolation> for DashError {
    fn from(v: InvariantViolation) -> Self {
        DashError::Invariant(v.msg)
    }
}

fn violation(msg: String) -> InvariantViolation {
    InvariantViolation { msg }
}

pub fn assert_delta_offsets(kpis: &KpiBundle, offset: i64) -> Result<(), InvariantViolation> {
    if kpis.age_delta != kpis.age - offset {
        return Err(violation(format!("age_delta {} != age {} - {}", kpis.age_delta, kpis.age, offset)));
    }
    if kpis.married_delta != kpis.married_count - offset {
        return Err(violation(format!(
            "married_delta {} != married_count {} - {}",
            kpis.married_delta, kpis.married_count, offset
        )));
    }
    Ok(())
}

/// Every row is scaled by the same per-tick multiplier.
pub fn assert_uniform_multipliers(snapshot: &Snapshot<'_>) -> Result<(), InvariantViolation> {
    let am = snapshot.age_mult as f64;
    let bm = snapshot.balance_mult as f64;
    for (i, row) in snapshot.rows().enumerate() {
        if row.age_new != row.record.age * am {
            return Err(violation(format!("row {}: age_new {} != age {} * {}", i, row.age_new, row.record.age, am)));
        }
        if row.balance_new != row.record.balance * bm {
            return Err(violation(format!(
                "row {}: balance_new {} != balance {} * {}",
                i, row.balance_new, row.record.balance, bm
            )));
        }
    }
    Ok(())
}

pub fn assert_jitter_bounds(
    kpis: &KpiBundle,
    base_married: usize,
    jitter: (i64, i64),
) -> Result<(), InvariantViolation> {
    let lo = base_married as i64 + jitter.0;
    let hi = base_married as i64 + jitter.1;
    if kpis.married_count < lo || kpis.married_count > hi {
        return Err(violation(format!("married_count {} outside {}..={}", kpis.married_count, lo, hi)));
    }
    Ok(())
}

/// The rounded `age` KPI cannot carry NaN, so the derived columns are checked directly.
pub fn assert_finite(snapshot: &Snapshot<'_>, kpis: &KpiBundle) -> Result<(), InvariantViolation> {
    if let Some(i) = snapshot.age_new.iter().position(|v| !v.is_finite()) {
        return Err(violation(format!("row {}: age_new is not finite", i)));
    }
    if let Some(i) = snapshot.balance_new.iter().position(|v| !v.is_finite()) {
        return Err(violation(format!("row {}: balance_new is not finite", i)));
    }
    if !kpis.balance.is_finite() {
        return Err(violation("balance is not finite".to_string()));
    }
    Ok(())
}

pub fn assert_chart_totals(tick: &Tick<'_>) -> Result<(), InvariantViolation> {
    let rows = tick.snapshot.len();
    let hist = tick.charts.histogram.total();
    let heat = tick.charts.heatmap.total();
    if hist != rows || heat != rows {
        return Err(violation(format!("chart totals hist={} heatmap={} rows={}", hist, heat, rows)));
    }
    Ok(())
}

/// All per-tick checks. Cheap enough to run on every live tick.
pub fn check_tick(tick: &Tick<'_>, settings: &LoopSettings) -> Result<(), InvariantViolation> {
    assert_delta_offsets(&tick.kpis, settings.delta_offset)?;
    assert_uniform_multipliers(&tick.snapshot)?;
    assert_jitter_bounds(&tick.kpis, tick.snapshot.married(), settings.ranges.married_jitter)?;
    assert_finite(&tick.snapshot, &tick.kpis)?;
    assert_chart_totals(tick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FilteredBase, Record};
    use crate::snapshot::TickDraws;

    fn bundle() -> KpiBundle {
        KpiBundle { age: 80, age_delta: 70, married_count: 8, married_delta: -2, balance: 10.0, balance_delta: 100 }
    }

    #[test]
    fn test_delta_offsets_hold() {
        assert!(assert_delta_offsets(&bundle(), 10).is_ok());
        assert!(assert_delta_offsets(&bundle(), 5).is_err());
    }

    #[test]
    fn test_jitter_bounds() {
        assert!(assert_jitter_bounds(&bundle(), 3, (1, 29)).is_ok());
        assert!(assert_jitter_bounds(&bundle(), 3, (6, 29)).is_err());
    }

    fn base(age: f64) -> FilteredBase {
        let rows = vec![
            Record { age, balance: 10.0, job: "x".into(), marital: "married".into(), extra: vec![] },
            Record { age: 40.0, balance: 20.0, job: "x".into(), marital: "single".into(), extra: vec![] },
        ];
        FilteredBase { job: "x".into(), rows, married: 1 }
    }

    fn snapshot(b: &FilteredBase) -> Snapshot<'_> {
        Snapshot::build(b, &TickDraws { age_mult: 2, balance_mult: 1, married_jitter: 1 }).unwrap()
    }

    #[test]
    fn test_nan_balance_flagged() {
        let b = base(30.0);
        let k = KpiBundle { balance: f64::NAN, ..bundle() };
        let err: DashError = assert_finite(&snapshot(&b), &k).unwrap_err().into();
        assert_eq!(err.kind(), "invariant");
    }

    #[test]
    fn test_nan_age_flagged_even_when_kpi_rounds() {
        let b = base(f64::NAN);
        let err = assert_finite(&snapshot(&b), &bundle()).unwrap_err();
        assert!(err.msg.contains("age_new"));
        assert!(assert_finite(&snapshot(&base(30.0)), &bundle()).is_ok());
    }
}
