//! Smoke tests: end-to-end runs of the refresh loop over a small bank-like CSV.

use livedash::data::{filter_by_job, parse_dataset, FilteredBase, Record};
use livedash::engine::{build_tick, LoopSettings, RefreshLoop};
use livedash::error::DashError;
use livedash::snapshot::{DrawRanges, TickDraws};
use livedash::verify::invariants::check_tick;

const BANK: &str = "age,job,marital,education,default,balance\n\
    30,admin.,married,secondary,no,1787\n\
    33,services,married,secondary,no,4789\n\
    35,management,single,tertiary,no,1350\n\
    30,management,married,tertiary,no,1476\n\
    59,blue-collar,married,secondary,no,0\n\
    35,management,single,tertiary,no,747\n\
    36,self-employed,married,tertiary,no,307\n\
    39,technician,married,secondary,no,147\n\
    41,entrepreneur,married,tertiary,no,221\n\
    43,services,married,primary,no,-88\n";

fn management() -> FilteredBase {
    let ds = parse_dataset(BANK).unwrap();
    filter_by_job(&ds, "management").unwrap()
}

fn settings(n: usize) -> LoopSettings {
    LoopSettings { tick_count: n, ..LoopSettings::default() }
}

#[test]
fn every_tick_holds_the_per_tick_checks() {
    let base = management();
    let s = settings(200);
    let ticks = RefreshLoop::seeded(&base, s, Some(7)).unwrap();
    let mut n = 0;
    for tick in ticks {
        let tick = tick.unwrap();
        check_tick(&tick, &s).unwrap();
        assert_eq!(tick.kpis.age_delta, tick.kpis.age - 10);
        assert_eq!(tick.kpis.married_delta, tick.kpis.married_count - 10);
        assert!((1..=4).contains(&tick.draws.age_mult));
        assert!((1..=4).contains(&tick.draws.balance_mult));
        let married = base.married as i64;
        assert!(tick.kpis.married_count >= married + 1 && tick.kpis.married_count <= married + 29);
        n += 1;
    }
    assert_eq!(n, 200);
}

#[test]
fn worked_example_kpis() {
    // Ages sum to 400 over 10 rows (mean 40); two are married.
    let rows: Vec<Record> = (0..10)
        .map(|i| Record {
            age: 40.0,
            balance: 1500.0,
            job: "admin.".into(),
            marital: if i < 2 { "married".into() } else { "single".into() },
            extra: vec![],
        })
        .collect();
    let base = FilteredBase { job: "admin.".into(), rows, married: 2 };
    let draws = TickDraws { age_mult: 2, balance_mult: 1, married_jitter: 6 };
    let tick = build_tick(&base, 0, draws, &settings(1)).unwrap();
    assert_eq!(tick.kpis.age, 80);
    assert_eq!(tick.kpis.age_delta, 70);
    assert_eq!(tick.kpis.married_count, 8);
    assert_eq!(tick.kpis.married_delta, -2);
    assert_eq!(tick.kpis.balance, 1500.0);
    // round(1500 / 8) * 100
    assert_eq!(tick.kpis.balance_delta, 18800);
}

#[test]
fn unknown_job_is_an_empty_filter_result() {
    let ds = parse_dataset(BANK).unwrap();
    assert!(matches!(filter_by_job(&ds, "astronaut"), Err(DashError::EmptyFilterResult(j)) if j == "astronaut"));
}

#[test]
fn zero_ticks_yields_nothing() {
    let base = management();
    let mut ticks = RefreshLoop::seeded(&base, settings(0), Some(1)).unwrap();
    assert_eq!(ticks.len(), 0);
    assert!(ticks.next().is_none());
}

#[test]
fn same_seed_same_run() {
    let base = management();
    let a: Vec<_> = RefreshLoop::seeded(&base, settings(20), Some(42)).unwrap().map(|t| t.unwrap().kpis).collect();
    let b: Vec<_> = RefreshLoop::seeded(&base, settings(20), Some(42)).unwrap().map(|t| t.unwrap().kpis).collect();
    assert_eq!(a, b);
}

#[test]
fn different_seeds_diverge() {
    let base = management();
    let a: Vec<_> = RefreshLoop::seeded(&base, settings(20), Some(1)).unwrap().map(|t| t.unwrap().draws).collect();
    let b: Vec<_> = RefreshLoop::seeded(&base, settings(20), Some(2)).unwrap().map(|t| t.unwrap().draws).collect();
    assert_ne!(a, b);
}

#[test]
fn snapshot_never_compounds() {
    let base = management();
    let s = LoopSettings { ranges: DrawRanges { multiplier: (3, 3), married_jitter: (1, 1) }, ..settings(5) };
    for tick in RefreshLoop::seeded(&base, s, Some(3)).unwrap() {
        let tick = tick.unwrap();
        assert_eq!(tick.snapshot.age_new, vec![105.0, 90.0, 105.0]);
    }
}

#[test]
fn non_finite_cells_fail_at_load_with_line_number() {
    let text = "age,job,marital,balance\nNaN,admin.,married,100\n40,admin.,single,50\n";
    assert!(matches!(parse_dataset(text), Err(DashError::Parse { line: 2, .. })));
    let text = "age,job,marital,balance\n40,admin.,married,infinity\n";
    assert!(matches!(parse_dataset(text), Err(DashError::Parse { line: 2, .. })));
}
