use serde::{Deserialize, Serialize};

use crate::error::{DashError, DashResult};
use crate::snapshot::Snapshot;

/// The three summary metrics of one tick, with their deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiBundle {
    pub age: i64,
    pub age_delta: i64,
    pub married_count: i64,
    pub married_delta: i64,
    pub balance: f64,
    pub balance_delta: i64,
}

/// One summary card as handed to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: String,
    pub delta: i64,
}

impl MetricCard {
    pub fn delta_str(&self) -> String {
        format!("{:+}", self.delta)
    }
}

impl KpiBundle {
    /// Derive the bundle from a snapshot. `married_jitter` is the tick's draw.
    pub fn compute(snapshot: &Snapshot<'_>, married_jitter: i64, delta_offset: i64) -> DashResult<Self> {
        if snapshot.is_empty() {
            return Err(DashError::EmptyFilterResult(snapshot.base.job.clone()));
        }
        let avg_age = mean(&snapshot.age_new);
        let avg_balance = mean(&snapshot.balance_new);
        if !avg_age.is_finite() || !avg_balance.is_finite() {
            return Err(DashError::Invariant(format!(
                "non-finite means: age {} balance {}",
                avg_age, avg_balance
            )));
        }
        let married_count = (snapshot.married() as i64)
            .checked_add(married_jitter)
            .ok_or_else(|| overflow("married_count"))?;
        if married_count == 0 {
            return Err(DashError::DivisionByZero("balance_delta"));
        }

        let age = round_half_even(avg_age);
        Ok(Self {
            age,
            age_delta: age.checked_sub(delta_offset).ok_or_else(|| overflow("age_delta"))?,
            married_count,
            married_delta: married_count
                .checked_sub(delta_offset)
                .ok_or_else(|| overflow("married_delta"))?,
            balance: avg_balance,
            balance_delta: round_half_even(avg_balance / married_count as f64)
                .checked_mul(100)
                .ok_or_else(|| overflow("balance_delta"))?,
        })
    }

    pub fn cards(&self) -> [MetricCard; 3] {
        [
            MetricCard { label: "Age ⌛", value: self.age.to_string(), delta: self.age_delta },
            MetricCard {
                label: "Married Count 💍",
                value: self.married_count.to_string(),
                delta: self.married_delta,
            },
            MetricCard {
                label: "A/C Balance $",
                value: format!("$ {:.2}", self.balance),
                delta: self.balance_delta,
            },
        ]
    }
}

fn overflow(what: &str) -> DashError {
    DashError::InvalidConfig(format!("{} overflows i64", what))
}

pub fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Ties go to the even neighbour, so 2.5 -> 2 and 3.5 -> 4.
pub fn round_half_even(x: f64) -> i64 {
    x.round_ties_even() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FilteredBase, Record};
    use crate::snapshot::TickDraws;

    fn base(ages: &[f64], married: usize) -> FilteredBase {
        let rows = ages
            .iter()
            .enumerate()
            .map(|(i, &age)| Record {
                age,
                balance: 1000.0,
                job: "management".into(),
                marital: if i < married { "married" } else { "single" }.into(),
                extra: vec![],
            })
            .collect();
        FilteredBase { job: "management".into(), rows, married }
    }

    #[test]
    fn test_worked_example() {
        let ages = [25.0, 30.0, 35.0, 40.0, 40.0, 40.0, 45.0, 50.0, 55.0, 40.0];
        assert_eq!(ages.iter().sum::<f64>(), 400.0);
        let b = base(&ages, 3);
        let draws = TickDraws { age_mult: 2, balance_mult: 3, married_jitter: 5 };
        let snap = Snapshot::build(&b, &draws).unwrap();
        let k = KpiBundle::compute(&snap, draws.married_jitter, 10).unwrap();
        assert_eq!(k.age, 80);
        assert_eq!(k.age_delta, 70);
        assert_eq!(k.married_count, 8);
        assert_eq!(k.married_delta, -2);
        assert_eq!(k.balance, 3000.0);
        assert_eq!(k.balance_delta, 375 * 100);
    }

    #[test]
    fn test_zero_married_count_is_division_by_zero() {
        let b = base(&[30.0, 40.0], 0);
        let draws = TickDraws { age_mult: 1, balance_mult: 1, married_jitter: 0 };
        let snap = Snapshot::build(&b, &draws).unwrap();
        assert!(matches!(
            KpiBundle::compute(&snap, 0, 10),
            Err(DashError::DivisionByZero("balance_delta"))
        ));
    }

    #[test]
    fn test_non_finite_mean_is_rejected() {
        let b = base(&[f64::NAN, 40.0], 1);
        let draws = TickDraws { age_mult: 2, balance_mult: 1, married_jitter: 1 };
        let snap = Snapshot::build(&b, &draws).unwrap();
        assert!(matches!(KpiBundle::compute(&snap, 1, 10), Err(DashError::Invariant(_))));
    }

    #[test]
    fn test_extreme_offsets_do_not_wrap() {
        let b = base(&[30.0, 40.0], 1);
        let draws = TickDraws { age_mult: 1, balance_mult: 1, married_jitter: 1 };
        let snap = Snapshot::build(&b, &draws).unwrap();
        assert!(matches!(KpiBundle::compute(&snap, i64::MAX, 10), Err(DashError::InvalidConfig(_))));
        assert!(matches!(KpiBundle::compute(&snap, 1, i64::MIN), Err(DashError::InvalidConfig(_))));
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(2.5), 2);
        assert_eq!(round_half_even(3.5), 4);
        assert_eq!(round_half_even(-2.5), -2);
        assert_eq!(round_half_even(41.6), 42);
    }

    #[test]
    fn test_cards_format_balance_two_decimals() {
        let k = KpiBundle {
            age: 40,
            age_delta: 30,
            married_count: 12,
            married_delta: 2,
            balance: 1523.456,
            balance_delta: 12700,
        };
        let cards = k.cards();
        assert_eq!(cards[0].value, "40");
        assert_eq!(cards[2].value, "$ 1523.46");
        assert_eq!(cards[1].delta_str(), "+2");
    }
}
