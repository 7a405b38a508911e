use serde::Serialize;

/// Balance below this fraction of the original principal counts as repaid.
pub const SETTLE_TOLERANCE: f64 = 1e-6;
/// Horizon used when suggesting a payment that retires a balance.
pub const PAYOFF_HORIZON_MONTHS: u32 = 360;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    pub period: u32,
    pub payment: f64,
    pub interest_portion: f64,
    pub principal_portion: f64,
    pub remaining_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationSchedule {
    pub rows: Vec<AmortizationRow>,
    pub total_paid: f64,
    pub total_interest: f64,
}

impl AmortizationSchedule {
    pub fn months(&self) -> u32 {
        self.rows.len() as u32
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonConvergenceReason {
    InterestNotCovered,
    TermExhausted,
}

/// A payment plan that never retires the balance under the stated terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonConvergent {
    pub reason: NonConvergenceReason,
    pub periods_elapsed: u32,
    pub balance: f64,
    pub monthly_interest: f64,
    pub payment: f64,
    pub minimum_payment_to_converge: f64,
}

pub fn future_value_of_series(monthly_amount: f64, annual_rate: f64, months: u32) -> f64 {
    if annual_rate == 0.0 {
        return monthly_amount * months as f64;
    }
    let r = annual_rate / 12.0;
    monthly_amount * ((1.0 + r).powi(months as i32) - 1.0) / r
}

pub fn compound_lump_sum(amount: f64, annual_rate: f64, months: u32) -> f64 {
    amount * (1.0 + annual_rate / 12.0).powi(months as i32)
}

/// Contribution lands at the start of each month, then the month's growth applies.
pub fn compound_balance(initial: f64, monthly_contribution: f64, monthly_rate: f64, months: u32) -> f64 {
    let mut balance = initial;
    for _ in 0..months {
        balance = (balance + monthly_contribution) * (1.0 + monthly_rate);
    }
    balance
}

pub fn amortized_payment(principal: f64, annual_rate: f64, term_months: u32) -> f64 {
    if term_months == 0 {
        return principal;
    }
    if annual_rate == 0.0 {
        return principal / term_months as f64;
    }
    let r = annual_rate / 12.0;
    principal * r / (1.0 - (1.0 + r).powi(-(term_months as i32)))
}

pub fn round_up_to_cent(amount: f64) -> f64 {
    (amount * 100.0).ceil() / 100.0
}

pub fn minimum_converging_payment(balance: f64, annual_rate: f64) -> f64 {
    round_up_to_cent(amortized_payment(balance, annual_rate, PAYOFF_HORIZON_MONTHS))
}

pub fn amortization_schedule(
    principal: f64,
    annual_rate: f64,
    payment: f64,
    max_periods: u32,
) -> Result<AmortizationSchedule, NonConvergent> {
    let monthly_rate = annual_rate / 12.0;
    let tolerance = principal * SETTLE_TOLERANCE;
    let mut balance = principal;
    let mut rows = Vec::new();
    let mut total_paid = 0.0;
    let mut total_interest = 0.0;
    let mut uncovered_streak = 0;

    if principal <= 0.0 {
        return Ok(AmortizationSchedule {
            rows,
            total_paid,
            total_interest,
        });
    }

    for period in 1..=max_periods {
        let interest = balance * monthly_rate;
        if payment <= interest {
            uncovered_streak += 1;
            if uncovered_streak > 1 {
                return Err(NonConvergent {
                    reason: NonConvergenceReason::InterestNotCovered,
                    periods_elapsed: period - 1,
                    balance,
                    monthly_interest: interest,
                    payment,
                    minimum_payment_to_converge: minimum_converging_payment(principal, annual_rate),
                });
            }
        } else {
            uncovered_streak = 0;
        }

        let due = balance + interest;
        let paid = payment.min(due);
        balance = due - paid;
        if balance <= tolerance {
            balance = 0.0;
        }
        total_paid += paid;
        total_interest += interest;
        rows.push(AmortizationRow {
            period,
            payment: paid,
            interest_portion: interest,
            principal_portion: paid - interest,
            remaining_balance: balance,
        });

        if balance == 0.0 {
            return Ok(AmortizationSchedule {
                rows,
                total_paid,
                total_interest,
            });
        }
    }

    Err(NonConvergent {
        reason: NonConvergenceReason::TermExhausted,
        periods_elapsed: max_periods,
        balance,
        monthly_interest: balance * monthly_rate,
        payment,
        minimum_payment_to_converge: round_up_to_cent(amortized_payment(
            principal,
            annual_rate,
            max_periods,
        )),
    })
}

/// Linear interpolation between closest ranks: rank = p / 100 * (n - 1).
pub fn percentile(values: &mut [f64], p: f64) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    percentile_of_sorted(values, p)
}

pub fn percentiles(values: &mut [f64], targets: &[f64]) -> Vec<(f64, f64)> {
    values.sort_by(|a, b| a.total_cmp(b));
    targets
        .iter()
        .map(|&p| (p, percentile_of_sorted(values, p)))
        .collect()
}

fn percentile_of_sorted(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}

/// Population mean and standard deviation.
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn future_value_at_zero_rate_is_plain_sum() {
        assert_eq!(future_value_of_series(137.25, 0.0, 48), 137.25 * 48.0);
    }

    #[test]
    fn future_value_matches_annuity_formula() {
        assert_approx_tol(future_value_of_series(100.0, 0.12, 12), 1_268.250_301, 1e-5);
    }

    #[test]
    fn amortized_payment_matches_known_loan() {
        assert_approx_tol(amortized_payment(20_000.0, 0.06, 60), 386.66, 0.01);
        assert_approx(amortized_payment(12_000.0, 0.0, 48), 250.0);
    }

    #[test]
    fn schedule_with_exact_payment_retires_loan_on_final_period() {
        let payment = amortized_payment(25_000.0, 0.069, 72);
        let schedule = amortization_schedule(25_000.0, 0.069, payment, 72).expect("converges");
        assert_eq!(schedule.months(), 72);
        let last = schedule.rows.last().expect("rows");
        assert_eq!(last.remaining_balance, 0.0);
        assert_approx_tol(schedule.total_paid - schedule.total_interest, 25_000.0, 1e-4);
    }

    #[test]
    fn schedule_balance_strictly_decreases() {
        let schedule = amortization_schedule(3_000.0, 0.2299, 120.0, 600).expect("converges");
        for pair in schedule.rows.windows(2) {
            assert!(pair[1].remaining_balance < pair[0].remaining_balance);
        }
    }

    #[test]
    fn interest_only_payment_is_non_convergent() {
        let balance = 5_000.0;
        let interest_only = balance * (0.24 / 12.0);
        let err = amortization_schedule(balance, 0.24, interest_only, 1_200).expect_err("stalls");
        assert_eq!(err.reason, NonConvergenceReason::InterestNotCovered);
        assert_eq!(err.periods_elapsed, 1);
        assert!(err.minimum_payment_to_converge > interest_only);

        let fixed = amortization_schedule(balance, 0.24, err.minimum_payment_to_converge, 1_200)
            .expect("suggested payment converges");
        assert!(fixed.months() <= PAYOFF_HORIZON_MONTHS);
    }

    #[test]
    fn short_term_reports_term_exhausted_with_payment_that_fits() {
        let err = amortization_schedule(10_000.0, 0.05, 100.0, 24).expect_err("too short");
        assert_eq!(err.reason, NonConvergenceReason::TermExhausted);
        let schedule = amortization_schedule(10_000.0, 0.05, err.minimum_payment_to_converge, 24)
            .expect("fits term");
        assert!(schedule.months() <= 24);
    }

    #[test]
    fn zero_principal_yields_empty_schedule() {
        let schedule = amortization_schedule(0.0, 0.1, 50.0, 12).expect("trivial");
        assert!(schedule.rows.is_empty());
        assert_eq!(schedule.total_paid, 0.0);
    }

    #[test]
    fn percentile_interpolates_between_points() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_approx(percentile(&mut values, 25.0), 1.75);
        assert_approx(percentile(&mut values, 50.0), 2.5);
        assert_approx(percentile(&mut values, 100.0), 4.0);
    }

    #[test]
    fn percentiles_of_single_value_collapse() {
        let mut values = vec![100.0];
        let got = percentiles(&mut values, &[10.0, 25.0, 50.0, 75.0, 90.0]);
        assert!(got.iter().all(|&(_, v)| v == 100.0));
    }

    #[test]
    fn percentiles_of_empty_are_zero() {
        let got = percentiles(&mut [], &[50.0]);
        assert_eq!(got, vec![(50.0, 0.0)]);
    }

    #[test]
    fn mean_and_std_use_population_variance() {
        let (mean, std) = mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_approx(mean, 5.0);
        assert_approx(std, 2.0);
    }

    #[test]
    fn compound_balance_with_zero_rate_sums_contributions() {
        assert_approx(compound_balance(1_000.0, 50.0, 0.0, 24), 2_200.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_exact_payment_always_converges_on_term(
            principal in 100u32..500_000,
            rate_bp in 0u32..3_000,
            term in 1u32..480
        ) {
            let principal = principal as f64;
            let rate = rate_bp as f64 / 10_000.0;
            let payment = amortized_payment(principal, rate, term);
            let schedule = amortization_schedule(principal, rate, payment, term);
            prop_assert!(schedule.is_ok());
            let schedule = schedule.unwrap();
            prop_assert_eq!(schedule.months(), term);
            prop_assert_eq!(schedule.rows.last().map(|r| r.remaining_balance), Some(0.0));
        }

        #[test]
        fn prop_payment_at_or_below_interest_never_converges(
            balance in 100u32..100_000,
            apr_bp in 100u32..4_000,
            shortfall_pct in 0u32..100
        ) {
            let balance = balance as f64;
            let apr = apr_bp as f64 / 10_000.0;
            let interest = balance * (apr / 12.0);
            let payment = interest * (1.0 - shortfall_pct as f64 / 100.0);
            let err = amortization_schedule(balance, apr, payment, 1_200);
            prop_assert!(err.is_err());
            let suggested = err.unwrap_err().minimum_payment_to_converge;
            prop_assert!(amortization_schedule(balance, apr, suggested, 1_200).is_ok());
        }

        #[test]
        fn prop_percentiles_are_bounded_and_monotone(
            raw in proptest::collection::vec(-1_000_000i64..1_000_000, 1..64)
        ) {
            let mut values: Vec<f64> = raw.iter().map(|&v| v as f64).collect();
            let got = percentiles(&mut values, &[0.0, 10.0, 25.0, 50.0, 75.0, 90.0, 100.0]);
            let min = values[0];
            let max = values[values.len() - 1];
            for pair in got.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].1);
            }
            prop_assert_eq!(got[0].1, min);
            prop_assert_eq!(got[got.len() - 1].1, max);
        }
    }
}
