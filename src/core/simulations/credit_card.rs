use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{ValidationError, annual_rate, in_range, positive};
use crate::core::math::{
    AmortizationSchedule, NonConvergenceReason, NonConvergent, amortization_schedule,
};

pub const MAX_PAYOFF_MONTHS: u32 = 1_200;
pub const DEFAULT_MINIMUM_PAYMENT_PERCENT: f64 = 0.02;
pub const MINIMUM_PAYMENT_FLOOR: f64 = 25.0;
const AGGRESSIVE_PAYMENT_CAP: f64 = 500.0;
const AGGRESSIVE_BALANCE_SHARE: f64 = 0.15;

fn default_minimum_payment_percent() -> f64 {
    DEFAULT_MINIMUM_PAYMENT_PERCENT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardParams {
    pub balance: f64,
    pub apr: f64,
    /// Defaults to the card's minimum payment.
    #[serde(default)]
    pub monthly_payment: Option<f64>,
    #[serde(default = "default_minimum_payment_percent")]
    pub minimum_payment_percent: f64,
}

impl CreditCardParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        positive("balance", self.balance)?;
        annual_rate("apr", self.apr)?;
        if let Some(payment) = self.monthly_payment {
            positive("monthlyPayment", payment)?;
        }
        in_range("minimumPaymentPercent", self.minimum_payment_percent, 0.001, 1.0)?;
        Ok(())
    }

    pub fn minimum_payment(&self) -> f64 {
        MINIMUM_PAYMENT_FLOOR.max(self.balance * self.minimum_payment_percent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestClock {
    pub per_day: f64,
    pub per_hour: f64,
    pub per_month: f64,
}

impl InterestClock {
    pub fn new(balance: f64, apr: f64) -> Self {
        let per_day = balance * apr / 365.0;
        Self {
            per_day,
            per_hour: per_day / 24.0,
            per_month: balance * apr / 12.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentPlan {
    Minimum,
    DoubleMinimum,
    Aggressive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PlanOutcome {
    #[serde(rename_all = "camelCase")]
    PaidOff {
        months: u32,
        total_paid: f64,
        total_interest: f64,
    },
    #[serde(rename_all = "camelCase")]
    NeverPaysOff { minimum_payment_to_converge: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanComparison {
    pub plan: PaymentPlan,
    pub monthly_payment: f64,
    pub outcome: PlanOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardResult {
    pub balance: f64,
    pub apr: f64,
    pub monthly_payment: f64,
    pub minimum_payment: f64,
    pub months_to_payoff: u32,
    pub total_paid: f64,
    pub total_interest: f64,
    pub schedule: AmortizationSchedule,
    pub interest_clock: InterestClock,
    pub comparison: Vec<PlanComparison>,
    pub score: f64,
}

/// The chosen payment never retires the balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonConvergentResult {
    pub balance: f64,
    pub apr: f64,
    pub monthly_payment: f64,
    pub reason: NonConvergenceReason,
    pub monthly_interest: f64,
    pub minimum_payment_to_converge: f64,
    pub interest_clock: InterestClock,
    pub comparison: Vec<PlanComparison>,
}

impl NonConvergentResult {
    pub fn score(&self) -> f64 {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payoff {
    PaidOff(CreditCardResult),
    NonConvergent(NonConvergentResult),
}

pub fn compute(params: &CreditCardParams) -> Result<Payoff, ValidationError> {
    params.validate()?;

    let minimum_payment = params.minimum_payment();
    let monthly_payment = params.monthly_payment.unwrap_or(minimum_payment);
    debug!(payment = monthly_payment, "projecting card payoff");

    let interest_clock = InterestClock::new(params.balance, params.apr);
    let comparison = compare_plans(params.balance, params.apr, minimum_payment);

    match amortization_schedule(params.balance, params.apr, monthly_payment, MAX_PAYOFF_MONTHS) {
        Ok(schedule) => Ok(Payoff::PaidOff(CreditCardResult {
            balance: params.balance,
            apr: params.apr,
            monthly_payment,
            minimum_payment,
            months_to_payoff: schedule.months(),
            total_paid: schedule.total_paid,
            total_interest: schedule.total_interest,
            score: (100.0 - 100.0 * schedule.total_interest / params.balance).max(0.0),
            schedule,
            interest_clock,
            comparison,
        })),
        Err(stall) => Ok(Payoff::NonConvergent(non_convergent(
            params,
            monthly_payment,
            stall,
            interest_clock,
            comparison,
        ))),
    }
}

fn non_convergent(
    params: &CreditCardParams,
    monthly_payment: f64,
    stall: NonConvergent,
    interest_clock: InterestClock,
    comparison: Vec<PlanComparison>,
) -> NonConvergentResult {
    NonConvergentResult {
        balance: params.balance,
        apr: params.apr,
        monthly_payment,
        reason: stall.reason,
        monthly_interest: stall.monthly_interest,
        minimum_payment_to_converge: stall.minimum_payment_to_converge,
        interest_clock,
        comparison,
    }
}

fn compare_plans(balance: f64, apr: f64, minimum_payment: f64) -> Vec<PlanComparison> {
    [
        (PaymentPlan::Minimum, minimum_payment),
        (PaymentPlan::DoubleMinimum, minimum_payment * 2.0),
        (
            PaymentPlan::Aggressive,
            AGGRESSIVE_PAYMENT_CAP.min(balance * AGGRESSIVE_BALANCE_SHARE),
        ),
    ]
    .into_iter()
    .map(|(plan, payment)| PlanComparison {
        plan,
        monthly_payment: payment,
        outcome: match amortization_schedule(balance, apr, payment, MAX_PAYOFF_MONTHS) {
            Ok(schedule) => PlanOutcome::PaidOff {
                months: schedule.months(),
                total_paid: schedule.total_paid,
                total_interest: schedule.total_interest,
            },
            Err(stall) => PlanOutcome::NeverPaysOff {
                minimum_payment_to_converge: stall.minimum_payment_to_converge,
            },
        },
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn card(balance: f64, apr: f64, payment: Option<f64>) -> CreditCardParams {
        CreditCardParams {
            balance,
            apr,
            monthly_payment: payment,
            minimum_payment_percent: DEFAULT_MINIMUM_PAYMENT_PERCENT,
        }
    }

    fn paid_off(payoff: Payoff) -> CreditCardResult {
        match payoff {
            Payoff::PaidOff(result) => result,
            Payoff::NonConvergent(stall) => panic!("expected payoff, got {stall:?}"),
        }
    }

    #[test]
    fn minimum_payment_has_a_floor() {
        assert_approx(card(800.0, 0.2, None).minimum_payment(), 25.0);
        assert_approx(card(5_000.0, 0.2, None).minimum_payment(), 100.0);
    }

    #[test]
    fn default_payment_is_the_minimum() {
        let result = paid_off(compute(&card(5_000.0, 0.2299, None)).expect("valid"));
        assert_approx(result.monthly_payment, 100.0);
        assert!(result.months_to_payoff > 60);
        assert!(result.total_interest > 0.0);
        assert_eq!(
            result.schedule.rows.last().map(|r| r.remaining_balance),
            Some(0.0)
        );
    }

    #[test]
    fn larger_payments_pay_off_faster_and_cheaper() {
        let result = paid_off(compute(&card(5_000.0, 0.2299, None)).expect("valid"));
        let months: Vec<u32> = result
            .comparison
            .iter()
            .map(|row| match row.outcome {
                PlanOutcome::PaidOff { months, .. } => months,
                PlanOutcome::NeverPaysOff { .. } => u32::MAX,
            })
            .collect();
        assert!(months[0] > months[1]);
        assert!(months[1] > months[2]);
        assert_approx(result.comparison[2].monthly_payment, 500.0);
    }

    #[test]
    fn interest_clock_reports_daily_and_hourly_cost() {
        let clock = InterestClock::new(3_650.0, 0.20);
        assert_approx(clock.per_day, 2.0);
        assert_approx(clock.per_hour, 2.0 / 24.0);
        assert_approx(clock.per_month, 3_650.0 * 0.20 / 12.0);
    }

    #[test]
    fn minimum_below_interest_is_non_convergent_with_actionable_payment() {
        let payoff = compute(&card(5_000.0, 0.30, None)).expect("valid");
        let Payoff::NonConvergent(stall) = payoff else {
            panic!("expected non-convergence");
        };
        assert_eq!(stall.reason, NonConvergenceReason::InterestNotCovered);
        assert!(stall.minimum_payment_to_converge > stall.monthly_interest);
        assert_eq!(stall.score(), 0.0);
        assert!(matches!(
            stall.comparison[0].outcome,
            PlanOutcome::NeverPaysOff { .. }
        ));

        let fixed = compute(&card(5_000.0, 0.30, Some(stall.minimum_payment_to_converge)))
            .expect("valid");
        assert!(matches!(fixed, Payoff::PaidOff(_)));
    }

    #[test]
    fn score_reflects_interest_relative_to_balance() {
        let result = paid_off(compute(&card(1_000.0, 0.0, Some(100.0))).expect("valid"));
        assert_eq!(result.months_to_payoff, 10);
        assert_approx(result.score, 100.0);

        let result = paid_off(compute(&card(1_000.0, 0.24, Some(1_020.0))).expect("valid"));
        assert_approx(result.total_interest, 20.0);
        assert_approx(result.score, 98.0);
    }

    #[test]
    fn rejects_non_positive_balance_and_payment() {
        assert!(compute(&card(0.0, 0.2, None)).is_err());
        assert!(compute(&card(500.0, 0.2, Some(0.0))).is_err());
        assert!(compute(&card(500.0, 1.5, None)).is_err());
    }
}
