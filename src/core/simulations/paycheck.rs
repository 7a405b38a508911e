use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{ValidationError, count_in_range, in_range, non_negative, positive};

pub const DEFAULT_SAVINGS_GOAL_PERCENT: f64 = 10.0;
pub const DEFAULT_MONTHS: u32 = 12;
pub const MAX_MONTHS: u32 = 60;
pub const LATE_FEE_PER_BILL: f64 = 35.0;
pub const LATE_BILL_COUNT: u32 = 3;
/// Share of income spent in weeks one and two under spend-first.
pub const SPEND_FIRST_OVERSPEND: [f64; 2] = [0.20, 0.15];
const BILLS_FIRST_SPEND_SHARE: f64 = 0.60;
const BILLS_FIRST_WEEK_TWO_SHARE: f64 = 0.60;

fn default_savings_goal_percent() -> f64 {
    DEFAULT_SAVINGS_GOAL_PERCENT
}

fn default_months() -> u32 {
    DEFAULT_MONTHS
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaycheckStrategy {
    SpendFirst,
    BillsFirst,
    SaveFirst,
}

impl PaycheckStrategy {
    pub const ALL: [PaycheckStrategy; 3] = [
        PaycheckStrategy::SpendFirst,
        PaycheckStrategy::BillsFirst,
        PaycheckStrategy::SaveFirst,
    ];
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FixedExpenses {
    pub rent: f64,
    pub utilities: f64,
    pub groceries: f64,
    pub insurance: f64,
    pub transportation: f64,
    pub debt_payments: f64,
}

impl FixedExpenses {
    pub fn total(&self) -> f64 {
        self.rent
            + self.utilities
            + self.groceries
            + self.insurance
            + self.transportation
            + self.debt_payments
    }

    fn validate(&self) -> Result<(), ValidationError> {
        non_negative("fixedExpenses.rent", self.rent)?;
        non_negative("fixedExpenses.utilities", self.utilities)?;
        non_negative("fixedExpenses.groceries", self.groceries)?;
        non_negative("fixedExpenses.insurance", self.insurance)?;
        non_negative("fixedExpenses.transportation", self.transportation)?;
        non_negative("fixedExpenses.debtPayments", self.debt_payments)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaycheckParams {
    pub monthly_income: f64,
    pub fixed_expenses: FixedExpenses,
    #[serde(default = "default_savings_goal_percent")]
    pub savings_goal_percent: f64,
    pub strategy: PaycheckStrategy,
    #[serde(default = "default_months")]
    pub months: u32,
}

impl PaycheckParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        positive("monthlyIncome", self.monthly_income)?;
        self.fixed_expenses.validate()?;
        in_range("savingsGoalPercent", self.savings_goal_percent, 0.0, 100.0)?;
        count_in_range("months", self.months, 1, MAX_MONTHS)?;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerEvent {
    Spending,
    AutoSave,
    BillsPaid,
    BillsShort,
    SavedLeftover,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub week: u8,
    pub event: LedgerEvent,
    pub amount: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthOutcome {
    pub strategy: PaycheckStrategy,
    pub savings_target: f64,
    pub amount_saved: f64,
    pub bills_due: f64,
    pub bills_paid: f64,
    pub bills_covered: bool,
    pub discretionary_spent: f64,
    pub late_fees: f64,
    pub stress: StressLevel,
    pub final_balance: f64,
    pub ledger: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaycheckMonth {
    pub month: u32,
    pub cumulative_saved: f64,
    pub cumulative_late_fees: f64,
    pub cumulative_discretionary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySummary {
    pub strategy: PaycheckStrategy,
    pub bills_covered: bool,
    pub monthly_saved: f64,
    pub total_saved: f64,
    pub total_late_fees: f64,
    pub total_discretionary: f64,
    pub net_worth_impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaycheckResult {
    pub month: MonthOutcome,
    pub months: Vec<PaycheckMonth>,
    pub comparison: Vec<StrategySummary>,
    pub score: f64,
}

pub fn compute(params: &PaycheckParams) -> Result<PaycheckResult, ValidationError> {
    params.validate()?;
    debug!(strategy = ?params.strategy, months = params.months, "allocating paycheck");

    let target = params.monthly_income * params.savings_goal_percent / 100.0;
    let bills = params.fixed_expenses.total();
    let month = simulate_month(params.monthly_income, bills, target, params.strategy);

    let months = (1..=params.months)
        .map(|m| PaycheckMonth {
            month: m,
            cumulative_saved: month.amount_saved * m as f64,
            cumulative_late_fees: month.late_fees * m as f64,
            cumulative_discretionary: month.discretionary_spent * m as f64,
        })
        .collect();

    let comparison = PaycheckStrategy::ALL
        .iter()
        .map(|&strategy| {
            let outcome = simulate_month(params.monthly_income, bills, target, strategy);
            let n = params.months as f64;
            StrategySummary {
                strategy,
                bills_covered: outcome.bills_covered,
                monthly_saved: outcome.amount_saved,
                total_saved: outcome.amount_saved * n,
                total_late_fees: outcome.late_fees * n,
                total_discretionary: outcome.discretionary_spent * n,
                net_worth_impact: (outcome.amount_saved - outcome.late_fees) * n,
            }
        })
        .collect();

    let score = score_month(&month);
    Ok(PaycheckResult {
        month,
        months,
        comparison,
        score,
    })
}

fn score_month(month: &MonthOutcome) -> f64 {
    let bills_part = if month.bills_covered { 50.0 } else { 0.0 };
    let savings_ratio = if month.savings_target > 0.0 {
        (month.amount_saved / month.savings_target).min(1.0)
    } else {
        1.0
    };
    bills_part + 50.0 * savings_ratio
}

struct Month {
    balance: f64,
    ledger: Vec<LedgerEntry>,
}

impl Month {
    fn debit(&mut self, week: u8, event: LedgerEvent, amount: f64) {
        self.balance -= amount;
        self.ledger.push(LedgerEntry {
            week,
            event,
            amount: -amount,
            balance: self.balance,
        });
    }

    /// Pays what the balance covers; a shortfall empties the account and adds late fees.
    fn pay_bills(&mut self, week: u8, bills: f64) -> (f64, f64) {
        if self.balance >= bills {
            self.debit(week, LedgerEvent::BillsPaid, bills);
            return (bills, 0.0);
        }
        let paid = self.balance.max(0.0);
        let late_fees = LATE_FEE_PER_BILL * LATE_BILL_COUNT as f64;
        self.balance = 0.0;
        self.ledger.push(LedgerEntry {
            week,
            event: LedgerEvent::BillsShort,
            amount: -(paid + late_fees),
            balance: 0.0,
        });
        (paid, late_fees)
    }
}

pub fn simulate_month(
    income: f64,
    bills: f64,
    savings_target: f64,
    strategy: PaycheckStrategy,
) -> MonthOutcome {
    let mut month = Month {
        balance: income,
        ledger: Vec::new(),
    };
    let (bills_paid, late_fees, discretionary_spent, amount_saved) = match strategy {
        PaycheckStrategy::SpendFirst => {
            let mut spent = 0.0;
            for (week, share) in (1u8..).zip(SPEND_FIRST_OVERSPEND) {
                let amount = income * share;
                month.debit(week, LedgerEvent::Spending, amount);
                spent += amount;
            }
            let (paid, fees) = month.pay_bills(3, bills);
            let saved = month.balance.max(0.0);
            if saved > 0.0 {
                month.debit(4, LedgerEvent::SavedLeftover, saved);
            }
            (paid, fees, spent, saved)
        }
        PaycheckStrategy::BillsFirst => {
            let (paid, fees) = month.pay_bills(1, bills);
            let spend = month.balance * BILLS_FIRST_SPEND_SHARE;
            month.debit(2, LedgerEvent::Spending, spend * BILLS_FIRST_WEEK_TWO_SHARE);
            month.debit(3, LedgerEvent::Spending, spend * (1.0 - BILLS_FIRST_WEEK_TWO_SHARE));
            let saved = month.balance.max(0.0);
            if saved > 0.0 {
                month.debit(4, LedgerEvent::SavedLeftover, saved);
            }
            (paid, fees, spend, saved)
        }
        PaycheckStrategy::SaveFirst => {
            let saved = savings_target.min(income);
            month.debit(1, LedgerEvent::AutoSave, saved);
            let (paid, fees) = month.pay_bills(1, bills);
            let budget = month.balance;
            for week in 2..=4 {
                month.debit(week, LedgerEvent::Spending, budget / 3.0);
            }
            (paid, fees, budget, saved)
        }
    };

    let bills_covered = late_fees == 0.0;
    let stress = match (bills_covered, strategy) {
        (false, _) | (true, PaycheckStrategy::SpendFirst) => StressLevel::High,
        (true, PaycheckStrategy::BillsFirst) => StressLevel::Medium,
        (true, PaycheckStrategy::SaveFirst) => StressLevel::Low,
    };

    MonthOutcome {
        strategy,
        savings_target,
        amount_saved,
        bills_due: bills,
        bills_paid,
        bills_covered,
        discretionary_spent,
        late_fees,
        stress,
        final_balance: month.balance,
        ledger: month.ledger,
    }
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

    fn sample_params(strategy: PaycheckStrategy) -> PaycheckParams {
        PaycheckParams {
            monthly_income: 3_000.0,
            fixed_expenses: FixedExpenses {
                rent: 1_000.0,
                utilities: 150.0,
                groceries: 400.0,
                insurance: 150.0,
                transportation: 200.0,
                debt_payments: 200.0,
            },
            savings_goal_percent: 10.0,
            strategy,
            months: 12,
        }
    }

    #[test]
    fn spend_first_overspends_into_late_fees() {
        let result = compute(&sample_params(PaycheckStrategy::SpendFirst)).expect("valid");
        let month = &result.month;
        assert_approx(month.discretionary_spent, 1_050.0);
        assert!(!month.bills_covered);
        assert_approx(month.bills_paid, 1_950.0);
        assert_approx(month.late_fees, 105.0);
        assert_eq!(month.amount_saved, 0.0);
        assert_eq!(month.stress, StressLevel::High);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn bills_first_saves_leftover_after_spending() {
        let result = compute(&sample_params(PaycheckStrategy::BillsFirst)).expect("valid");
        let month = &result.month;
        assert!(month.bills_covered);
        assert_approx(month.discretionary_spent, 540.0);
        assert_approx(month.amount_saved, 360.0);
        assert_approx(month.final_balance, 0.0);
        assert_approx(result.score, 100.0);
    }

    #[test]
    fn save_first_moves_target_before_bills() {
        let result = compute(&sample_params(PaycheckStrategy::SaveFirst)).expect("valid");
        let month = &result.month;
        assert_eq!(month.ledger[0].event, LedgerEvent::AutoSave);
        assert_approx(month.amount_saved, 300.0);
        assert_approx(month.discretionary_spent, 600.0);
        assert_eq!(month.ledger.len(), 5);
        assert_approx(month.final_balance, 0.0);
        assert_eq!(month.stress, StressLevel::Low);
    }

    #[test]
    fn monthly_projection_spans_requested_months_and_accumulates() {
        let mut params = sample_params(PaycheckStrategy::SaveFirst);
        params.months = 18;
        let result = compute(&params).expect("valid");
        assert_eq!(result.months.len(), 18);
        for pair in result.months.windows(2) {
            assert!(pair[1].cumulative_saved >= pair[0].cumulative_saved);
        }
        assert_approx(result.months[17].cumulative_saved, 300.0 * 18.0);
    }

    #[test]
    fn comparison_covers_all_strategies() {
        let result = compute(&sample_params(PaycheckStrategy::BillsFirst)).expect("valid");
        let strategies: Vec<PaycheckStrategy> =
            result.comparison.iter().map(|s| s.strategy).collect();
        assert_eq!(strategies, PaycheckStrategy::ALL.to_vec());
        let spend_first = &result.comparison[0];
        assert_approx(spend_first.net_worth_impact, -105.0 * 12.0);
    }

    #[test]
    fn bills_above_income_incur_late_fees_under_every_policy() {
        for strategy in PaycheckStrategy::ALL {
            let outcome = simulate_month(1_500.0, 2_000.0, 150.0, strategy);
            assert!(!outcome.bills_covered, "{strategy:?}");
            assert!(outcome.final_balance >= 0.0);
        }
    }

    #[test]
    fn zero_savings_goal_gets_full_savings_credit() {
        let mut params = sample_params(PaycheckStrategy::SaveFirst);
        params.savings_goal_percent = 0.0;
        let result = compute(&params).expect("valid");
        assert_approx(result.score, 100.0);
    }

    #[test]
    fn rejects_negative_rent_and_goal_above_hundred() {
        let mut params = sample_params(PaycheckStrategy::SaveFirst);
        params.fixed_expenses.rent = -1.0;
        assert!(compute(&params).is_err());

        let mut params = sample_params(PaycheckStrategy::SaveFirst);
        params.savings_goal_percent = 120.0;
        assert!(compute(&params).is_err());
    }
}
