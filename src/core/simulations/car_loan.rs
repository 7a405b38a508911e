use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{
    ValidationError, annual_rate, count_in_range, non_negative, positive,
};
use crate::core::math::{
    AmortizationSchedule, amortization_schedule, amortized_payment, compound_lump_sum,
    future_value_of_series,
};

pub const MAX_TERM_MONTHS: u32 = 96;
pub const DEFAULT_INVESTMENT_RETURN: f64 = 0.08;
/// Yearly value loss: 20% in year one, 15% in years two to five.
pub const DEPRECIATION_CURVE: [f64; 5] = [0.20, 0.15, 0.15, 0.15, 0.15];
pub const LATE_DEPRECIATION: f64 = 0.10;
const MIN_DOWN_PAYMENT_SHARE: f64 = 0.20;
const MAX_RECOMMENDED_TERM: u32 = 48;
const MAX_INCOME_SHARE: f64 = 0.10;

fn default_investment_return() -> f64 {
    DEFAULT_INVESTMENT_RETURN
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarLoanParams {
    pub car_price: f64,
    pub down_payment: f64,
    pub annual_interest_rate: f64,
    pub term_months: u32,
    #[serde(default)]
    pub monthly_insurance: f64,
    #[serde(default)]
    pub monthly_maintenance: f64,
    #[serde(default)]
    pub monthly_fuel: f64,
    #[serde(default)]
    pub annual_registration: f64,
    #[serde(default = "default_investment_return")]
    pub investment_return: f64,
    pub monthly_income: f64,
}

impl CarLoanParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        positive("carPrice", self.car_price)?;
        non_negative("downPayment", self.down_payment)?;
        if self.down_payment > self.car_price {
            return Err(ValidationError::Inconsistent {
                field: "downPayment",
                reason: "must not exceed carPrice".to_string(),
            });
        }
        annual_rate("annualInterestRate", self.annual_interest_rate)?;
        count_in_range("termMonths", self.term_months, 1, MAX_TERM_MONTHS)?;
        non_negative("monthlyInsurance", self.monthly_insurance)?;
        non_negative("monthlyMaintenance", self.monthly_maintenance)?;
        non_negative("monthlyFuel", self.monthly_fuel)?;
        non_negative("annualRegistration", self.annual_registration)?;
        annual_rate("investmentReturn", self.investment_return)?;
        positive("monthlyIncome", self.monthly_income)?;
        Ok(())
    }

    fn monthly_ownership(&self) -> f64 {
        self.monthly_insurance
            + self.monthly_maintenance
            + self.monthly_fuel
            + self.annual_registration / 12.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipCosts {
    pub insurance: f64,
    pub maintenance: f64,
    pub fuel: f64,
    pub registration: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarYear {
    pub year: u32,
    pub loan_balance: f64,
    pub car_value: f64,
    pub equity: f64,
    pub cumulative_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffordabilityChecks {
    pub down_payment_at_least_20_percent: bool,
    pub term_at_most_48_months: bool,
    pub costs_within_10_percent_of_income: bool,
}

impl AffordabilityChecks {
    fn passed(&self) -> u32 {
        [
            self.down_payment_at_least_20_percent,
            self.term_at_most_48_months,
            self.costs_within_10_percent_of_income,
        ]
        .iter()
        .filter(|&&ok| ok)
        .count() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarLoanResult {
    pub loan_amount: f64,
    pub monthly_payment: f64,
    pub total_interest: f64,
    pub total_payments: f64,
    pub ownership: OwnershipCosts,
    pub all_in_monthly: f64,
    pub total_cost_of_ownership: f64,
    pub final_car_value: f64,
    pub depreciation: f64,
    pub opportunity_cost: f64,
    pub schedule: AmortizationSchedule,
    pub years: Vec<CarYear>,
    pub checks: AffordabilityChecks,
    pub score: f64,
}

pub fn compute(params: &CarLoanParams) -> Result<CarLoanResult, ValidationError> {
    params.validate()?;
    debug!(term = params.term_months, "costing car loan");

    let term = params.term_months;
    let months = term as f64;
    let loan_amount = params.car_price - params.down_payment;
    let monthly_payment = amortized_payment(loan_amount, params.annual_interest_rate, term);
    let schedule = amortization_schedule(
        loan_amount,
        params.annual_interest_rate,
        monthly_payment,
        term,
    )
    .map_err(|stall| ValidationError::Inconsistent {
        field: "termMonths",
        reason: format!("loan does not amortize ({:?})", stall.reason),
    })?;

    let ownership = OwnershipCosts {
        insurance: params.monthly_insurance * months,
        maintenance: params.monthly_maintenance * months,
        fuel: params.monthly_fuel * months,
        registration: params.annual_registration / 12.0 * months,
        total: params.monthly_ownership() * months,
    };
    let all_in_monthly = monthly_payment + params.monthly_ownership();
    let horizon_years = term.div_ceil(12);
    let final_car_value = car_value_after(params.car_price, horizon_years);

    let years = (1..=horizon_years)
        .map(|year| {
            let month = (year * 12).min(term);
            let paid_so_far: f64 = schedule
                .rows
                .iter()
                .take(month as usize)
                .map(|r| r.payment)
                .sum();
            let loan_balance = schedule
                .rows
                .get(month as usize - 1)
                .map_or(0.0, |r| r.remaining_balance);
            let car_value = car_value_after(params.car_price, year);
            CarYear {
                year,
                loan_balance,
                car_value,
                equity: car_value - loan_balance,
                cumulative_cost: params.down_payment
                    + paid_so_far
                    + params.monthly_ownership() * month as f64,
            }
        })
        .collect();

    let opportunity_cost = future_value_of_series(all_in_monthly, params.investment_return, term)
        + compound_lump_sum(params.down_payment, params.investment_return, term);

    let checks = AffordabilityChecks {
        down_payment_at_least_20_percent: params.down_payment
            >= params.car_price * MIN_DOWN_PAYMENT_SHARE,
        term_at_most_48_months: term <= MAX_RECOMMENDED_TERM,
        costs_within_10_percent_of_income: all_in_monthly
            <= params.monthly_income * MAX_INCOME_SHARE,
    };

    Ok(CarLoanResult {
        loan_amount,
        monthly_payment,
        total_interest: schedule.total_interest,
        total_payments: schedule.total_paid,
        total_cost_of_ownership: params.down_payment + schedule.total_paid + ownership.total,
        ownership,
        all_in_monthly,
        final_car_value,
        depreciation: params.car_price - final_car_value,
        opportunity_cost,
        schedule,
        years,
        score: 100.0 * checks.passed() as f64 / 3.0,
        checks,
    })
}

pub fn car_value_after(price: f64, years: u32) -> f64 {
    (0..years as usize).fold(price, |value, year| {
        let rate = DEPRECIATION_CURVE
            .get(year)
            .copied()
            .unwrap_or(LATE_DEPRECIATION);
        value * (1.0 - rate)
    })
}
