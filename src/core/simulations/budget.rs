use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{ValidationError, in_range, non_negative, positive};

const UNALLOCATED_WARNING_THRESHOLD: f64 = 100.0;
const BALANCED_TOLERANCE: f64 = 1.0;
const HOUSING_MAX_PERCENT: f64 = 30.0;
const EMERGENCY_FUND_MIN_SHARE: f64 = 0.05;

fn default_cost_of_living() -> f64 {
    1.0
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategory {
    Housing,
    Utilities,
    Groceries,
    Transportation,
    Insurance,
    MinimumDebtPayments,
    Healthcare,
    DiningOut,
    Entertainment,
    Shopping,
    Hobbies,
    Subscriptions,
    Travel,
    EmergencyFund,
    Retirement,
    Investments,
    DebtPayoff,
    Goals,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Needs,
    Wants,
    Savings,
}

impl BudgetCategory {
    pub fn bucket(self) -> Bucket {
        use BudgetCategory::*;
        match self {
            Housing | Utilities | Groceries | Transportation | Insurance | MinimumDebtPayments
            | Healthcare => Bucket::Needs,
            DiningOut | Entertainment | Shopping | Hobbies | Subscriptions | Travel => Bucket::Wants,
            EmergencyFund | Retirement | Investments | DebtPayoff | Goals => Bucket::Savings,
        }
    }
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Needs, Bucket::Wants, Bucket::Savings];

    pub fn target_percent(self) -> f64 {
        match self {
            Bucket::Needs => 50.0,
            Bucket::Wants => 30.0,
            Bucket::Savings => 20.0,
        }
    }

    pub fn penalty_factor(self) -> f64 {
        match self {
            Bucket::Needs => 2.0,
            Bucket::Wants => 3.0,
            Bucket::Savings => 4.0,
        }
    }

    /// Acceptable band around the target, in percent of income.
    pub fn acceptable_range(self) -> (f64, f64) {
        match self {
            Bucket::Needs => (40.0, 65.0),
            Bucket::Wants => (15.0, 40.0),
            Bucket::Savings => (10.0, 35.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub category: BudgetCategory,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetParams {
    pub monthly_income: f64,
    pub allocations: Vec<Allocation>,
    /// Scales the housing ceiling for expensive or cheap areas.
    #[serde(default = "default_cost_of_living")]
    pub cost_of_living_multiplier: f64,
}

impl BudgetParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        positive("monthlyIncome", self.monthly_income)?;
        in_range(
            "costOfLivingMultiplier",
            self.cost_of_living_multiplier,
            0.5,
            2.0,
        )?;
        let mut seen = Vec::with_capacity(self.allocations.len());
        for allocation in &self.allocations {
            non_negative("allocations.amount", allocation.amount)?;
            if seen.contains(&allocation.category) {
                return Err(ValidationError::Duplicate {
                    field: "allocations",
                    value: format!("{:?}", allocation.category),
                });
            }
            seen.push(allocation.category);
        }
        Ok(())
    }

    fn amount_for(&self, category: BudgetCategory) -> f64 {
        self.allocations
            .iter()
            .find(|a| a.category == category)
            .map_or(0.0, |a| a.amount)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketStatus {
    Low,
    WithinRange,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketReport {
    pub bucket: Bucket,
    pub amount: f64,
    pub actual_percent: f64,
    pub target_percent: f64,
    pub deviation: f64,
    pub score: f64,
    pub status: BucketStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BudgetWarning {
    Unallocated { amount: f64 },
    OverBudget { amount: f64 },
    BucketHigh { bucket: Bucket, percent: f64 },
    BucketLow { bucket: Bucket, percent: f64 },
    HousingHigh { percent: f64, limit: f64 },
    EmergencyFundLow { amount: f64, minimum: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResult {
    pub monthly_income: f64,
    pub total_allocated: f64,
    pub remaining: f64,
    pub balanced: bool,
    pub buckets: Vec<BucketReport>,
    pub warnings: Vec<BudgetWarning>,
    pub score: f64,
}

pub fn compute(params: &BudgetParams) -> Result<BudgetResult, ValidationError> {
    params.validate()?;
    debug!(categories = params.allocations.len(), "validating budget");

    let income = params.monthly_income;
    let buckets: Vec<BucketReport> = Bucket::ALL
        .iter()
        .map(|&bucket| {
            let amount: f64 = params
                .allocations
                .iter()
                .filter(|a| a.category.bucket() == bucket)
                .map(|a| a.amount)
                .sum();
            bucket_report(bucket, amount, income)
        })
        .collect();

    let total_allocated: f64 = buckets.iter().map(|b| b.amount).sum();
    let remaining = income - total_allocated;
    let warnings = collect_warnings(params, &buckets, remaining);
    let score = buckets.iter().map(|b| b.score).sum::<f64>() / buckets.len() as f64;

    Ok(BudgetResult {
        monthly_income: income,
        total_allocated,
        remaining,
        balanced: remaining.abs() < BALANCED_TOLERANCE,
        buckets,
        warnings,
        score,
    })
}

pub fn bucket_report(bucket: Bucket, amount: f64, income: f64) -> BucketReport {
    let actual_percent = amount / income * 100.0;
    let target_percent = bucket.target_percent();
    let deviation = (actual_percent - target_percent).abs();
    let (low, high) = bucket.acceptable_range();
    let status = if actual_percent < low {
        BucketStatus::Low
    } else if actual_percent > high {
        BucketStatus::High
    } else {
        BucketStatus::WithinRange
    };
    BucketReport {
        bucket,
        amount,
        actual_percent,
        target_percent,
        deviation,
        score: (100.0 - deviation * bucket.penalty_factor()).max(0.0),
        status,
    }
}

fn collect_warnings(
    params: &BudgetParams,
    buckets: &[BucketReport],
    remaining: f64,
) -> Vec<BudgetWarning> {
    let income = params.monthly_income;
    let mut warnings = Vec::new();

    if remaining > UNALLOCATED_WARNING_THRESHOLD {
        warnings.push(BudgetWarning::Unallocated { amount: remaining });
    } else if remaining < -BALANCED_TOLERANCE {
        warnings.push(BudgetWarning::OverBudget { amount: -remaining });
    }

    for report in buckets {
        let warning = match (report.bucket, report.status) {
            (Bucket::Needs | Bucket::Wants, BucketStatus::High) => BudgetWarning::BucketHigh {
                bucket: report.bucket,
                percent: report.actual_percent,
            },
            (Bucket::Needs | Bucket::Savings, BucketStatus::Low) => BudgetWarning::BucketLow {
                bucket: report.bucket,
                percent: report.actual_percent,
            },
            _ => continue,
        };
        warnings.push(warning);
    }

    let housing = params.amount_for(BudgetCategory::Housing);
    let housing_limit = HOUSING_MAX_PERCENT * params.cost_of_living_multiplier;
    let housing_percent = housing / income * 100.0;
    if housing_percent > housing_limit {
        warnings.push(BudgetWarning::HousingHigh {
            percent: housing_percent,
            limit: housing_limit,
        });
    }

    let emergency = params.amount_for(BudgetCategory::EmergencyFund);
    let minimum = income * EMERGENCY_FUND_MIN_SHARE;
    if emergency < minimum {
        warnings.push(BudgetWarning::EmergencyFundLow {
            amount: emergency,
            minimum,
        });
    }

    warnings
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

    fn alloc(category: BudgetCategory, amount: f64) -> Allocation {
        Allocation { category, amount }
    }

    fn textbook_budget() -> BudgetParams {
        BudgetParams {
            monthly_income: 4_000.0,
            allocations: vec![
                alloc(BudgetCategory::Housing, 1_200.0),
                alloc(BudgetCategory::Groceries, 500.0),
                alloc(BudgetCategory::Utilities, 300.0),
                alloc(BudgetCategory::DiningOut, 600.0),
                alloc(BudgetCategory::Entertainment, 600.0),
                alloc(BudgetCategory::EmergencyFund, 400.0),
                alloc(BudgetCategory::Retirement, 400.0),
            ],
            cost_of_living_multiplier: 1.0,
        }
    }

    #[test]
    fn fifty_thirty_twenty_scores_perfect() {
        let result = compute(&textbook_budget()).expect("valid");
        for report in &result.buckets {
            assert_approx(report.deviation, 0.0);
            assert_eq!(report.status, BucketStatus::WithinRange);
        }
        assert_approx(result.score, 100.0);
        assert!(result.balanced);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn savings_shortfall_costs_more_than_needs_overshoot() {
        let params = BudgetParams {
            monthly_income: 1_000.0,
            allocations: vec![
                alloc(BudgetCategory::Housing, 600.0),
                alloc(BudgetCategory::Travel, 300.0),
                alloc(BudgetCategory::EmergencyFund, 100.0),
            ],
            cost_of_living_multiplier: 1.0,
        };
        let result = compute(&params).expect("valid");
        let scores: Vec<f64> = result.buckets.iter().map(|b| b.score).collect();
        assert_approx(scores[0], 80.0);
        assert_approx(scores[1], 100.0);
        assert_approx(scores[2], 60.0);
        assert_approx(result.score, 80.0);
    }

    #[test]
    fn large_deviation_floors_bucket_at_zero() {
        let report = bucket_report(Bucket::Savings, 0.0, 1_000.0);
        assert_approx(report.deviation, 20.0);
        assert_eq!(report.score, 20.0);
        let report = bucket_report(Bucket::Wants, 900.0, 1_000.0);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn warnings_flag_unallocated_housing_and_missing_emergency_fund() {
        let params = BudgetParams {
            monthly_income: 5_000.0,
            allocations: vec![
                alloc(BudgetCategory::Housing, 2_000.0),
                alloc(BudgetCategory::Shopping, 500.0),
            ],
            cost_of_living_multiplier: 1.0,
        };
        let result = compute(&params).expect("valid");
        assert!(!result.balanced);
        assert!(matches!(
            result.warnings[0],
            BudgetWarning::Unallocated { amount } if (amount - 2_500.0).abs() < EPS
        ));
        assert!(result.warnings.iter().any(|w| matches!(w, BudgetWarning::HousingHigh { .. })));
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, BudgetWarning::EmergencyFundLow { .. })));
    }

    #[test]
    fn cost_of_living_raises_housing_ceiling() {
        let mut params = textbook_budget();
        params.allocations[0].amount = 1_400.0;
        params.allocations[1].amount = 300.0;
        assert!(compute(&params)
            .expect("valid")
            .warnings
            .iter()
            .any(|w| matches!(w, BudgetWarning::HousingHigh { .. })));

        params.cost_of_living_multiplier = 1.25;
        assert!(!compute(&params)
            .expect("valid")
            .warnings
            .iter()
            .any(|w| matches!(w, BudgetWarning::HousingHigh { .. })));
    }

    #[test]
    fn over_allocation_is_reported() {
        let mut params = textbook_budget();
        params.allocations.push(alloc(BudgetCategory::Travel, 250.0));
        let result = compute(&params).expect("valid");
        assert!(matches!(
            result.warnings[0],
            BudgetWarning::OverBudget { amount } if (amount - 250.0).abs() < EPS
        ));
    }

    #[test]
    fn rejects_duplicate_categories() {
        let mut params = textbook_budget();
        params.allocations.push(alloc(BudgetCategory::Housing, 10.0));
        assert!(matches!(
            compute(&params),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn every_category_maps_to_a_bucket() {
        assert_eq!(BudgetCategory::MinimumDebtPayments.bucket(), Bucket::Needs);
        assert_eq!(BudgetCategory::Subscriptions.bucket(), Bucket::Wants);
        assert_eq!(BudgetCategory::DebtPayoff.bucket(), Bucket::Savings);
    }
}
