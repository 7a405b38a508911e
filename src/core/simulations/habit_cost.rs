use serde::{Deserialize, Serialize};
use tracing::debug;

use super::guess_accuracy_score;
use crate::core::error::{ValidationError, annual_rate, count_in_range, non_negative};

pub const DEFAULT_ANNUAL_RETURN: f64 = 0.08;
pub const MAX_YEARS: u32 = 60;
const WEEKS_PER_YEAR: f64 = 52.0;
const MILESTONE_YEARS: [u32; 3] = [5, 10, 30];

pub const EQUIVALENT_ITEMS: [(&str, f64); 10] = [
    ("New iPhone", 1_000.0),
    ("Weekend getaway", 500.0),
    ("Nice dinner for two", 150.0),
    ("Gym membership (1 year)", 600.0),
    ("Streaming services (1 year)", 180.0),
    ("New laptop", 1_500.0),
    ("Used car down payment", 5_000.0),
    ("Emergency fund starter", 3_000.0),
    ("Online course", 500.0),
    ("Vacation", 2_500.0),
];

fn default_annual_return() -> f64 {
    DEFAULT_ANNUAL_RETURN
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitCostParams {
    pub daily_cost: f64,
    pub days_per_week: u32,
    pub years: u32,
    #[serde(default = "default_annual_return")]
    pub annual_return: f64,
    pub guessed_annual_cost: f64,
    /// Cost of the cheaper alternative (e.g. coffee made at home), if any.
    #[serde(default)]
    pub home_daily_cost: Option<f64>,
}

impl HabitCostParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_negative("dailyCost", self.daily_cost)?;
        count_in_range("daysPerWeek", self.days_per_week, 1, 7)?;
        count_in_range("years", self.years, 1, MAX_YEARS)?;
        annual_rate("annualReturn", self.annual_return)?;
        non_negative("guessedAnnualCost", self.guessed_annual_cost)?;
        if let Some(home) = self.home_daily_cost {
            non_negative("homeDailyCost", home)?;
            if home > self.daily_cost {
                return Err(ValidationError::Inconsistent {
                    field: "homeDailyCost",
                    reason: "must not exceed dailyCost".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitYear {
    pub year: u32,
    pub spent_total: f64,
    pub invested_total: f64,
    pub opportunity_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitMilestone {
    pub years: u32,
    pub spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffordableItem {
    pub name: String,
    pub price: f64,
    pub years_to_afford: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeBreakeven {
    pub daily_savings: f64,
    pub annual_savings: f64,
    pub invested_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitCostResult {
    pub annual_cost: f64,
    pub monthly_cost: f64,
    pub guessed_annual_cost: f64,
    pub milestones: Vec<HabitMilestone>,
    pub years: Vec<HabitYear>,
    pub total_spent: f64,
    pub total_invested: f64,
    pub opportunity_cost: f64,
    pub affordable_items: Vec<AffordableItem>,
    pub home_breakeven: Option<HomeBreakeven>,
    pub score: f64,
}

pub fn compute(params: &HabitCostParams) -> Result<HabitCostResult, ValidationError> {
    params.validate()?;
    debug!(years = params.years, "projecting habit cost");

    let annual_cost = annualize(params.daily_cost, params.days_per_week);
    let years = project(annual_cost, params.annual_return, params.years);
    let (total_spent, total_invested) = years
        .last()
        .map(|y| (y.spent_total, y.invested_total))
        .unwrap_or((0.0, 0.0));

    let affordable_items = EQUIVALENT_ITEMS
        .iter()
        .filter(|(_, price)| *price <= total_invested)
        .map(|&(name, price)| AffordableItem {
            name: name.to_string(),
            price,
            years_to_afford: years
                .iter()
                .find(|y| y.invested_total >= price)
                .map_or(params.years, |y| y.year),
        })
        .collect();

    let home_breakeven = params.home_daily_cost.map(|home| {
        let saved_per_year = annualize(params.daily_cost - home, params.days_per_week);
        HomeBreakeven {
            daily_savings: params.daily_cost - home,
            annual_savings: saved_per_year,
            invested_savings: project(saved_per_year, params.annual_return, params.years)
                .last()
                .map_or(0.0, |y| y.invested_total),
        }
    });

    Ok(HabitCostResult {
        annual_cost,
        monthly_cost: annual_cost / 12.0,
        guessed_annual_cost: params.guessed_annual_cost,
        milestones: MILESTONE_YEARS
            .iter()
            .map(|&years| HabitMilestone {
                years,
                spent: annual_cost * years as f64,
            })
            .collect(),
        total_spent,
        total_invested,
        opportunity_cost: total_invested - total_spent,
        affordable_items,
        home_breakeven,
        score: guess_accuracy_score(annual_cost, params.guessed_annual_cost),
        years,
    })
}

fn annualize(daily_cost: f64, days_per_week: u32) -> f64 {
    daily_cost * days_per_week as f64 * WEEKS_PER_YEAR
}

fn project(annual_amount: f64, annual_return: f64, years: u32) -> Vec<HabitYear> {
    let mut spent_total = 0.0;
    let mut invested_total = 0.0;
    (1..=years)
        .map(|year| {
            spent_total += annual_amount;
            invested_total = (invested_total + annual_amount) * (1.0 + annual_return);
            HabitYear {
                year,
                spent_total,
                invested_total,
                opportunity_cost: invested_total - spent_total,
            }
        })
        .collect()
}
