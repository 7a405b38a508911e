use serde::{Deserialize, Serialize};
use tracing::debug;

use super::guess_accuracy_score;
use crate::catalog::{AssetClass, Catalog};
use crate::core::error::{ValidationError, count_in_range, non_negative};
use crate::core::math::compound_balance;
use crate::core::monte_carlo::{self, DEFAULT_TRIALS, MAX_TRIALS, MonteCarloConfig, MonteCarloOutcome};

pub const MAX_YEARS: u32 = 50;

fn default_trials() -> u32 {
    DEFAULT_TRIALS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketParams {
    pub initial_amount: f64,
    #[serde(default)]
    pub monthly_contribution: f64,
    pub years: u32,
    pub asset_class: String,
    #[serde(default = "default_trials")]
    pub trials: u32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub guessed_median: Option<f64>,
}

impl MarketParams {
    pub fn validate<'c>(&self, catalog: &'c Catalog) -> Result<&'c AssetClass, ValidationError> {
        non_negative("initialAmount", self.initial_amount)?;
        non_negative("monthlyContribution", self.monthly_contribution)?;
        if self.initial_amount == 0.0 && self.monthly_contribution == 0.0 {
            return Err(ValidationError::Inconsistent {
                field: "initialAmount",
                reason: "nothing is invested".to_string(),
            });
        }
        count_in_range("years", self.years, 1, MAX_YEARS)?;
        count_in_range("trials", self.trials, 1, MAX_TRIALS)?;
        if let Some(guess) = self.guessed_median {
            non_negative("guessedMedian", guess)?;
        }
        catalog
            .asset_class(&self.asset_class)
            .ok_or_else(|| ValidationError::UnknownAssetClass(self.asset_class.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketYear {
    pub year: u32,
    pub expected_balance: f64,
    pub contributed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketResult {
    pub asset_class: AssetClass,
    pub distribution: MonteCarloOutcome,
    pub expected_path: Vec<MarketYear>,
    pub guessed_median: Option<f64>,
    pub score: f64,
}

pub fn compute(params: &MarketParams, catalog: &Catalog) -> Result<MarketResult, ValidationError> {
    let asset = params.validate(catalog)?;
    debug!(asset_class = %asset.id, years = params.years, "simulating market returns");

    let distribution = monte_carlo::run(&MonteCarloConfig {
        initial_amount: params.initial_amount,
        monthly_contribution: params.monthly_contribution,
        months: params.years * 12,
        annual_mean: asset.mean_return,
        annual_volatility: asset.volatility,
        trials: params.trials,
        seed: params.seed,
    });

    let expected_path = (1..=params.years)
        .map(|year| MarketYear {
            year,
            expected_balance: compound_balance(
                params.initial_amount,
                params.monthly_contribution,
                asset.mean_return / 12.0,
                year * 12,
            ),
            contributed: params.initial_amount
                + params.monthly_contribution * (year * 12) as f64,
        })
        .collect();

    let score = params
        .guessed_median
        .map_or(100.0, |guess| guess_accuracy_score(distribution.p50, guess));

    Ok(MarketResult {
        asset_class: asset.clone(),
        distribution,
        expected_path,
        guessed_median: params.guessed_median,
        score,
    })
}
