use std::fmt;

use serde::{Deserialize, Serialize};

use super::simulations::budget::{BudgetParams, BudgetResult};
use super::simulations::car_loan::{CarLoanParams, CarLoanResult};
use super::simulations::compound_growth::{CompoundGrowthParams, CompoundGrowthResult};
use super::simulations::credit_card::{CreditCardParams, CreditCardResult, NonConvergentResult};
use super::simulations::emergency_fund::{EmergencyFundParams, EmergencyFundResult};
use super::simulations::habit_cost::{HabitCostParams, HabitCostResult};
use super::simulations::market::{MarketParams, MarketResult};
use super::simulations::paycheck::{PaycheckParams, PaycheckResult};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationKind {
    CoffeeShopEffect,
    PaycheckGame,
    BudgetBuilder,
    EmergencyFund,
    CarPayment,
    CreditCardTrap,
    CompoundInterest,
    MarketSimulator,
}

impl SimulationKind {
    pub const ALL: [SimulationKind; 8] = [
        SimulationKind::CoffeeShopEffect,
        SimulationKind::PaycheckGame,
        SimulationKind::BudgetBuilder,
        SimulationKind::EmergencyFund,
        SimulationKind::CarPayment,
        SimulationKind::CreditCardTrap,
        SimulationKind::CompoundInterest,
        SimulationKind::MarketSimulator,
    ];

    pub fn id(self) -> &'static str {
        match self {
            SimulationKind::CoffeeShopEffect => "coffee_shop_effect",
            SimulationKind::PaycheckGame => "paycheck_game",
            SimulationKind::BudgetBuilder => "budget_builder",
            SimulationKind::EmergencyFund => "emergency_fund",
            SimulationKind::CarPayment => "car_payment",
            SimulationKind::CreditCardTrap => "credit_card_trap",
            SimulationKind::CompoundInterest => "compound_interest",
            SimulationKind::MarketSimulator => "market_simulator",
        }
    }
}

impl fmt::Display for SimulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "simulation", rename_all = "snake_case")]
pub enum SimulationParameters {
    CoffeeShopEffect(HabitCostParams),
    PaycheckGame(PaycheckParams),
    BudgetBuilder(BudgetParams),
    EmergencyFund(EmergencyFundParams),
    CarPayment(CarLoanParams),
    CreditCardTrap(CreditCardParams),
    CompoundInterest(CompoundGrowthParams),
    MarketSimulator(MarketParams),
}

impl SimulationParameters {
    pub fn kind(&self) -> SimulationKind {
        match self {
            SimulationParameters::CoffeeShopEffect(_) => SimulationKind::CoffeeShopEffect,
            SimulationParameters::PaycheckGame(_) => SimulationKind::PaycheckGame,
            SimulationParameters::BudgetBuilder(_) => SimulationKind::BudgetBuilder,
            SimulationParameters::EmergencyFund(_) => SimulationKind::EmergencyFund,
            SimulationParameters::CarPayment(_) => SimulationKind::CarPayment,
            SimulationParameters::CreditCardTrap(_) => SimulationKind::CreditCardTrap,
            SimulationParameters::CompoundInterest(_) => SimulationKind::CompoundInterest,
            SimulationParameters::MarketSimulator(_) => SimulationKind::MarketSimulator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "simulation", rename_all = "snake_case")]
pub enum SimulationResult {
    CoffeeShopEffect(HabitCostResult),
    PaycheckGame(PaycheckResult),
    BudgetBuilder(BudgetResult),
    EmergencyFund(EmergencyFundResult),
    CarPayment(CarLoanResult),
    CreditCardTrap(CreditCardResult),
    CompoundInterest(CompoundGrowthResult),
    MarketSimulator(MarketResult),
}

impl SimulationResult {
    pub fn score(&self) -> f64 {
        match self {
            SimulationResult::CoffeeShopEffect(r) => r.score,
            SimulationResult::PaycheckGame(r) => r.score,
            SimulationResult::BudgetBuilder(r) => r.score,
            SimulationResult::EmergencyFund(r) => r.score,
            SimulationResult::CarPayment(r) => r.score,
            SimulationResult::CreditCardTrap(r) => r.score,
            SimulationResult::CompoundInterest(r) => r.score,
            SimulationResult::MarketSimulator(r) => r.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "outcome", rename_all = "kebab-case")]
pub enum SimulationOutcome {
    Completed(SimulationResult),
    NonConvergent(NonConvergentResult),
}

impl SimulationOutcome {
    pub fn score(&self) -> f64 {
        match self {
            SimulationOutcome::Completed(result) => result.score(),
            SimulationOutcome::NonConvergent(result) => result.score(),
        }
    }

    /// Score as the whole number a completion event carries.
    pub fn completion_score(&self) -> u8 {
        self.score().round().clamp(0.0, 100.0) as u8
    }
}
