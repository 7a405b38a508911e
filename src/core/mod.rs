mod error;
pub mod math;
pub mod monte_carlo;
pub mod simulations;
mod types;

pub use error::{MAX_ANNUAL_RATE, ValidationError};
pub use simulations::credit_card::{NonConvergentResult, Payoff};
pub use types::{SimulationKind, SimulationOutcome, SimulationParameters, SimulationResult};

use tracing::debug;

use crate::catalog::Catalog;
use simulations::{
    budget, car_loan, compound_growth, credit_card, emergency_fund, habit_cost, market, paycheck,
};

pub fn compute_simulation(
    catalog: &Catalog,
    parameters: &SimulationParameters,
) -> Result<SimulationOutcome, ValidationError> {
    let kind = parameters.kind();
    debug!(simulation = %kind, "computing simulation");

    let result = match parameters {
        SimulationParameters::CoffeeShopEffect(p) => {
            SimulationResult::CoffeeShopEffect(habit_cost::compute(p)?)
        }
        SimulationParameters::PaycheckGame(p) => SimulationResult::PaycheckGame(paycheck::compute(p)?),
        SimulationParameters::BudgetBuilder(p) => SimulationResult::BudgetBuilder(budget::compute(p)?),
        SimulationParameters::EmergencyFund(p) => {
            SimulationResult::EmergencyFund(emergency_fund::compute(p)?)
        }
        SimulationParameters::CarPayment(p) => SimulationResult::CarPayment(car_loan::compute(p)?),
        SimulationParameters::CreditCardTrap(p) => match credit_card::compute(p)? {
            Payoff::PaidOff(result) => SimulationResult::CreditCardTrap(result),
            Payoff::NonConvergent(result) => {
                debug!(
                    minimum = result.minimum_payment_to_converge,
                    "payment never retires the balance"
                );
                return Ok(SimulationOutcome::NonConvergent(result));
            }
        },
        SimulationParameters::CompoundInterest(p) => {
            SimulationResult::CompoundInterest(compound_growth::compute(p)?)
        }
        SimulationParameters::MarketSimulator(p) => {
            SimulationResult::MarketSimulator(market::compute(p, catalog)?)
        }
    };

    debug!(simulation = %kind, score = result.score(), "simulation complete");
    Ok(SimulationOutcome::Completed(result))
}
