pub mod budget;
pub mod car_loan;
pub mod compound_growth;
pub mod credit_card;
pub mod emergency_fund;
pub mod habit_cost;
pub mod market;
pub mod paycheck;

/// 100 minus the percentage error of `guess` against `actual`, floored at zero.
pub(crate) fn guess_accuracy_score(actual: f64, guess: f64) -> f64 {
    if actual == 0.0 {
        return if guess == 0.0 { 100.0 } else { 0.0 };
    }
    (100.0 - (actual - guess).abs() / actual.abs() * 100.0).clamp(0.0, 100.0)
}
