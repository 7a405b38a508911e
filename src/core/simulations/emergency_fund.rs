use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{ValidationError, annual_rate, count_in_range, non_negative, positive};

pub const HORIZON_MONTHS: u32 = 12;
pub const DEFAULT_CREDIT_CARD_APR: f64 = 0.22;
const MAX_DEPENDENTS: u32 = 10;
const HANDLED_STRESS: u8 = 3;
const ON_CARD_STRESS: u8 = 8;
const CALM_STRESS: u8 = 2;
const THIN_CUSHION_STRESS: u8 = 5;
const CALM_CUSHION: f64 = 1_000.0;
const DEBT_STRESS_PENALTY: u8 = 2;
const MAX_STRESS: u8 = 10;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmergencyKind {
    CarRepair,
    Medical,
    HomeRepair,
    Appliance,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

impl Severity {
    fn of(cost: f64) -> Self {
        if cost < 500.0 {
            Severity::Minor
        } else if cost < 1_000.0 {
            Severity::Moderate
        } else {
            Severity::Major
        }
    }
}

/// The narrative schedule: (month, kind, cost).
pub const FIXED_EMERGENCIES: [(u32, EmergencyKind, f64); 4] = [
    (2, EmergencyKind::CarRepair, 450.0),
    (5, EmergencyKind::Medical, 800.0),
    (8, EmergencyKind::CarRepair, 1_200.0),
    (11, EmergencyKind::Appliance, 350.0),
];

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStability {
    #[default]
    Stable,
    Variable,
    Unstable,
}

fn default_apr() -> f64 {
    DEFAULT_CREDIT_CARD_APR
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyFundParams {
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub monthly_fund_contribution: f64,
    #[serde(default = "default_apr")]
    pub credit_card_apr: f64,
    /// Places the emergencies on seeded months instead of the fixed schedule.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub employment: EmploymentStability,
    #[serde(default)]
    pub dependents: u32,
}

impl EmergencyFundParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        positive("monthlyIncome", self.monthly_income)?;
        non_negative("monthlyExpenses", self.monthly_expenses)?;
        non_negative("monthlyFundContribution", self.monthly_fund_contribution)?;
        annual_rate("creditCardApr", self.credit_card_apr)?;
        count_in_range("dependents", self.dependents, 0, MAX_DEPENDENTS)?;
        let surplus = self.monthly_income - self.monthly_expenses;
        if self.monthly_fund_contribution > surplus {
            return Err(ValidationError::Inconsistent {
                field: "monthlyFundContribution",
                reason: format!("exceeds monthly surplus of {surplus:.2}"),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Emergency {
    pub month: u32,
    pub kind: EmergencyKind,
    pub cost: f64,
    pub severity: Severity,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Saver,
    Spender,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorMonth {
    pub month: u32,
    pub emergency_cost: f64,
    pub paid_from_fund: f64,
    pub charged_to_card: f64,
    pub interest: f64,
    pub fund_balance: f64,
    pub card_debt: f64,
    pub net_worth: f64,
    pub stress: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorOutcome {
    pub actor: Actor,
    pub monthly_contribution: f64,
    pub months: Vec<ActorMonth>,
    pub final_fund: f64,
    pub final_debt: f64,
    pub total_interest: f64,
    pub net_worth: f64,
    pub average_stress: f64,
    pub success_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundTarget {
    pub minimum_months: u32,
    pub target_months: u32,
    pub minimum: f64,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyFundResult {
    pub emergencies: Vec<Emergency>,
    pub saver: ActorOutcome,
    pub spender: ActorOutcome,
    pub net_worth_difference: f64,
    pub interest_avoided: f64,
    pub fund_target: FundTarget,
    pub score: f64,
}

pub fn compute(params: &EmergencyFundParams) -> Result<EmergencyFundResult, ValidationError> {
    params.validate()?;
    debug!(seeded = params.seed.is_some(), "running emergency fund ledger");

    let emergencies = schedule(params.seed);
    let saver = run_actor(
        Actor::Saver,
        params.monthly_fund_contribution,
        params.credit_card_apr,
        &emergencies,
    );
    let spender = run_actor(Actor::Spender, 0.0, params.credit_card_apr, &emergencies);

    Ok(EmergencyFundResult {
        net_worth_difference: saver.net_worth - spender.net_worth,
        interest_avoided: spender.total_interest - saver.total_interest,
        fund_target: fund_target(params.monthly_expenses, params.employment, params.dependents),
        score: saver.success_score,
        emergencies,
        saver,
        spender,
    })
}

pub fn schedule(seed: Option<u64>) -> Vec<Emergency> {
    let months: Vec<u32> = match seed {
        None => FIXED_EMERGENCIES.iter().map(|&(month, _, _)| month).collect(),
        Some(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut picked: Vec<u32> =
                index::sample(&mut rng, HORIZON_MONTHS as usize, FIXED_EMERGENCIES.len())
                    .into_iter()
                    .map(|i| i as u32 + 1)
                    .collect();
            picked.sort_unstable();
            picked
        }
    };

    months
        .into_iter()
        .zip(FIXED_EMERGENCIES)
        .map(|(month, (_, kind, cost))| Emergency {
            month,
            kind,
            cost,
            severity: Severity::of(cost),
        })
        .collect()
}

fn run_actor(actor: Actor, contribution: f64, apr: f64, emergencies: &[Emergency]) -> ActorOutcome {
    let monthly_rate = apr / 12.0;
    let mut fund = 0.0;
    let mut debt = 0.0;
    let mut total_interest = 0.0;
    let mut months = Vec::with_capacity(HORIZON_MONTHS as usize);

    for month in 1..=HORIZON_MONTHS {
        let to_debt = contribution.min(debt);
        debt -= to_debt;
        fund += contribution - to_debt;

        let cost = emergencies
            .iter()
            .filter(|e| e.month == month)
            .map(|e| e.cost)
            .sum::<f64>();
        let (paid_from_fund, charged_to_card, mut stress) = if cost == 0.0 {
            let calm = if fund > CALM_CUSHION {
                CALM_STRESS
            } else {
                THIN_CUSHION_STRESS
            };
            (0.0, 0.0, calm)
        } else if fund >= cost {
            fund -= cost;
            (cost, 0.0, HANDLED_STRESS)
        } else {
            let from_fund = fund;
            fund = 0.0;
            debt += cost - from_fund;
            (from_fund, cost - from_fund, ON_CARD_STRESS)
        };

        let interest = debt * monthly_rate;
        debt += interest;
        total_interest += interest;
        if debt > 0.0 {
            stress = (stress + DEBT_STRESS_PENALTY).min(MAX_STRESS);
        }

        months.push(ActorMonth {
            month,
            emergency_cost: cost,
            paid_from_fund,
            charged_to_card,
            interest,
            fund_balance: fund,
            card_debt: debt,
            net_worth: fund - debt,
            stress,
        });
    }

    let average_stress =
        months.iter().map(|m| m.stress as f64).sum::<f64>() / months.len() as f64;
    ActorOutcome {
        actor,
        monthly_contribution: contribution,
        final_fund: fund,
        final_debt: debt,
        total_interest,
        net_worth: fund - debt,
        average_stress,
        success_score: success_score(fund, debt, total_interest),
        months,
    }
}

pub fn success_score(fund: f64, debt: f64, interest: f64) -> f64 {
    let score = 100.0 - (debt / 50.0).min(50.0) - (interest / 10.0).min(30.0) + (fund / 100.0).min(20.0);
    score.clamp(0.0, 100.0)
}

pub fn fund_target(monthly_expenses: f64, employment: EmploymentStability, dependents: u32) -> FundTarget {
    let (minimum_months, base_target) = match employment {
        EmploymentStability::Stable => (3, 6),
        EmploymentStability::Variable => (6, 9),
        EmploymentStability::Unstable => (9, 12),
    };
    let target_months = base_target + dependents;
    FundTarget {
        minimum_months,
        target_months,
        minimum: monthly_expenses * minimum_months as f64,
        target: monthly_expenses * target_months as f64,
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

    fn sample_params() -> EmergencyFundParams {
        EmergencyFundParams {
            monthly_income: 3_500.0,
            monthly_expenses: 2_800.0,
            monthly_fund_contribution: 500.0,
            credit_card_apr: DEFAULT_CREDIT_CARD_APR,
            seed: None,
            employment: EmploymentStability::Stable,
            dependents: 0,
        }
    }

    #[test]
    fn default_schedule_is_the_fixed_narrative() {
        let months: Vec<u32> = schedule(None).iter().map(|e| e.month).collect();
        assert_eq!(months, vec![2, 5, 8, 11]);
        assert_eq!(schedule(None)[2].severity, Severity::Major);
    }

    #[test]
    fn saver_absorbs_every_emergency_from_the_fund() {
        let result = compute(&sample_params()).expect("valid");
        let saver = &result.saver;
        assert_eq!(saver.months.len(), HORIZON_MONTHS as usize);
        assert_eq!(saver.final_debt, 0.0);
        assert_approx(saver.final_fund, 12.0 * 500.0 - (450.0 + 800.0 + 1_200.0 + 350.0));
        assert_eq!(saver.months[1].stress, HANDLED_STRESS);
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn spender_carries_growing_card_debt() {
        let result = compute(&sample_params()).expect("valid");
        let spender = &result.spender;
        assert!(spender.final_debt > 2_800.0);
        assert!(spender.total_interest > 0.0);
        assert_eq!(spender.months[0].stress, THIN_CUSHION_STRESS);
        assert_eq!(spender.months[1].stress, MAX_STRESS);
        for pair in spender.months.windows(2) {
            assert!(pair[1].card_debt >= pair[0].card_debt);
        }
        assert!(result.net_worth_difference > 0.0);
        assert!(result.interest_avoided > 0.0);
        assert!(spender.average_stress > result.saver.average_stress);
    }

    #[test]
    fn thin_fund_pays_what_it_can_and_charges_the_rest() {
        let mut params = sample_params();
        params.monthly_fund_contribution = 100.0;
        let result = compute(&params).expect("valid");
        let month_two = &result.saver.months[1];
        assert_approx(month_two.paid_from_fund, 200.0);
        assert_approx(month_two.charged_to_card, 250.0);
        assert_approx(month_two.interest, 250.0 * 0.22 / 12.0);
        assert_eq!(month_two.fund_balance, 0.0);

        let month_three = &result.saver.months[2];
        assert_approx(month_three.card_debt, (250.0 + month_two.interest - 100.0) * (1.0 + 0.22 / 12.0));
    }

    #[test]
    fn seeded_schedule_is_reproducible_and_distinct() {
        let a = schedule(Some(7));
        let b = schedule(Some(7));
        assert_eq!(a, b);
        let months: Vec<u32> = a.iter().map(|e| e.month).collect();
        assert!(months.windows(2).all(|w| w[0] < w[1]));
        assert!(months.iter().all(|m| (1..=HORIZON_MONTHS).contains(m)));
        let costs: Vec<f64> = a.iter().map(|e| e.cost).collect();
        assert_eq!(costs, vec![450.0, 800.0, 1_200.0, 350.0]);
    }

    #[test]
    fn success_score_follows_debt_interest_and_fund_terms() {
        assert_approx(success_score(0.0, 0.0, 0.0), 100.0);
        assert_approx(success_score(0.0, 1_000.0, 100.0), 100.0 - 20.0 - 10.0);
        assert_approx(success_score(500.0, 5_000.0, 400.0), 100.0 - 50.0 - 30.0 + 5.0);
    }

    #[test]
    fn fund_target_scales_with_stability_and_dependents() {
        let target = fund_target(2_000.0, EmploymentStability::Variable, 2);
        assert_eq!(target.minimum_months, 6);
        assert_eq!(target.target_months, 11);
        assert_approx(target.target, 22_000.0);
    }

    #[test]
    fn contribution_above_surplus_is_rejected() {
        let mut params = sample_params();
        params.monthly_fund_contribution = 900.0;
        assert!(matches!(
            compute(&params),
            Err(ValidationError::Inconsistent { .. })
        ));
    }
}
