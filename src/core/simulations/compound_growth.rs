use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{ValidationError, annual_rate, count_in_range, non_negative};

pub const MAX_PROFILES: usize = 8;
pub const MAX_AGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorProfile {
    pub name: String,
    pub start_age: u32,
    pub monthly_contribution: f64,
    pub contribution_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundGrowthParams {
    pub annual_rate: f64,
    pub horizon_age: u32,
    pub profiles: Vec<ContributorProfile>,
    pub predicted_winner: String,
}

impl CompoundGrowthParams {
    /// Ten early years against thirty late ones at the same monthly amount.
    pub fn classic(predicted_winner: &str) -> Self {
        Self {
            annual_rate: 0.08,
            horizon_age: 65,
            profiles: vec![
                ContributorProfile {
                    name: "Early saver".to_string(),
                    start_age: 25,
                    monthly_contribution: 200.0,
                    contribution_years: 10,
                },
                ContributorProfile {
                    name: "Late saver".to_string(),
                    start_age: 35,
                    monthly_contribution: 200.0,
                    contribution_years: 30,
                },
            ],
            predicted_winner: predicted_winner.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        annual_rate("annualRate", self.annual_rate)?;
        count_in_range("horizonAge", self.horizon_age, 1, MAX_AGE)?;
        if self.profiles.is_empty() {
            return Err(ValidationError::Empty { field: "profiles" });
        }
        if self.profiles.len() > MAX_PROFILES {
            return Err(ValidationError::TooMany {
                field: "profiles",
                max: MAX_PROFILES,
                count: self.profiles.len(),
            });
        }
        for (i, profile) in self.profiles.iter().enumerate() {
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ValidationError::Duplicate {
                    field: "profiles.name",
                    value: profile.name.clone(),
                });
            }
            non_negative("profiles.monthlyContribution", profile.monthly_contribution)?;
            count_in_range("profiles.startAge", profile.start_age, 0, MAX_AGE)?;
            count_in_range("profiles.contributionYears", profile.contribution_years, 1, MAX_AGE)?;
            if profile.start_age + profile.contribution_years > self.horizon_age {
                return Err(ValidationError::Inconsistent {
                    field: "profiles.contributionYears",
                    reason: format!("{} contributes past the horizon age", profile.name),
                });
            }
        }
        if !self.profiles.iter().any(|p| p.name == self.predicted_winner) {
            return Err(ValidationError::UnknownProfile(self.predicted_winner.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPoint {
    pub age: u32,
    pub balance: f64,
    pub contributed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileProjection {
    pub name: String,
    pub total_contributed: f64,
    pub final_value: f64,
    pub growth: f64,
    pub rank: u32,
    pub timeline: Vec<GrowthPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundGrowthResult {
    pub first_age: u32,
    pub horizon_age: u32,
    pub profiles: Vec<ProfileProjection>,
    pub winner: String,
    pub predicted_winner: String,
    pub score: f64,
}

pub fn compute(params: &CompoundGrowthParams) -> Result<CompoundGrowthResult, ValidationError> {
    params.validate()?;
    debug!(profiles = params.profiles.len(), "comparing compound growth");

    let first_age = params
        .profiles
        .iter()
        .map(|p| p.start_age)
        .min()
        .unwrap_or(params.horizon_age);
    let monthly_rate = params.annual_rate / 12.0;

    let mut profiles: Vec<ProfileProjection> = params
        .profiles
        .iter()
        .map(|profile| project(profile, monthly_rate, first_age, params.horizon_age))
        .collect();

    let finals: Vec<f64> = profiles.iter().map(|p| p.final_value).collect();
    for projection in &mut profiles {
        projection.rank = 1 + finals.iter().filter(|&&v| v > projection.final_value).count() as u32;
    }

    let winner = profiles
        .iter()
        .find(|p| p.rank == 1)
        .map(|p| (p.name.clone(), p.final_value))
        .unwrap_or_default();
    let predicted_final = profiles
        .iter()
        .find(|p| p.name == params.predicted_winner)
        .map_or(0.0, |p| p.final_value);
    let score = if winner.1 > 0.0 {
        100.0 * predicted_final / winner.1
    } else {
        100.0
    };

    Ok(CompoundGrowthResult {
        first_age,
        horizon_age: params.horizon_age,
        profiles,
        winner: winner.0,
        predicted_winner: params.predicted_winner.clone(),
        score,
    })
}

fn project(
    profile: &ContributorProfile,
    monthly_rate: f64,
    first_age: u32,
    horizon_age: u32,
) -> ProfileProjection {
    let contribution_months = profile.contribution_years * 12;
    let mut balance = 0.0;
    let mut contributed = 0.0;
    let mut timeline = Vec::with_capacity((horizon_age - first_age) as usize);

    for age in first_age..horizon_age {
        if age >= profile.start_age {
            let months_in = (age - profile.start_age) * 12;
            for month in months_in..months_in + 12 {
                if month < contribution_months {
                    balance += profile.monthly_contribution;
                    contributed += profile.monthly_contribution;
                }
                balance *= 1.0 + monthly_rate;
            }
        }
        timeline.push(GrowthPoint {
            age: age + 1,
            balance,
            contributed,
        });
    }

    ProfileProjection {
        name: profile.name.clone(),
        total_contributed: contributed,
        final_value: balance,
        growth: balance - contributed,
        rank: 0,
        timeline,
    }
}
