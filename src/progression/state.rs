use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Catalog, LevelDefinition};
use crate::core::SimulationKind;

pub const PERFECT_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRecord {
    pub completions: u32,
    pub best_score: u8,
}

/// A learner's progress. The level is derived from `total_xp` and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionState {
    pub total_xp: u64,
    pub unlocked_badge_ids: BTreeSet<String>,
    pub unlocked_achievement_ids: BTreeSet<String>,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub completions_on_last_activity_date: u32,
    pub simulation_history: BTreeMap<SimulationKind, SimulationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub simulation: SimulationKind,
    pub raw_score: u8,
    pub is_first_attempt: bool,
    pub completed_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("unlocked badge {0} is not in the catalog")]
    UnknownBadge(String),
    #[error("unlocked achievement {0} is not in the catalog")]
    UnknownAchievement(String),
    #[error("badge {badge} requires level {required} but total xp yields level {actual}")]
    BadgeAboveLevel {
        badge: String,
        required: u32,
        actual: u32,
    },
    #[error("current streak {current} exceeds longest streak {longest}")]
    StreakExceedsLongest { current: u32, longest: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: LevelDefinition,
    pub next_level_xp: Option<u64>,
    pub xp_to_next_level: Option<u64>,
    /// 100 at the top level.
    pub progress_percent: f64,
}

impl ProgressionState {
    pub fn level<'c>(&self, catalog: &'c Catalog) -> &'c LevelDefinition {
        catalog.level_for(self.total_xp)
    }

    pub fn level_progress(&self, catalog: &Catalog) -> LevelProgress {
        let level = self.level(catalog);
        let next = catalog
            .levels()
            .iter()
            .find(|candidate| candidate.min_xp > level.min_xp);
        let progress_percent = match next {
            Some(next) => {
                let span = (next.min_xp - level.min_xp) as f64;
                100.0 * (self.total_xp - level.min_xp) as f64 / span
            }
            None => 100.0,
        };
        LevelProgress {
            level: level.clone(),
            next_level_xp: next.map(|n| n.min_xp),
            xp_to_next_level: next.map(|n| n.min_xp - self.total_xp),
            progress_percent,
        }
    }

    pub fn total_completions(&self) -> u32 {
        self.simulation_history
            .values()
            .fold(0u32, |total, r| total.saturating_add(r.completions))
    }

    pub fn has_completed(&self, simulation: SimulationKind) -> bool {
        self.simulation_history
            .get(&simulation)
            .is_some_and(|r| r.completions > 0)
    }

    pub fn distinct_simulations(&self) -> u32 {
        self.simulation_history
            .values()
            .filter(|r| r.completions > 0)
            .count() as u32
    }

    pub fn perfect_simulations(&self) -> u32 {
        self.simulation_history
            .values()
            .filter(|r| r.best_score >= PERFECT_SCORE)
            .count() as u32
    }

    pub fn check_invariants(&self, catalog: &Catalog) -> Result<(), InvariantViolation> {
        if self.current_streak_days > self.longest_streak_days {
            return Err(InvariantViolation::StreakExceedsLongest {
                current: self.current_streak_days,
                longest: self.longest_streak_days,
            });
        }
        let actual = self.level(catalog).level_id;
        for id in &self.unlocked_badge_ids {
            let badge = catalog
                .badge(id)
                .ok_or_else(|| InvariantViolation::UnknownBadge(id.clone()))?;
            if let Some(required) = badge.rule.required_level() {
                if required > actual {
                    return Err(InvariantViolation::BadgeAboveLevel {
                        badge: id.clone(),
                        required,
                        actual,
                    });
                }
            }
        }
        if let Some(id) = self
            .unlocked_achievement_ids
            .iter()
            .find(|id| catalog.achievement(id).is_none())
        {
            return Err(InvariantViolation::UnknownAchievement(id.clone()));
        }
        Ok(())
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

    fn state_with_xp(total_xp: u64) -> ProgressionState {
        ProgressionState {
            total_xp,
            ..ProgressionState::default()
        }
    }

    #[test]
    fn new_state_is_first_level() {
        let catalog = Catalog::standard();
        let state = ProgressionState::default();
        assert_eq!(state.level(&catalog).display_name, "Financial Newbie");
        assert!(state.check_invariants(&catalog).is_ok());
    }

    #[test]
    fn level_progress_measures_distance_to_next_threshold() {
        let catalog = Catalog::standard();
        let progress = state_with_xp(2_000).level_progress(&catalog);
        assert_eq!(progress.level.level_id, 2);
        assert_eq!(progress.next_level_xp, Some(3_000));
        assert_eq!(progress.xp_to_next_level, Some(1_000));
        assert_approx(progress.progress_percent, 50.0);

        let top = state_with_xp(25_000).level_progress(&catalog);
        assert_eq!(top.next_level_xp, None);
        assert_approx(top.progress_percent, 100.0);
    }

    #[test]
    fn empty_state_deserializes_as_new_user() {
        let state: ProgressionState = serde_json::from_str("{}").expect("parse");
        assert_eq!(state, ProgressionState::default());
    }

    #[test]
    fn streak_longer_than_longest_is_a_violation() {
        let state = ProgressionState {
            current_streak_days: 5,
            longest_streak_days: 3,
            ..ProgressionState::default()
        };
        assert_eq!(
            state.check_invariants(&Catalog::standard()),
            Err(InvariantViolation::StreakExceedsLongest {
                current: 5,
                longest: 3
            })
        );
    }

    #[test]
    fn level_badge_without_the_xp_is_a_violation() {
        let mut state = state_with_xp(100);
        state.unlocked_badge_ids.insert("level_3_achieved".to_string());
        assert!(matches!(
            state.check_invariants(&Catalog::standard()),
            Err(InvariantViolation::BadgeAboveLevel { required: 3, actual: 1, .. })
        ));

        state.total_xp = 3_000;
        assert!(state.check_invariants(&Catalog::standard()).is_ok());
    }

    #[test]
    fn unknown_unlocks_are_violations() {
        let mut state = ProgressionState::default();
        state.unlocked_badge_ids.insert("golden_piggy".to_string());
        assert_eq!(
            state.check_invariants(&Catalog::standard()),
            Err(InvariantViolation::UnknownBadge("golden_piggy".to_string()))
        );

        let mut state = ProgressionState::default();
        state.unlocked_achievement_ids.insert("tutor_enthusiast".to_string());
        assert!(matches!(
            state.check_invariants(&Catalog::standard()),
            Err(InvariantViolation::UnknownAchievement(_))
        ));
    }
}
