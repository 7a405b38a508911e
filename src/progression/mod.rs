mod rules;
mod state;

pub use state::{
    CompletionEvent, InvariantViolation, LevelProgress, PERFECT_SCORE, ProgressionState,
    SimulationRecord,
};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{Catalog, Rarity};
use crate::core::SimulationKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    #[error("raw score {0} is outside 0..=100")]
    InvalidScore(u8),
    #[error("completion on {received} precedes last activity on {last}")]
    OutOfOrderEvent { last: NaiveDate, received: NaiveDate },
    #[error("progression state is inconsistent: {0}")]
    InvariantViolation(#[from] InvariantViolation),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    Started,
    Extended,
    Unchanged,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpAward {
    pub base_xp: u32,
    pub first_attempt_pct: u32,
    pub perfect_score_pct: u32,
    pub streak_pct: u32,
    pub xp: u64,
}

impl XpAward {
    pub fn bonus_pct(&self) -> u32 {
        self.first_attempt_pct
            .saturating_add(self.perfect_score_pct)
            .saturating_add(self.streak_pct)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressionEvent {
    #[serde(rename_all = "camelCase")]
    XpAwarded {
        simulation: SimulationKind,
        award: XpAward,
        total_xp: u64,
    },
    #[serde(rename_all = "camelCase")]
    LevelUp {
        old_level: u32,
        new_level: u32,
        old_display_name: String,
        new_display_name: String,
        unlocked_features: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    BadgeUnlocked {
        badge_id: String,
        name: String,
        rarity: Rarity,
    },
    #[serde(rename_all = "camelCase")]
    AchievementUnlocked {
        achievement_id: String,
        name: String,
        hidden: bool,
    },
    #[serde(rename_all = "camelCase")]
    StreakUpdated {
        change: StreakChange,
        current_streak_days: u32,
        longest_streak_days: u32,
    },
}

/// XP for `event`, using the streak as it stood before the event.
pub fn award_xp(catalog: &Catalog, state: &ProgressionState, event: &CompletionEvent) -> XpAward {
    let bonuses = catalog.bonuses();
    let base_xp = catalog.base_xp(event.simulation);
    let first_attempt_pct = if event.is_first_attempt {
        bonuses.first_attempt_pct
    } else {
        0
    };
    let perfect_score_pct = if event.raw_score >= bonuses.perfect_score_threshold {
        bonuses.perfect_score_pct
    } else {
        0
    };
    let streak_pct = bonuses.streak_bonus_pct(state.current_streak_days);
    let total_pct = 100
        + u64::from(first_attempt_pct)
        + u64::from(perfect_score_pct)
        + u64::from(streak_pct);
    XpAward {
        base_xp,
        first_attempt_pct,
        perfect_score_pct,
        streak_pct,
        xp: (u64::from(base_xp) * total_pct + 50) / 100,
    }
}

/// Applies one completed simulation to `state`.
///
/// The input state is never modified; on error no events are produced.
/// Events are ordered: XP, level-up, badges, achievements, streak.
pub fn apply_completion(
    catalog: &Catalog,
    state: &ProgressionState,
    event: &CompletionEvent,
) -> Result<(ProgressionState, Vec<ProgressionEvent>), ProgressionError> {
    if event.raw_score > PERFECT_SCORE {
        return Err(ProgressionError::InvalidScore(event.raw_score));
    }
    let today = event.completed_at.date();
    if let Some(last) = state.last_activity_date {
        if today < last {
            warn!(%last, received = %today, "rejecting out-of-order completion");
            return Err(ProgressionError::OutOfOrderEvent {
                last,
                received: today,
            });
        }
    }
    if let Err(violation) = state.check_invariants(catalog) {
        warn!(%violation, "progression invariant violated");
        return Err(violation.into());
    }

    let mut next = state.clone();
    let mut events = Vec::new();

    let award = award_xp(catalog, state, event);
    next.total_xp = next.total_xp.saturating_add(award.xp);
    events.push(ProgressionEvent::XpAwarded {
        simulation: event.simulation,
        award,
        total_xp: next.total_xp,
    });

    let old_level = state.level(catalog);
    let new_level = next.level(catalog);
    if new_level.level_id > old_level.level_id {
        info!(
            old = old_level.level_id,
            new = new_level.level_id,
            name = %new_level.display_name,
            "level up"
        );
        let unlocked_features = catalog
            .levels()
            .iter()
            .filter(|l| l.level_id > old_level.level_id && l.level_id <= new_level.level_id)
            .flat_map(|l| l.unlocked_features.iter().cloned())
            .collect();
        events.push(ProgressionEvent::LevelUp {
            old_level: old_level.level_id,
            new_level: new_level.level_id,
            old_display_name: old_level.display_name.clone(),
            new_display_name: new_level.display_name.clone(),
            unlocked_features,
        });
    }

    let record = next.simulation_history.entry(event.simulation).or_default();
    record.completions = record.completions.saturating_add(1);
    record.best_score = record.best_score.max(event.raw_score);

    let change = update_streak(&mut next, today);

    for badge in catalog.badges() {
        if next.unlocked_badge_ids.contains(&badge.id)
            || !rules::is_satisfied(&badge.rule, &next, new_level.level_id, event)
        {
            continue;
        }
        info!(badge = %badge.id, "badge unlocked");
        next.unlocked_badge_ids.insert(badge.id.clone());
        events.push(ProgressionEvent::BadgeUnlocked {
            badge_id: badge.id.clone(),
            name: badge.name.clone(),
            rarity: badge.rarity,
        });
    }
    for achievement in catalog.achievements() {
        if next.unlocked_achievement_ids.contains(&achievement.id)
            || !rules::is_satisfied(&achievement.rule, &next, new_level.level_id, event)
        {
            continue;
        }
        info!(achievement = %achievement.id, "achievement unlocked");
        next.unlocked_achievement_ids.insert(achievement.id.clone());
        events.push(ProgressionEvent::AchievementUnlocked {
            achievement_id: achievement.id.clone(),
            name: achievement.name.clone(),
            hidden: achievement.hidden,
        });
    }

    events.push(ProgressionEvent::StreakUpdated {
        change,
        current_streak_days: next.current_streak_days,
        longest_streak_days: next.longest_streak_days,
    });
    Ok((next, events))
}

fn update_streak(state: &mut ProgressionState, today: NaiveDate) -> StreakChange {
    let gap = state
        .last_activity_date
        .map(|last| today.signed_duration_since(last).num_days());
    let change = match gap {
        None => StreakChange::Started,
        Some(0) => StreakChange::Unchanged,
        Some(1) => StreakChange::Extended,
        Some(_) => StreakChange::Reset,
    };
    match change {
        StreakChange::Unchanged => {
            state.completions_on_last_activity_date =
                state.completions_on_last_activity_date.saturating_add(1);
        }
        StreakChange::Extended => {
            state.current_streak_days = state.current_streak_days.saturating_add(1);
            state.completions_on_last_activity_date = 1;
        }
        StreakChange::Started | StreakChange::Reset => {
            state.current_streak_days = 1;
            state.completions_on_last_activity_date = 1;
        }
    }
    state.longest_streak_days = state.longest_streak_days.max(state.current_streak_days);
    state.last_activity_date = Some(today);
    change
}
