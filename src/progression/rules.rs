use chrono::Timelike;

use super::state::{CompletionEvent, ProgressionState};
use crate::catalog::UnlockRule;

/// Checks `rule` against a state that already includes `event`.
pub(crate) fn is_satisfied(
    rule: &UnlockRule,
    state: &ProgressionState,
    level_id: u32,
    event: &CompletionEvent,
) -> bool {
    match rule {
        UnlockRule::CompleteSimulation { simulation } => state.has_completed(*simulation),
        UnlockRule::CompleteAll { simulations } => {
            simulations.iter().all(|s| state.has_completed(*s))
        }
        UnlockRule::TotalCompletions { count } => state.total_completions() >= *count,
        UnlockRule::DistinctSimulations { count } => state.distinct_simulations() >= *count,
        UnlockRule::StreakAtLeast { days } => state.current_streak_days >= *days,
        UnlockRule::LevelAtLeast { level } => level_id >= *level,
        UnlockRule::PerfectScore => state.perfect_simulations() >= 1,
        UnlockRule::PerfectScoresOnDistinct { count } => state.perfect_simulations() >= *count,
        UnlockRule::CompletionsInOneDay { count } => {
            state.completions_on_last_activity_date >= *count
        }
        UnlockRule::CompletedBeforeHour { hour } => event.completed_at.hour() < *hour,
        UnlockRule::CompletedFromHour { hour } => event.completed_at.hour() >= *hour,
    }
}
