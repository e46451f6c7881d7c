use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{CompletionRecord, Frequency, Habit, RankedHabit};
use crate::streaks::{StreakPolicy, compute_streaks};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankOrder {
    #[default]
    Desc,
    Asc,
}

impl RankOrder {
    pub fn toggled(self) -> Self {
        match self {
            RankOrder::Desc => RankOrder::Asc,
            RankOrder::Asc => RankOrder::Desc,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RankOrder::Desc => "best first",
            RankOrder::Asc => "weakest first",
        }
    }
}

/// Compute a summary for every habit and order them by best streak.
///
/// Ties fall back to the current streak in the same direction, then title.
pub fn rank_habits<F>(
    habits: &[Habit],
    completions: &[CompletionRecord],
    policy_for: F,
    order: RankOrder,
) -> Vec<RankedHabit>
where
    F: Fn(Frequency) -> StreakPolicy,
{
    let mut ranked: Vec<RankedHabit> = habits
        .iter()
        .map(|habit| RankedHabit {
            summary: compute_streaks(completions, &habit.id, &policy_for(habit.frequency)),
            habit: habit.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| {
        let by_streaks = a
            .summary
            .best_streak
            .cmp(&b.summary.best_streak)
            .then(a.summary.streak.cmp(&b.summary.streak));
        let by_streaks = match order {
            RankOrder::Asc => by_streaks,
            RankOrder::Desc => by_streaks.reverse(),
        };
        match by_streaks {
            Ordering::Equal => a.habit.title.to_lowercase().cmp(&b.habit.title.to_lowercase()),
            other => other,
        }
    });
    ranked
}
