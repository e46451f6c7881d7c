use serde::{Deserialize, Serialize};

use crate::models::Habit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    /// Run still open at the most recent completion
    pub streak: u32,
    pub best_streak: u32,
    pub total: u32,
}

impl StreakSummary {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedHabit {
    pub habit: Habit,
    #[serde(flatten)]
    pub summary: StreakSummary,
}
