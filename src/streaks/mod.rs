pub mod calculator;
pub mod policy;
pub mod ranking;

pub use calculator::compute_streaks;
pub use policy::{StreakPolicy, same_period};
pub use ranking::{RankOrder, rank_habits};
