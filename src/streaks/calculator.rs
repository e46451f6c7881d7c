use chrono::{DateTime, Utc};
use log::debug;

use crate::models::{CompletionRecord, StreakSummary};
use crate::streaks::StreakPolicy;

/// Summarise one habit's completions out of a user's full completion list.
///
/// Records for other habits are ignored and input order does not matter. The
/// reported `streak` is the run still open at the latest completion, which is
/// not necessarily the longest one.
pub fn compute_streaks(
    records: &[CompletionRecord],
    habit_id: &str,
    policy: &StreakPolicy,
) -> StreakSummary {
    let mut times: Vec<DateTime<Utc>> = records
        .iter()
        .filter(|r| r.habit_id == habit_id)
        .map(|r| r.completed_at)
        .collect();
    times.sort();

    let summary = summarize_sorted(&times, policy);
    debug!(
        "habit {}: {} completions, streak {}, best {}",
        habit_id, summary.total, summary.streak, summary.best_streak
    );
    summary
}

fn summarize_sorted(times: &[DateTime<Utc>], policy: &StreakPolicy) -> StreakSummary {
    if times.is_empty() {
        return StreakSummary::default();
    }

    let mut running = 1u32;
    let mut best = 1u32;
    for pair in times.windows(2) {
        if policy.is_consecutive(pair[0], pair[1]) {
            running += 1;
        } else {
            running = 1;
        }
        best = best.max(running);
    }

    StreakSummary {
        streak: running,
        best_streak: best,
        total: u32::try_from(times.len()).unwrap_or(u32::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn daily() -> StreakPolicy {
        StreakPolicy::rolling(36.0, Frequency::Daily)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn rec(id: &str, habit: &str, completed_at: DateTime<Utc>) -> CompletionRecord {
        CompletionRecord {
            id: id.to_string(),
            habit_id: habit.to_string(),
            user_id: "u1".to_string(),
            completed_at,
        }
    }

    fn on_days(habit: &str, days: &[u32]) -> Vec<CompletionRecord> {
        days.iter()
            .enumerate()
            .map(|(i, d)| rec(&format!("c{i}"), habit, at(*d, 9)))
            .collect()
    }

    fn summary(streak: u32, best_streak: u32, total: u32) -> StreakSummary {
        StreakSummary {
            streak,
            best_streak,
            total,
        }
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(compute_streaks(&[], "h1", &daily()), StreakSummary::default());
    }

    #[test]
    fn other_habits_only_is_zero() {
        let records = on_days("h2", &[1, 2, 3]);
        assert_eq!(compute_streaks(&records, "h1", &daily()), summary(0, 0, 0));
    }

    #[test]
    fn single_record() {
        let records = on_days("h1", &[4]);
        assert_eq!(compute_streaks(&records, "h1", &daily()), summary(1, 1, 1));
    }

    #[test]
    fn three_consecutive_days() {
        let records = on_days("h1", &[1, 2, 3]);
        assert_eq!(compute_streaks(&records, "h1", &daily()), summary(3, 3, 3));
    }

    #[test]
    fn gap_resets_current_but_keeps_best() {
        let records = on_days("h1", &[1, 2, 5]);
        assert_eq!(compute_streaks(&records, "h1", &daily()), summary(1, 2, 3));
    }

    #[test]
    fn current_run_can_become_best() {
        let records = on_days("h1", &[1, 2, 5, 6, 7]);
        assert_eq!(compute_streaks(&records, "h1", &daily()), summary(3, 3, 5));
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut records = on_days("h1", &[1, 2, 5, 6, 9, 10, 11]);
        records.extend(on_days("h2", &[3, 4]));
        let expected = compute_streaks(&records, "h1", &daily());
        assert_eq!(expected, summary(3, 3, 7));

        records.reverse();
        assert_eq!(compute_streaks(&records, "h1", &daily()), expected);
        for _ in 0..records.len() {
            records.rotate_left(3);
            assert_eq!(compute_streaks(&records, "h1", &daily()), expected);
        }
        records.swap(0, 4);
        records.swap(2, 7);
        assert_eq!(compute_streaks(&records, "h1", &daily()), expected);
    }

    #[test]
    fn identical_timestamps_are_consecutive() {
        let t = at(10, 12);
        let records = vec![rec("a", "h1", t), rec("b", "h1", t), rec("c", "h1", t)];
        assert_eq!(compute_streaks(&records, "h1", &daily()), summary(3, 3, 3));
    }

    #[test]
    fn loose_threshold_tolerates_clock_skew() {
        // 33 hours apart still counts, 37 hours does not
        let records = vec![
            rec("a", "h1", at(1, 8)),
            rec("b", "h1", at(1, 8) + Duration::hours(33)),
            rec("c", "h1", at(1, 8) + Duration::hours(70)),
        ];
        assert_eq!(compute_streaks(&records, "h1", &daily()), summary(1, 2, 3));
    }

    #[test]
    fn calendar_policy_counts_midnight_neighbours() {
        let utc0 = FixedOffset::east_opt(0).unwrap();
        let calendar = StreakPolicy::calendar(utc0, Frequency::Daily);
        let records = vec![
            rec("a", "h1", Utc.with_ymd_and_hms(2026, 3, 1, 0, 5, 0).unwrap()),
            rec("b", "h1", Utc.with_ymd_and_hms(2026, 3, 2, 23, 55, 0).unwrap()),
            rec("c", "h1", Utc.with_ymd_and_hms(2026, 3, 3, 23, 59, 0).unwrap()),
        ];
        // Rolling sees a 47h gap between a and b; calendar sees adjacent days
        assert_eq!(compute_streaks(&records, "h1", &daily()), summary(2, 2, 3));
        assert_eq!(compute_streaks(&records, "h1", &calendar), summary(3, 3, 3));
    }

    #[test]
    fn weekly_habits_use_weekly_window() {
        let weekly = StreakPolicy::rolling(36.0, Frequency::Weekly);
        let records = on_days("h1", &[1, 8, 14, 28]);
        assert_eq!(compute_streaks(&records, "h1", &weekly), summary(1, 3, 4));
    }

    #[test]
    fn summary_bounds_hold_for_generated_histories() {
        // Small LCG so the sample is reproducible
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as u32
        };

        for _ in 0..200 {
            let n = next() % 25;
            let records: Vec<CompletionRecord> = (0..n)
                .map(|i| {
                    let habit = if next() % 3 == 0 { "h2" } else { "h1" };
                    let offset = Duration::hours((next() % (24 * 20)) as i64);
                    rec(&format!("c{i}"), habit, at(1, 0) + offset)
                })
                .collect();
            let expected_total = records.iter().filter(|r| r.habit_id == "h1").count() as u32;

            let s = compute_streaks(&records, "h1", &daily());
            assert_eq!(s.total, expected_total);
            assert!(s.streak <= s.best_streak, "{s:?}");
            assert!(s.best_streak <= s.total, "{s:?}");
            if s.total > 0 {
                assert!(s.streak >= 1);
            }
        }
    }
}
