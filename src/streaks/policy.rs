use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc};

use crate::models::Frequency;

/// Decides whether two completions, in chronological order, belong to the same run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreakPolicy {
    /// Consecutive when the elapsed time between them is at most `max_gap`.
    Rolling { max_gap: Duration },
    /// Consecutive when they fall in the same or adjacent local period.
    Calendar {
        offset: FixedOffset,
        frequency: Frequency,
    },
}

impl StreakPolicy {
    /// Rolling window of `hours` per period, scaled by the habit frequency.
    pub fn rolling(hours: f64, frequency: Frequency) -> Self {
        let millis = (hours * 3_600_000.0 * frequency.period_days() as f64).round() as i64;
        StreakPolicy::Rolling {
            max_gap: Duration::milliseconds(millis.max(0)),
        }
    }

    pub fn calendar(offset: FixedOffset, frequency: Frequency) -> Self {
        StreakPolicy::Calendar { offset, frequency }
    }

    pub fn is_consecutive(&self, prev: DateTime<Utc>, next: DateTime<Utc>) -> bool {
        match self {
            StreakPolicy::Rolling { max_gap } => {
                let gap = next - prev;
                gap >= Duration::zero() && gap <= *max_gap
            }
            StreakPolicy::Calendar { offset, frequency } => {
                let step = period_index(next, *offset, *frequency)
                    - period_index(prev, *offset, *frequency);
                (0..=1).contains(&step)
            }
        }
    }
}

/// Monotonic index of the local day, ISO week or month that `ts` falls in.
pub fn period_index(ts: DateTime<Utc>, offset: FixedOffset, frequency: Frequency) -> i64 {
    let date = ts.with_timezone(&offset).date_naive();
    match frequency {
        Frequency::Daily => date.num_days_from_ce() as i64,
        Frequency::Weekly => {
            let monday = date.num_days_from_ce() as i64
                - date.weekday().num_days_from_monday() as i64;
            monday.div_euclid(7)
        }
        Frequency::Monthly => date.year() as i64 * 12 + date.month0() as i64,
    }
}

pub fn same_period(
    a: DateTime<Utc>,
    b: DateTime<Utc>,
    offset: FixedOffset,
    frequency: Frequency,
) -> bool {
    period_index(a, offset, frequency) == period_index(b, offset, frequency)
}
