use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn all() -> Vec<Frequency> {
        vec![Frequency::Daily, Frequency::Weekly, Frequency::Monthly]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
        }
    }

    /// Nominal length of one period in days. Used to scale the rolling window.
    pub fn period_days(&self) -> i64 {
        match self {
            Frequency::Daily => 1,
            Frequency::Weekly => 7,
            Frequency::Monthly => 30,
        }
    }

    /// Word used for streak units in badges ("3 days", "2 weeks").
    pub fn unit(&self, n: u32) -> &'static str {
        match (self, n == 1) {
            (Frequency::Daily, true) => "day",
            (Frequency::Daily, false) => "days",
            (Frequency::Weekly, true) => "week",
            (Frequency::Weekly, false) => "weeks",
            (Frequency::Monthly, true) => "month",
            (Frequency::Monthly, false) => "months",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(Frequency::Daily),
            "weekly" | "week" | "w" => Ok(Frequency::Weekly),
            "monthly" | "month" | "m" => Ok(Frequency::Monthly),
            _ => Err(anyhow::anyhow!("Unknown frequency: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
    /// Cached from the last completion; the completion log is authoritative
    pub streak_count: u32,
    pub last_completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_parses_aliases() {
        assert_eq!(Frequency::from_str("Weekly").unwrap(), Frequency::Weekly);
        assert_eq!(Frequency::from_str("d").unwrap(), Frequency::Daily);
        assert_eq!(Frequency::from_str("month").unwrap(), Frequency::Monthly);
        assert!(Frequency::from_str("hourly").is_err());
    }

    #[test]
    fn frequency_units_pluralise() {
        assert_eq!(Frequency::Daily.unit(1), "day");
        assert_eq!(Frequency::Daily.unit(0), "days");
        assert_eq!(Frequency::Weekly.unit(3), "weeks");
    }
}
