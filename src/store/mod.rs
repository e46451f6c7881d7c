//! Storage boundary for habits and completions.
//!
//! Everything above this module works on typed records; rows are decoded here
//! and a record that fails to decode stops the operation.

pub mod feed;
pub mod sqlite;

pub use feed::{Callback, ChangeEvent, ChangeFeed, ChangeKind, Collection, Subscription};
pub use sqlite::SqliteStore;

use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{CompletionRecord, Frequency, Habit};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No habit matches '{0}'")]
    HabitNotFound(String),
    #[error("'{query}' matches {matches} habits; use more of the title or the id")]
    AmbiguousHabit { query: String, matches: usize },
    #[error("{title} is already done {period}")]
    AlreadyCompleted { title: String, period: &'static str },
    #[error("Habit title must not be empty")]
    EmptyTitle,
}

#[derive(Debug, Clone)]
pub struct NewHabit {
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
}

pub trait HabitStore {
    fn create_habit(&self, session: &Session, draft: NewHabit) -> Result<Habit>;

    fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>>;

    /// Resolve a habit by id, id prefix or title (case-insensitive).
    fn find_habit(&self, user_id: &str, query: &str) -> Result<Habit>;

    /// Delete a habit and every completion recorded for it.
    fn delete_habit(&self, session: &Session, habit_id: &str) -> Result<()>;
}

pub trait CompletionStore {
    fn list_completions(&self, user_id: &str) -> Result<Vec<CompletionRecord>>;

    /// Record that `habit` was done at `at`. Refused if the habit already has a
    /// completion in the same period.
    fn record_completion(
        &self,
        session: &Session,
        habit: &Habit,
        at: DateTime<Utc>,
    ) -> Result<CompletionRecord>;

    fn subscribe(&self, collection: Collection, callback: Callback) -> Subscription;
}
