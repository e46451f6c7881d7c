use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::Connection;
use std::cell::Cell;
use std::collections::HashSet;
use ulid::Ulid;

use crate::config::settings::StreakConfig;
use crate::db::repository::{CompletionRepo, HabitRepo};
use crate::models::{CompletionDocument, CompletionRecord, Frequency, Habit, IngestError, RawCompletion};
use crate::session::Session;
use crate::store::{
    Callback, ChangeEvent, ChangeFeed, ChangeKind, Collection, CompletionStore, HabitStore,
    NewHabit, StoreError, Subscription,
};
use crate::streaks::{compute_streaks, same_period};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// SQLite-backed store. Every mutation is announced on the change feed.
pub struct SqliteStore {
    conn: Connection,
    streak: StreakConfig,
    feed: ChangeFeed,
    data_version: Cell<i64>,
}

fn read_data_version(conn: &Connection) -> Result<i64> {
    conn.query_row("PRAGMA data_version", [], |row| row.get(0))
        .map_err(anyhow::Error::from)
}

fn period_word(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Daily => "for that day",
        Frequency::Weekly => "for that week",
        Frequency::Monthly => "for that month",
    }
}

impl SqliteStore {
    pub fn new(conn: Connection, streak: StreakConfig) -> Result<Self> {
        let version = read_data_version(&conn)?;
        Ok(Self {
            conn,
            streak,
            feed: ChangeFeed::new(),
            data_version: Cell::new(version),
        })
    }

    #[cfg(test)]
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn streak_config(&self) -> &StreakConfig {
        &self.streak
    }

    /// Check whether another process committed to the database since the last
    /// poll and, if so, announce it to both collections.
    pub fn poll_external(&self) -> Result<bool> {
        let version = read_data_version(&self.conn)?;
        if version == self.data_version.replace(version) {
            return Ok(false);
        }
        debug!("database changed externally (data_version {})", version);
        self.feed
            .publish(&ChangeEvent::bulk(Collection::Habits, ChangeKind::Update));
        self.feed
            .publish(&ChangeEvent::bulk(Collection::Completions, ChangeKind::Update));
        Ok(true)
    }

    /// Load backend completion documents for the signed-in user.
    ///
    /// All documents are validated before anything is written; one bad
    /// document rejects the whole batch. Ids already present are skipped.
    pub fn import_completions(
        &self,
        session: &Session,
        docs: Vec<CompletionDocument>,
    ) -> Result<ImportReport> {
        let owned: HashSet<String> = self
            .list_habits(&session.user_id)?
            .into_iter()
            .map(|h| h.id)
            .collect();

        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            let record = CompletionRecord::try_from(RawCompletion::from(doc))?;
            if record.user_id != session.user_id {
                return Err(IngestError::ForeignRecord {
                    id: record.id,
                    user_id: record.user_id,
                }
                .into());
            }
            if !owned.contains(&record.habit_id) {
                return Err(IngestError::UnknownHabit {
                    id: record.id,
                    habit_id: record.habit_id,
                }
                .into());
            }
            records.push(record);
        }

        let mut report = ImportReport::default();
        let mut touched = HashSet::new();
        let tx = self.conn.unchecked_transaction()?;
        for record in &records {
            if CompletionRepo::exists(&tx, &record.id)? {
                report.skipped += 1;
                continue;
            }
            CompletionRepo::insert(&tx, record)?;
            touched.insert(record.habit_id.clone());
            report.inserted += 1;
        }
        tx.commit().context("Committing import")?;

        if report.inserted > 0 {
            let completions = self.list_completions(&session.user_id)?;
            for habit in self.list_habits(&session.user_id)? {
                if touched.contains(&habit.id) {
                    self.refresh_streak_cache(&habit, &completions)?;
                }
            }
            self.feed
                .publish(&ChangeEvent::bulk(Collection::Completions, ChangeKind::Create));
        }
        info!(
            "imported {} completions ({} already present)",
            report.inserted, report.skipped
        );
        Ok(report)
    }

    fn refresh_streak_cache(&self, habit: &Habit, completions: &[CompletionRecord]) -> Result<()> {
        let policy = self.streak.policy_for(habit.frequency);
        let summary = compute_streaks(completions, &habit.id, &policy);
        let last = completions
            .iter()
            .filter(|c| c.habit_id == habit.id)
            .map(|c| c.completed_at)
            .max();
        HabitRepo::update_streak_cache(&self.conn, &habit.id, summary.streak, last.as_ref())
    }
}

/// Pick one habit for `query`: exact id, then id prefix, then exact title,
/// then title substring. The first tier with any match decides.
pub fn resolve_habit(habits: &[Habit], query: &str) -> Result<Habit, StoreError> {
    let q = query.trim();
    let lower = q.to_lowercase();
    if q.is_empty() {
        return Err(StoreError::HabitNotFound(query.to_string()));
    }

    let by_id = |h: &Habit| h.id.eq_ignore_ascii_case(q);
    let by_id_prefix = |h: &Habit| q.len() >= 4 && h.id.to_lowercase().starts_with(&lower);
    let by_title = |h: &Habit| h.title.to_lowercase() == lower;
    let by_title_part = |h: &Habit| h.title.to_lowercase().contains(&lower);
    let tiers: [&dyn Fn(&Habit) -> bool; 4] = [&by_id, &by_id_prefix, &by_title, &by_title_part];

    for tier in tiers {
        let found: Vec<&Habit> = habits.iter().filter(|&h| tier(h)).collect();
        match found.len() {
            0 => continue,
            1 => return Ok(found[0].clone()),
            n => {
                return Err(StoreError::AmbiguousHabit {
                    query: q.to_string(),
                    matches: n,
                });
            }
        }
    }
    Err(StoreError::HabitNotFound(q.to_string()))
}

impl HabitStore for SqliteStore {
    fn create_habit(&self, session: &Session, draft: NewHabit) -> Result<Habit> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyTitle.into());
        }
        let habit = Habit {
            id: Ulid::new().to_string(),
            user_id: session.user_id.clone(),
            title: title.to_string(),
            description: draft.description.trim().to_string(),
            frequency: draft.frequency,
            streak_count: 0,
            last_completed: None,
            created_at: Utc::now(),
        };
        HabitRepo::insert(&self.conn, &habit)?;
        info!("created habit {} ({})", habit.title, habit.id);
        self.feed
            .publish(&ChangeEvent::new(Collection::Habits, ChangeKind::Create, &habit.id));
        Ok(habit)
    }

    fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        HabitRepo::list_for_user(&self.conn, user_id)
    }

    fn find_habit(&self, user_id: &str, query: &str) -> Result<Habit> {
        let habits = self.list_habits(user_id)?;
        Ok(resolve_habit(&habits, query)?)
    }

    fn delete_habit(&self, session: &Session, habit_id: &str) -> Result<()> {
        if !HabitRepo::delete(&self.conn, &session.user_id, habit_id)? {
            return Err(StoreError::HabitNotFound(habit_id.to_string()).into());
        }
        info!("deleted habit {}", habit_id);
        self.feed
            .publish(&ChangeEvent::new(Collection::Habits, ChangeKind::Delete, habit_id));
        self.feed
            .publish(&ChangeEvent::bulk(Collection::Completions, ChangeKind::Delete));
        Ok(())
    }
}

impl CompletionStore for SqliteStore {
    fn list_completions(&self, user_id: &str) -> Result<Vec<CompletionRecord>> {
        CompletionRepo::list_for_user(&self.conn, user_id)
    }

    fn record_completion(
        &self,
        session: &Session,
        habit: &Habit,
        at: DateTime<Utc>,
    ) -> Result<CompletionRecord> {
        // The caller's copy may be stale if another process deleted the habit
        let habit = match HabitRepo::get(&self.conn, &habit.id)? {
            Some(stored) if stored.user_id == session.user_id => stored,
            _ => return Err(StoreError::HabitNotFound(habit.id.clone()).into()),
        };

        let mut completions = self.list_completions(&session.user_id)?;
        let offset = self.streak.offset();
        let clash = completions
            .iter()
            .any(|c| c.habit_id == habit.id && same_period(c.completed_at, at, offset, habit.frequency));
        if clash {
            return Err(StoreError::AlreadyCompleted {
                title: habit.title.clone(),
                period: period_word(habit.frequency),
            }
            .into());
        }

        let record = CompletionRecord {
            id: Ulid::new().to_string(),
            habit_id: habit.id.clone(),
            user_id: session.user_id.clone(),
            completed_at: at,
        };
        CompletionRepo::insert(&self.conn, &record)?;
        completions.push(record.clone());
        self.refresh_streak_cache(&habit, &completions)?;
        info!("completed {} at {}", habit.title, at);

        self.feed
            .publish(&ChangeEvent::new(Collection::Completions, ChangeKind::Create, &record.id));
        self.feed
            .publish(&ChangeEvent::new(Collection::Habits, ChangeKind::Update, &habit.id));
        Ok(record)
    }

    fn subscribe(&self, collection: Collection, callback: Callback) -> Subscription {
        let sub = self.feed.subscribe(collection, callback);
        debug!("{:?} subscriber added, {} active", collection, self.feed.subscriber_count());
        sub
    }
}
