use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::str::FromStr;

use crate::models::completion::{format_timestamp, parse_timestamp};
use crate::models::{CompletionRecord, Frequency, Habit, RawCompletion, User};

fn decode_time(field: &str, value: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(value).with_context(|| format!("Bad {} timestamp '{}'", field, value))
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub struct UserRepo;

impl UserRepo {
    pub fn insert(conn: &Connection, user: &User) -> Result<()> {
        conn.execute(
            "INSERT INTO users (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![user.id, user.name, format_timestamp(&user.created_at)],
        )?;
        Ok(())
    }

    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<User>> {
        Self::query_one(conn, "SELECT id, name, created_at FROM users WHERE name = ?1", name)
    }

    pub fn get(conn: &Connection, id: &str) -> Result<Option<User>> {
        Self::query_one(conn, "SELECT id, name, created_at FROM users WHERE id = ?1", id)
    }

    fn query_one(conn: &Connection, sql: &str, key: &str) -> Result<Option<User>> {
        let row = conn
            .query_row(sql, params![key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .optional()?;

        match row {
            None => Ok(None),
            Some((id, name, created_at)) => Ok(Some(User {
                id,
                name,
                created_at: decode_time("user created_at", &created_at)?,
            })),
        }
    }
}

// ─── Habits ──────────────────────────────────────────────────────────────────

type HabitRow = (String, String, String, String, String, u32, Option<String>, String);

const HABIT_COLUMNS: &str =
    "id, user_id, title, description, frequency, streak_count, last_completed, created_at";

fn read_habit_row(row: &Row<'_>) -> rusqlite::Result<HabitRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn habit_from_row(row: HabitRow) -> Result<Habit> {
    let (id, user_id, title, description, frequency, streak_count, last_completed, created_at) =
        row;
    let last_completed = match last_completed {
        Some(s) => Some(decode_time("last_completed", &s)?),
        None => None,
    };
    Ok(Habit {
        frequency: Frequency::from_str(&frequency)
            .with_context(|| format!("Habit {} has bad frequency", id))?,
        created_at: decode_time("habit created_at", &created_at)?,
        id,
        user_id,
        title,
        description,
        streak_count,
        last_completed,
    })
}

pub struct HabitRepo;

impl HabitRepo {
    pub fn insert(conn: &Connection, habit: &Habit) -> Result<()> {
        conn.execute(
            "INSERT INTO habits (id, user_id, title, description, frequency, streak_count,
                                 last_completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                habit.id,
                habit.user_id,
                habit.title,
                habit.description,
                habit.frequency.as_str(),
                habit.streak_count,
                habit.last_completed.as_ref().map(format_timestamp),
                format_timestamp(&habit.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn list_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Habit>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habits WHERE user_id = ?1 ORDER BY created_at, id",
            HABIT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![user_id], read_habit_row)?;

        let mut result = Vec::new();
        for r in rows {
            result.push(habit_from_row(r?)?);
        }
        Ok(result)
    }

    pub fn get(conn: &Connection, id: &str) -> Result<Option<Habit>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS),
                params![id],
                read_habit_row,
            )
            .optional()?;
        row.map(habit_from_row).transpose()
    }

    /// Remove a habit and its completions. Returns false if nothing matched.
    pub fn delete(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM completions WHERE habit_id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        let removed = tx.execute(
            "DELETE FROM habits WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    pub fn update_streak_cache(
        conn: &Connection,
        id: &str,
        streak_count: u32,
        last_completed: Option<&DateTime<Utc>>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE habits SET streak_count = ?1, last_completed = ?2 WHERE id = ?3",
            params![streak_count, last_completed.map(format_timestamp), id],
        )?;
        Ok(())
    }
}

// ─── Completions ─────────────────────────────────────────────────────────────

pub struct CompletionRepo;

impl CompletionRepo {
    pub fn insert(conn: &Connection, record: &CompletionRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO completions (id, habit_id, user_id, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.habit_id,
                record.user_id,
                format_timestamp(&record.completed_at),
            ],
        )?;
        Ok(())
    }

    /// Rows exactly as stored. Use `list_for_user` unless you are checking integrity.
    pub fn list_raw_for_user(conn: &Connection, user_id: &str) -> Result<Vec<RawCompletion>> {
        let mut stmt = conn.prepare(
            "SELECT id, habit_id, user_id, completed_at FROM completions
             WHERE user_id = ?1 ORDER BY completed_at, id",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(RawCompletion {
                id: row.get(0)?,
                habit_id: row.get(1)?,
                user_id: row.get(2)?,
                completed_at: row.get(3)?,
            })
        })?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(anyhow::Error::from)
    }

    pub fn list_for_user(conn: &Connection, user_id: &str) -> Result<Vec<CompletionRecord>> {
        let mut result = Vec::new();
        for raw in Self::list_raw_for_user(conn, user_id)? {
            result.push(CompletionRecord::try_from(raw).context("Data integrity error")?);
        }
        Ok(result)
    }

    pub fn exists(conn: &Connection, id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM completions WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }
}

// ─── App meta ────────────────────────────────────────────────────────────────

pub struct MetaRepo;

impl MetaRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, key: &str) -> Result<()> {
        conn.execute("DELETE FROM app_meta WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use chrono::TimeZone;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        UserRepo::insert(
            &conn,
            &User {
                id: "u1".to_string(),
                name: "amy".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            },
        )
        .unwrap();
        conn
    }

    fn habit(id: &str, title: &str) -> Habit {
        Habit {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: title.to_string(),
            description: "daily practice".to_string(),
            frequency: Frequency::Weekly,
            streak_count: 0,
            last_completed: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
        }
    }

    fn completion(id: &str, habit_id: &str, day: u32) -> CompletionRecord {
        CompletionRecord {
            id: id.to_string(),
            habit_id: habit_id.to_string(),
            user_id: "u1".to_string(),
            completed_at: Utc.with_ymd_and_hms(2026, 1, day, 6, 0, 0).unwrap(),
        }
    }

    #[test]
    fn users_are_found_case_insensitively() {
        let conn = setup();
        let user = UserRepo::find_by_name(&conn, "AMY").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert!(UserRepo::get(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn habit_round_trips_through_sqlite() {
        let conn = setup();
        HabitRepo::insert(&conn, &habit("h1", "Read")).unwrap();
        let loaded = HabitRepo::get(&conn, "h1").unwrap().unwrap();
        assert_eq!(loaded.title, "Read");
        assert_eq!(loaded.frequency, Frequency::Weekly);
        assert!(loaded.last_completed.is_none());
    }

    #[test]
    fn completions_decode_and_sort() {
        let conn = setup();
        HabitRepo::insert(&conn, &habit("h1", "Read")).unwrap();
        CompletionRepo::insert(&conn, &completion("c2", "h1", 5)).unwrap();
        CompletionRepo::insert(&conn, &completion("c1", "h1", 3)).unwrap();

        let records = CompletionRepo::list_for_user(&conn, "u1").unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn corrupt_timestamp_is_fatal() {
        let conn = setup();
        HabitRepo::insert(&conn, &habit("h1", "Read")).unwrap();
        conn.execute(
            "INSERT INTO completions (id, habit_id, user_id, completed_at)
             VALUES ('bad', 'h1', 'u1', 'last tuesday')",
            [],
        )
        .unwrap();

        let err = CompletionRepo::list_for_user(&conn, "u1").unwrap_err();
        assert!(format!("{err:#}").contains("last tuesday"));
        assert_eq!(CompletionRepo::list_raw_for_user(&conn, "u1").unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_completions() {
        let conn = setup();
        HabitRepo::insert(&conn, &habit("h1", "Read")).unwrap();
        CompletionRepo::insert(&conn, &completion("c1", "h1", 3)).unwrap();

        assert!(!HabitRepo::delete(&conn, "someone-else", "h1").unwrap());
        assert!(HabitRepo::delete(&conn, "u1", "h1").unwrap());
        assert!(HabitRepo::get(&conn, "h1").unwrap().is_none());
        assert!(!CompletionRepo::exists(&conn, "c1").unwrap());
    }

    #[test]
    fn streak_cache_updates() {
        let conn = setup();
        HabitRepo::insert(&conn, &habit("h1", "Read")).unwrap();
        let when = Utc.with_ymd_and_hms(2026, 1, 9, 6, 0, 0).unwrap();
        HabitRepo::update_streak_cache(&conn, "h1", 4, Some(&when)).unwrap();
        let loaded = HabitRepo::get(&conn, "h1").unwrap().unwrap();
        assert_eq!(loaded.streak_count, 4);
        assert_eq!(loaded.last_completed, Some(when));
    }

    #[test]
    fn meta_set_get_delete() {
        let conn = setup();
        MetaRepo::set(&conn, "k", "v1").unwrap();
        MetaRepo::set(&conn, "k", "v2").unwrap();
        assert_eq!(MetaRepo::get(&conn, "k").unwrap().as_deref(), Some("v2"));
        MetaRepo::delete(&conn, "k").unwrap();
        assert!(MetaRepo::get(&conn, "k").unwrap().is_none());
    }
}
