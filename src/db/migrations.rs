use anyhow::Result;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habits (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id),
            title           TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            frequency       TEXT NOT NULL DEFAULT 'daily'
                            CHECK(frequency IN ('daily','weekly','monthly')),
            streak_count    INTEGER NOT NULL DEFAULT 0,
            last_completed  TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_id);

        CREATE TABLE IF NOT EXISTS completions (
            id            TEXT PRIMARY KEY,
            habit_id      TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            user_id       TEXT NOT NULL REFERENCES users(id),
            completed_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_completions_user ON completions(user_id, completed_at);

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    ")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'habits', 'completions', 'app_meta')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn frequency_is_constrained() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (id, name, created_at) VALUES ('u1', 'amy', '2026-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO habits (id, user_id, title, frequency, created_at)
             VALUES ('h1', 'u1', 'Read', 'hourly', '2026-01-01T00:00:00.000Z')",
            [],
        );
        assert!(result.is_err());
    }
}
