//! Signed-in user context.
//!
//! There is no global "current user". A [`Session`] is produced by
//! [`Session::login`] or [`Session::current`] and handed to whatever needs it;
//! [`Session::logout`] consumes it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::Connection;
use thiserror::Error;
use ulid::Ulid;

use crate::db::repository::{MetaRepo, UserRepo};
use crate::models::completion::{format_timestamp, parse_timestamp};
use crate::models::User;

const SESSION_USER_KEY: &str = "session_user";
const SESSION_SINCE_KEY: &str = "session_since";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not signed in. Run `habitual login <name>` first.")]
    NotSignedIn,
    #[error("User name must not be empty")]
    EmptyName,
    #[error("Signed-in user {0} no longer exists")]
    MissingUser(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    /// Sign in as `name`, creating the local profile the first time.
    pub fn login(conn: &Connection, name: &str) -> Result<Session> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName.into());
        }

        let user = match UserRepo::find_by_name(conn, name)? {
            Some(user) => user,
            None => {
                let user = User {
                    id: Ulid::new().to_string(),
                    name: name.to_string(),
                    created_at: Utc::now(),
                };
                UserRepo::insert(conn, &user)?;
                info!("created user {} ({})", user.name, user.id);
                user
            }
        };

        let now = Utc::now();
        MetaRepo::set(conn, SESSION_USER_KEY, &user.id)?;
        MetaRepo::set(conn, SESSION_SINCE_KEY, &format_timestamp(&now))?;
        info!("signed in as {}", user.name);

        Ok(Session {
            user_id: user.id,
            name: user.name,
            signed_in_at: now,
        })
    }

    pub fn current(conn: &Connection) -> Result<Option<Session>> {
        let Some(user_id) = MetaRepo::get(conn, SESSION_USER_KEY)? else {
            return Ok(None);
        };
        let user = UserRepo::get(conn, &user_id)?
            .ok_or_else(|| SessionError::MissingUser(user_id.clone()))?;
        let signed_in_at = match MetaRepo::get(conn, SESSION_SINCE_KEY)? {
            Some(since) => parse_timestamp(&since).context("Reading session start")?,
            None => user.created_at,
        };
        Ok(Some(Session {
            user_id: user.id,
            name: user.name,
            signed_in_at,
        }))
    }

    pub fn require(conn: &Connection) -> Result<Session> {
        Self::current(conn)?.ok_or_else(|| SessionError::NotSignedIn.into())
    }

    pub fn logout(self, conn: &Connection) -> Result<()> {
        MetaRepo::delete(conn, SESSION_USER_KEY)?;
        MetaRepo::delete(conn, SESSION_SINCE_KEY)?;
        info!("signed out {}", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn login_creates_user_once() {
        let conn = conn();
        let first = Session::login(&conn, "  sam ").unwrap();
        assert_eq!(first.name, "sam");
        let again = Session::login(&conn, "SAM").unwrap();
        assert_eq!(first.user_id, again.user_id);
    }

    #[test]
    fn current_reflects_login_and_logout() {
        let conn = conn();
        assert!(Session::current(&conn).unwrap().is_none());

        let session = Session::login(&conn, "sam").unwrap();
        let current = Session::current(&conn).unwrap().unwrap();
        assert_eq!(current.user_id, session.user_id);

        session.logout(&conn).unwrap();
        assert!(Session::current(&conn).unwrap().is_none());
        let err = Session::require(&conn).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SessionError>(),
            Some(SessionError::NotSignedIn)
        ));
    }

    #[test]
    fn empty_name_is_rejected() {
        let conn = conn();
        assert!(Session::login(&conn, "   ").is_err());
    }
}
