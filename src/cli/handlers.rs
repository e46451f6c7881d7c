use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;

use crate::config::AppConfig;
use crate::models::completion::{format_timestamp, parse_timestamp};
use crate::models::{CompletionDocument, Frequency, Habit, RankedHabit};
use crate::session::Session;
use crate::store::{CompletionStore, HabitStore, NewHabit, SqliteStore};
use crate::streaks::{RankOrder, compute_streaks, rank_habits, same_period};
use crate::utils::format::{format_badges, format_streak, format_when, pad, truncate};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const CORAL: &str = "\x1b[38;2;255;127;80m";

const TITLE_WIDTH: usize = 24;

// ─── Session ─────────────────────────────────────────────────────────────────

pub fn handle_login(conn: &Connection, name: &str) -> Result<()> {
    let session = Session::login(conn, name)?;
    println_colored!(GREEN, "  ✓ Welcome back, {}", session.name);
    Ok(())
}

pub fn handle_logout(conn: &Connection) -> Result<()> {
    match Session::current(conn)? {
        Some(session) => {
            let name = session.name.clone();
            session.logout(conn)?;
            println_colored!(DIM, "  Signed out {}", name);
        }
        None => println_colored!(DIM, "  Nobody is signed in"),
    }
    Ok(())
}

pub fn handle_whoami(conn: &Connection) -> Result<()> {
    match Session::current(conn)? {
        Some(session) => println!(
            "  {} (since {})",
            session.name,
            session.signed_in_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println_colored!(DIM, "  Not signed in"),
    }
    Ok(())
}

// ─── Habits ──────────────────────────────────────────────────────────────────

pub fn handle_add(
    store: &SqliteStore,
    session: &Session,
    title: &str,
    description: &str,
    freq: &str,
) -> Result<()> {
    let frequency = Frequency::from_str(freq)
        .map_err(|_| anyhow!("Unknown frequency '{}'. Use: daily, weekly, monthly", freq))?;
    let habit = store.create_habit(
        session,
        NewHabit {
            title: title.to_string(),
            description: description.to_string(),
            frequency,
        },
    )?;
    println_colored!(
        GREEN,
        "  ✓ Added {} habit: {}",
        habit.frequency.as_str(),
        habit.title
    );
    Ok(())
}

/// Whether `habit` already has a completion in the period containing now.
fn done_this_period(store: &SqliteStore, habit: &Habit) -> bool {
    let offset = store.streak_config().offset();
    habit
        .last_completed
        .map(|last| same_period(last, Utc::now(), offset, habit.frequency))
        .unwrap_or(false)
}

pub fn handle_list(store: &SqliteStore, session: &Session) -> Result<()> {
    let habits = store.list_habits(&session.user_id)?;
    println!();
    println_colored!(CORAL, "  Today's Habits — {}", session.name);
    println!();

    if habits.is_empty() {
        println_colored!(DIM, "  No habits yet. Add your first with `habitual add <title>`");
        println!();
        return Ok(());
    }

    let offset = store.streak_config().offset();
    for habit in &habits {
        let title = pad(&truncate(&habit.title, TITLE_WIDTH), TITLE_WIDTH);
        let streak = format_streak(habit.streak_count, habit.frequency);
        if done_this_period(store, habit) {
            println_colored!(GREEN, "  ● {}  {:<8} {}", title, habit.frequency.as_str(), streak);
        } else {
            println!(
                "  ○ {}  {:<8} {}  {}last: {}\x1b[0m",
                title,
                habit.frequency.as_str(),
                streak,
                DIM,
                format_when(habit.last_completed.as_ref(), offset)
            );
        }
        if !habit.description.is_empty() {
            println_colored!(DIM, "    {}", habit.description);
        }
    }
    println!();
    Ok(())
}

pub fn handle_done(
    store: &SqliteStore,
    session: &Session,
    query: &str,
    at: Option<&str>,
) -> Result<()> {
    let habit = store.find_habit(&session.user_id, query)?;
    let at = match at {
        Some(s) => parse_timestamp(s).with_context(|| format!("--at '{}' is not RFC 3339", s))?,
        None => Utc::now(),
    };
    store.record_completion(session, &habit, at)?;

    let completions = store.list_completions(&session.user_id)?;
    let policy = store.streak_config().policy_for(habit.frequency);
    let summary = compute_streaks(&completions, &habit.id, &policy);
    println_colored!(GREEN, "  ✓ {} done", habit.title);
    println_colored!(DIM, "    {}", format_badges(&summary, habit.frequency));
    Ok(())
}

pub fn handle_delete(store: &SqliteStore, session: &Session, query: &str) -> Result<()> {
    let habit = store.find_habit(&session.user_id, query)?;
    store.delete_habit(session, &habit.id)?;
    println_colored!(RED, "  ✗ Deleted {} and its history", habit.title);
    Ok(())
}

// ─── Streaks ─────────────────────────────────────────────────────────────────

fn ranked(store: &SqliteStore, session: &Session, order: RankOrder) -> Result<Vec<RankedHabit>> {
    let habits = store.list_habits(&session.user_id)?;
    let completions = store.list_completions(&session.user_id)?;
    let streak = store.streak_config();
    Ok(rank_habits(&habits, &completions, |f| streak.policy_for(f), order))
}

pub fn handle_streaks(
    store: &SqliteStore,
    session: &Session,
    config: &AppConfig,
    asc: bool,
    json: bool,
) -> Result<()> {
    let order = if asc {
        RankOrder::Asc
    } else {
        config.display.rank_order
    };
    let ranked = ranked(store, session, order)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    println!();
    println_colored!(CORAL, "  Habit Streaks ({})", order.label());
    println!();
    if ranked.is_empty() {
        println_colored!(DIM, "  No habits yet");
    }
    for (i, entry) in ranked.iter().enumerate() {
        let title = pad(&truncate(&entry.habit.title, TITLE_WIDTH), TITLE_WIDTH);
        let color = if entry.summary.is_empty() { DIM } else { BOLD };
        println_colored!(
            color,
            "  {:>2}. {}  {}",
            i + 1,
            title,
            format_badges(&entry.summary, entry.habit.frequency)
        );
    }
    println!();
    Ok(())
}

// ─── Export / import ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ExportBundle<'a> {
    user: &'a str,
    exported_at: String,
    habits: Vec<RankedHabit>,
    completions: Vec<CompletionDocument>,
}

pub fn handle_export(
    store: &SqliteStore,
    session: &Session,
    config: &AppConfig,
    json: bool,
) -> Result<()> {
    let ranked = ranked(store, session, config.display.rank_order)?;

    if json {
        let completions = store
            .list_completions(&session.user_id)?
            .iter()
            .map(CompletionDocument::from)
            .collect();
        let bundle = ExportBundle {
            user: &session.user_id,
            exported_at: format_timestamp(&Utc::now()),
            habits: ranked,
            completions,
        };
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(());
    }

    let offset = store.streak_config().offset();
    println!("# habitual — Streak Summary");
    println!("# {} ({})", session.name, Utc::now().with_timezone(&offset).format("%Y-%m-%d"));
    println!();
    for entry in &ranked {
        println!("## {}", entry.habit.title);
        if !entry.habit.description.is_empty() {
            println!("  {}", entry.habit.description);
        }
        println!("  Frequency:  {}", entry.habit.frequency);
        println!(
            "  Current:    {}",
            format_streak(entry.summary.streak, entry.habit.frequency)
        );
        println!(
            "  Best:       {}",
            format_streak(entry.summary.best_streak, entry.habit.frequency)
        );
        println!("  Total:      {}", entry.summary.total);
        println!(
            "  Last done:  {}",
            format_when(entry.habit.last_completed.as_ref(), offset)
        );
        println!();
    }
    Ok(())
}

pub fn handle_import(store: &SqliteStore, session: &Session, path: &Path) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
    let docs = CompletionDocument::parse_many(&content)
        .with_context(|| format!("Decoding {:?}", path))?;
    let report = store
        .import_completions(session, docs)
        .context("Import rejected; nothing was written")?;

    println_colored!(GREEN, "  ✓ Imported {} completions", report.inserted);
    if report.skipped > 0 {
        println_colored!(AMBER, "    {} already present, skipped", report.skipped);
    }
    Ok(())
}
