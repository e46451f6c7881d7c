mod cli;
mod config;
mod db;
mod models;
mod session;
mod store;
mod streaks;
mod tui;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use rusqlite::Connection;

use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;
use db::migrations::run_migrations;
use session::Session;
use store::SqliteStore;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Loading config")?;

    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;

    // WAL lets the dashboard keep reading while another process records completions
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    run_migrations(&conn)?;
    debug!("database ready at {:?}", db_path);

    match cli.command {
        Some(Commands::Login { name }) => handlers::handle_login(&conn, &name)?,
        Some(Commands::Logout) => handlers::handle_logout(&conn)?,
        Some(Commands::Whoami) => handlers::handle_whoami(&conn)?,

        // Everything else acts on behalf of the signed-in user
        Some(cmd) => {
            let session = Session::require(&conn)?;
            let store = SqliteStore::new(conn, config.streak.clone())?;
            match cmd {
                Commands::Add {
                    title,
                    description,
                    freq,
                } => handlers::handle_add(&store, &session, &title, &description, &freq)?,
                Commands::List => handlers::handle_list(&store, &session)?,
                Commands::Done { habit, at } => {
                    handlers::handle_done(&store, &session, &habit, at.as_deref())?
                }
                Commands::Delete { habit } => handlers::handle_delete(&store, &session, &habit)?,
                Commands::Streaks { asc, json } => {
                    handlers::handle_streaks(&store, &session, &config, asc, json)?
                }
                Commands::Export { json } => {
                    handlers::handle_export(&store, &session, &config, json)?
                }
                Commands::Import { file } => handlers::handle_import(&store, &session, &file)?,
                Commands::Login { .. } | Commands::Logout | Commands::Whoami => unreachable!(),
            }
        }

        // No subcommand → launch TUI
        None => {
            let session = Session::require(&conn)?;
            let store = SqliteStore::new(conn, config.streak.clone())?;
            tui::app::run(store, session, config)?;
        }
    }

    Ok(())
}
