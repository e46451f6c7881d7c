use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "habitual", version, author, about = "A terminal habit tracker with honest streaks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in as a local user (created on first use)
    Login {
        /// User name
        name: String,
    },
    /// Sign out the current user
    Logout,
    /// Show who is signed in
    Whoami,
    /// Create a habit
    Add {
        /// Habit title
        title: String,
        /// Short description
        #[arg(long, short, default_value = "")]
        description: String,
        /// Frequency: daily, weekly or monthly
        #[arg(long, default_value = "daily")]
        freq: String,
    },
    /// List habits and whether they are done for the current period
    List,
    /// Mark a habit as done
    Done {
        /// Habit title, id or id prefix
        habit: String,
        /// Completion time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Delete a habit and its history
    Delete {
        /// Habit title, id or id prefix
        habit: String,
    },
    /// Rank habits by best streak
    Streaks {
        /// Weakest habits first
        #[arg(long)]
        asc: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Export habits, completions and streaks to stdout
    Export {
        /// Emit backend-compatible JSON instead of a text summary
        #[arg(long)]
        json: bool,
    },
    /// Import completion documents from a JSON file
    Import {
        /// Path to a JSON array of completion documents
        file: std::path::PathBuf,
    },
}
