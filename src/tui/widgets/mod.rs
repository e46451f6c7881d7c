pub mod habits;
pub mod header;
pub mod ranking;
pub mod statusbar;
pub mod streak;
