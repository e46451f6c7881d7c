use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::Frequency;
use crate::streaks::{RankOrder, StreakPolicy};

fn default_max_gap_hours() -> f64 {
    36.0
}
fn default_timezone_offset() -> i32 {
    0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakMode {
    /// Elapsed-time window between completions
    #[default]
    Rolling,
    /// Local calendar day / week / month boundaries
    Calendar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakConfig {
    #[serde(default)]
    pub mode: StreakMode,
    /// Largest gap that still continues a daily streak. Scaled by 7 for weekly
    /// habits and 30 for monthly ones.
    #[serde(default = "default_max_gap_hours")]
    pub max_gap_hours: f64,
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: i32, // minutes from UTC
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            mode: StreakMode::default(),
            max_gap_hours: default_max_gap_hours(),
            timezone_offset: default_timezone_offset(),
        }
    }
}

impl StreakConfig {
    /// Configured offset, or UTC if it is out of range.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset * 60).unwrap_or_else(|| {
            log::warn!(
                "timezone_offset {} out of range, using UTC",
                self.timezone_offset
            );
            Utc.fix()
        })
    }

    pub fn policy_for(&self, frequency: Frequency) -> StreakPolicy {
        match self.mode {
            StreakMode::Rolling => StreakPolicy::rolling(self.max_gap_hours, frequency),
            StreakMode::Calendar => StreakPolicy::calendar(self.offset(), frequency),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub rank_order: RankOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub streak: StreakConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "habitual")
            .context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("habitual.db"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
        let config: AppConfig = toml::from_str(&content).context("Parsing config.toml")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.streak.mode, StreakMode::Rolling);
        assert_eq!(config.streak.max_gap_hours, 36.0);
        assert_eq!(config.display.rank_order, RankOrder::Desc);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[streak]\nmode = \"calendar\"\ntimezone_offset = 330\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.streak.mode, StreakMode::Calendar);
        assert_eq!(config.streak.max_gap_hours, 36.0);
        assert_eq!(config.streak.offset().local_minus_utc(), 330 * 60);
        assert!(matches!(
            config.streak.policy_for(Frequency::Weekly),
            StreakPolicy::Calendar {
                frequency: Frequency::Weekly,
                ..
            }
        ));
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.streak.max_gap_hours = 30.0;
        config.display.rank_order = RankOrder::Asc;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.streak.max_gap_hours, 30.0);
        assert_eq!(loaded.display.rank_order, RankOrder::Asc);
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let config = StreakConfig {
            timezone_offset: 100_000,
            ..StreakConfig::default()
        };
        assert_eq!(config.offset().local_minus_utc(), 0);
    }

    #[test]
    fn bad_mode_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[streak]\nmode = \"lunar\"\n").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }
}
