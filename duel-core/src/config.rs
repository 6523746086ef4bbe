use crate::error::{DuelError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the gateway database file.
pub const DB_PATH_ENV: &str = "DUEL_DB_PATH";

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const DEFAULT_RECENT_GAMES_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub db_path: PathBuf,
    pub leaderboard_limit: usize,
    pub recent_games_limit: usize,
    /// Capacity of the change feed; slower subscribers skip older events.
    pub event_buffer: usize,
    /// How often to look for changes written by other processes. Zero
    /// turns the watcher off and only local writes reach the feed.
    pub change_poll_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("duel.db"),
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            recent_games_limit: DEFAULT_RECENT_GAMES_LIMIT,
            event_buffer: 256,
            change_poll_ms: 250,
        }
    }
}

impl GatewayConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn change_poll_interval(&self) -> Option<Duration> {
        (self.change_poll_ms > 0).then(|| Duration::from_millis(self.change_poll_ms))
    }

    /// Database file inside a data directory.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("duel.db"))
    }

    /// Read the database location from `DUEL_DB_PATH`.
    pub fn from_env() -> Result<Self> {
        match std::env::var(DB_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Ok(Self::new(path)),
            _ => Err(DuelError::config(format!("{} is not set", DB_PATH_ENV))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.db_path.as_os_str().is_empty() {
            return Err(DuelError::config("Database path cannot be empty"));
        }

        if self.leaderboard_limit == 0 {
            return Err(DuelError::config("Leaderboard limit must be greater than 0"));
        }

        if self.recent_games_limit == 0 {
            return Err(DuelError::config(
                "Recent games limit must be greater than 0",
            ));
        }

        if self.event_buffer == 0 {
            return Err(DuelError::config("Event buffer must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.leaderboard_limit, 10);
        assert_eq!(config.recent_games_limit, 5);
        assert_eq!(
            config.change_poll_interval(),
            Some(Duration::from_millis(250))
        );

        let local_only = GatewayConfig {
            change_poll_ms: 0,
            ..GatewayConfig::default()
        };
        assert_eq!(local_only.change_poll_interval(), None);
    }

    #[test]
    fn test_invalid_config_is_setup_error() {
        let mut config = GatewayConfig::new("");
        let err = config.validate().unwrap_err();
        assert!(err.is_setup_error());

        config = GatewayConfig::new("games.db");
        config.event_buffer = 0;
        assert!(matches!(config.validate(), Err(DuelError::Config(_))));
    }

    #[test]
    fn test_in_data_dir() {
        let config = GatewayConfig::in_data_dir(Path::new("/tmp/duel"));
        assert_eq!(config.db_path, PathBuf::from("/tmp/duel/duel.db"));
    }
}
