use duel_core::{DuelError, GatewayConfig};
use duel_game::PacingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub verbose: bool,
    /// Skip the roll animation and turn pauses.
    pub fast: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir().map(|dir| dir.join("dice-duel")),
            verbose: false,
            fast: false,
        }
    }
}

impl CliConfig {
    pub fn new(data_dir: Option<PathBuf>, verbose: bool, fast: bool) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: data_dir.or(defaults.data_dir),
            verbose,
            fast,
        }
    }

    /// Explicit `--data-dir` wins, then `DUEL_DB_PATH`, then the platform data dir.
    pub fn gateway_config(&self, explicit_dir: bool) -> Result<GatewayConfig, DuelError> {
        if !explicit_dir {
            if let Ok(config) = GatewayConfig::from_env() {
                return Ok(config);
            }
        }

        match &self.data_dir {
            Some(dir) => Ok(GatewayConfig::in_data_dir(dir)),
            None => Err(DuelError::config(
                "no data directory available; pass --data-dir or set DUEL_DB_PATH",
            )),
        }
    }

    pub fn pacing(&self) -> PacingConfig {
        if self.fast {
            PacingConfig::instant()
        } else {
            PacingConfig::default()
        }
    }
}
