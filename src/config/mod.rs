//! # Configuration
//!
//! TOML configuration for the game engine and its runtime.
//!
//! - [`GameConfig`] - table rules (starting cash, pass-start bonus, jail length, seat limits)
//! - [`StorageConfig`] - where session documents are written
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ```toml
//! [game]
//! start_money = 1500
//! pass_start_bonus = 2000
//! jail_turns = 3
//! min_players = 2
//! max_players = 6
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "payuppal.log"
//! ```
//!
//! Every section falls back to its defaults when omitted.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rules applied to every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Cash granted on join.
    pub start_money: i64,
    /// Credited when a move wraps past the start square.
    pub pass_start_bonus: i64,
    /// Turns skipped after landing on a jail square.
    pub jail_turns: u32,
    pub min_players: usize,
    pub max_players: usize,
    /// Balance written to a player declared bankrupt. Must be negative.
    pub bankrupt_sentinel: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_money: 1500,
            pass_start_bonus: 2000,
            jail_turns: 3,
            min_players: 2,
            max_players: 6,
            bankrupt_sentinel: -1,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bankrupt_sentinel >= 0 {
            return Err(anyhow!("bankrupt_sentinel must be negative"));
        }
        if self.start_money < 0 {
            return Err(anyhow!("start_money must not be negative"));
        }
        if self.min_players < 2 || self.min_players > self.max_players {
            return Err(anyhow!(
                "player limits out of range: min {} max {}",
                self.min_players,
                self.max_players
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

impl StorageConfig {
    /// Directory holding one JSON document per session key.
    pub fn sessions_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("sessions")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("payuppal.log".to_string()),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        match self.level.to_ascii_lowercase().as_str() {
            "error" => log::LevelFilter::Error,
            "warn" | "warning" => log::LevelFilter::Warn,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        }
    }
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config.game.validate()?;

        Ok(config)
    }

    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}
