//! # Configuration Management Module
//!
//! Settings for the world store, the shop economy and logging, read from a
//! TOML file. Every section and field has a default, so an empty file (or
//! no file at all) yields a working configuration.
//!
//! ## Configuration File Format
//!
//! ```toml
//! [world]
//! db_path = "data/tinymush"
//! start_room = "town_square"
//! builders = ["sysop"]
//!
//! [shop]
//! default_price = 1
//! starting_budget = 100
//!
//! [logging]
//! level = "info"
//! file = "mushshop.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::tmush::state::REQUIRED_START_LOCATION_ID;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Sled database directory.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Room new characters are placed in.
    #[serde(default = "default_start_room")]
    pub start_room: String,
    /// Usernames granted the Builders permission when they first connect.
    #[serde(default = "default_builders")]
    pub builders: Vec<String>,
}

fn default_db_path() -> String {
    "data/tinymush".to_string()
}

fn default_start_room() -> String {
    REQUIRED_START_LOCATION_ID.to_string()
}

fn default_builders() -> Vec<String> {
    vec!["sysop".to_string()]
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            start_room: default_start_room(),
            builders: default_builders(),
        }
    }
}

impl WorldConfig {
    pub fn is_builder(&self, username: &str) -> bool {
        self.builders
            .iter()
            .any(|name| name.eq_ignore_ascii_case(username))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Price of a ware that has none set.
    #[serde(default = "default_price")]
    pub default_price: i64,
    /// Budget seeded into a new character's ledger.
    #[serde(default = "default_starting_budget")]
    pub starting_budget: i64,
}

fn default_price() -> i64 {
    1
}

fn default_starting_budget() -> i64 {
    100
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            default_price: default_price(),
            starting_budget: default_starting_budget(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: Some("mushshop.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub shop: ShopConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config = Self::from_toml(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.shop.default_price < 1 {
            return Err(anyhow!(
                "shop.default_price must be at least 1 (got {})",
                config.shop.default_price
            ));
        }
        if config.shop.starting_budget < 0 {
            return Err(anyhow!(
                "shop.starting_budget cannot be negative (got {})",
                config.shop.starting_budget
            ));
        }
        Ok(config)
    }

    /// Create a default configuration file
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
