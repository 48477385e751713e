//! Configuration for the plotward engine.
//!
//! A single TOML file declares where plot records live, how logging behaves,
//! and which worlds are plot worlds with which grid dimensions. The grid
//! numbers here are the only source of the coordinate arithmetic in
//! [`crate::plot::index`]: a world absent from `[worlds.*]` is not a plot
//! world and the enforcer ignores it entirely.
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "plotward.log"
//!
//! [worlds.plotworld]
//! plot_size = 32
//! path_width = 7
//! ground_level = 64
//! build_height = 255
//! days_to_expiration = 30
//! ```

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::plot::index::GridSettings;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Plot worlds keyed by world name. Lookups are case-insensitive; keys
    /// are normalized to lowercase on load.
    #[serde(default)]
    pub worlds: HashMap<String, WorldConfig>,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Grid dimensions and lifecycle policy for one plot world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_plot_size")]
    pub plot_size: u32,
    #[serde(default = "default_path_width")]
    pub path_width: u32,
    #[serde(default = "default_ground_level")]
    pub ground_level: i32,
    #[serde(default = "default_build_height")]
    pub build_height: i32,
    /// Days a fresh claim lives before the expiry sweep may reclaim it.
    /// 0 disables expiry for this world.
    #[serde(default)]
    pub days_to_expiration: u32,
}

fn default_plot_size() -> u32 {
    32
}

fn default_path_width() -> u32 {
    7
}

fn default_ground_level() -> i32 {
    64
}

fn default_build_height() -> i32 {
    255
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            plot_size: default_plot_size(),
            path_width: default_path_width(),
            ground_level: default_ground_level(),
            build_height: default_build_height(),
            days_to_expiration: 0,
        }
    }
}

impl WorldConfig {
    /// The grid these dimensions describe, in the index's terms.
    pub fn grid(&self) -> GridSettings {
        GridSettings {
            plot_size: self.plot_size,
            path_width: self.path_width,
            ground_level: self.ground_level,
            build_height: self.build_height,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.worlds = config
            .worlds
            .into_iter()
            .map(|(name, world)| (name.to_lowercase(), world))
            .collect();

        Ok(config)
    }

    /// Create a default configuration file with one example plot world.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Per-world settings, case-insensitive on the world name.
    pub fn world(&self, name: &str) -> Option<&WorldConfig> {
        self.worlds.get(&name.to_lowercase())
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut worlds = HashMap::new();
        worlds.insert("plotworld".to_string(), WorldConfig::default());
        Config {
            storage: StorageConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("plotward.log".to_string()),
            },
            worlds,
        }
    }
}
