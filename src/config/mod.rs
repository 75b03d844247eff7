//! Configuration loading and management

mod io;
mod settings;

pub use settings::{
    BadgeSettings, EngineSettings, LevelingSettings, RewardSettings, StorageSettings,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// XP rewards per event
    #[serde(default)]
    pub rewards: RewardSettings,

    /// Level thresholds
    #[serde(default)]
    pub leveling: LevelingSettings,

    /// Badge rule parameters
    #[serde(default)]
    pub badges: BadgeSettings,

    /// Settle retry behavior
    #[serde(default)]
    pub engine: EngineSettings,

    /// Database location
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Config {
    /// Resolved database path
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("progression.db"))
    }
}
