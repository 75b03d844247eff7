//! CLI command implementations

pub mod init;
pub mod leaderboard;
pub mod quiz;
pub mod user;

use anyhow::{Context, Result};
use std::path::Path;

use questline::config::Config;
use questline::progression::ProgressionEngine;

/// Load the config and open the engine, honoring `--db` over the config
pub fn open_engine(config_path: Option<&Path>, db_path: Option<&Path>) -> Result<ProgressionEngine> {
    let mut config = Config::load(config_path).context("Failed to load config")?;
    if let Some(db) = db_path {
        config.storage.database_path = Some(db.to_path_buf());
    }
    ProgressionEngine::open(config)
}
